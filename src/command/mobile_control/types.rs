use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum TerminationErrorMode {
    /// +CME ERROR: <err> result code disabled and ERROR used
    Disabled = 0,
    /// +CME ERROR: <err> result code enabled and numeric <err> values used
    Enabled = 1,
    /// +CME ERROR: <err> result code enabled and verbose <err> values used
    Verbose = 2,
}
