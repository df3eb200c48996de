//! Argument and parameter types used by Short Messages Service Commands and Responses
use atat::atat_derive::AtatEnum;

/// Format of the SMS commands' input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum MessageFormat {
    /// • 0: PDU mode
    Pdu = 0,
    /// • 1: text mode
    Text = 1,
}
