//! ### 5 - Mobile equipment control and status
pub mod types;

use atat::atat_derive::AtatCmd;

use super::NoResponse;
use types::TerminationErrorMode;

/// 5.12 Report mobile termination error +CMEE
///
/// Configures the formatting of the result code `+CME ERROR: <err>` as an
/// indication of an error relating to the functionality of the MT. When
/// enabled, MT related errors cause `+CME ERROR: <err>` final result code
/// instead of the regular `ERROR` final result code.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMEE", NoResponse, termination = "\r")]
pub struct SetReportMobileTerminationError {
    #[at_arg(position = 0)]
    pub n: TerminationErrorMode,
}
