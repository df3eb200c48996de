//! ### 15 - V24 control and V25ter
pub mod types;

use atat::atat_derive::AtatCmd;

use super::NoResponse;
use types::Echo;

/// 15.4 Command echo E
///
/// Configures whether the modem echoes characters received from the DTE.
/// Responses are only tokenized correctly with echo disabled.
#[derive(Clone, AtatCmd)]
#[at_cmd("E", NoResponse, value_sep = false, termination = "\r")]
pub struct SetEcho {
    #[at_arg(position = 0)]
    pub enabled: Echo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::encode;

    #[test]
    fn encodes_echo_off() {
        let cmd = SetEcho {
            enabled: Echo::Off,
        };
        assert_eq!(encode(&cmd).unwrap(), "ATE0\r");
    }
}
