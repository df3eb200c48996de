//! ### 9 - Device lock

pub mod impl_;
pub mod responses;
pub mod types;

use atat::atat_derive::AtatCmd;
use responses::*;

use super::NoResponse;

/// 9.1 Enter PIN +CPIN
///
/// Reads whether the MT is waiting for a password, e.g. the SIM PIN.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CPIN?", PinStatus, termination = "\r")]
pub struct GetPinStatus;

/// 9.1 Enter PIN +CPIN
///
/// Enter PIN. If no PIN request is pending, the corresponding error code is returned. If a wrong PIN is given three
/// times, the PUK must be inserted in place of the PIN, followed by the <newpin> which replaces the old pin in
/// the SIM.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CPIN", NoResponse, termination = "\r")]
pub struct SetPin<'a> {
    #[at_arg(position = 0, len = 8)]
    pub pin: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::encode;

    #[test]
    fn encodes_pin_commands() {
        assert_eq!(encode(&GetPinStatus).unwrap(), "AT+CPIN?\r");
        assert_eq!(encode(&SetPin { pin: "1234" }).unwrap(), "AT+CPIN=\"1234\"\r");
    }
}
