//! AT commands and result codes used to drive the modem.
//!
//! Only the generic 3GPP TS 27.005 / 27.007 subset needed for SIM bring-up and
//! text mode SMS submission is covered.

pub mod control;
pub mod device_lock;
pub mod mobile_control;
pub mod sms;
pub mod urc;

use atat::atat_derive::{AtatCmd, AtatResp};
use atat::AtatCmd;

use crate::{error::Error, CommandText, COMMAND_LEN};

// Terminal control
pub const CRLF: &str = "\r\n";
pub const PROMPT: &str = "> ";
pub const CTRL_Z: char = '\x1a';
pub const ESC: char = '\x1b';

/// Terminates a command on the wire. Responses are `\r\n` terminated.
pub const COMMAND_TERMINATOR: &str = "\r";

// Result codes
pub const OK: &str = "OK";
pub const ERROR: &str = "ERROR";
pub const NO_CARRIER: &str = "NO CARRIER";
pub const NO_DIALTONE: &str = "NO DIALTONE";
pub const BUSY: &str = "BUSY";
pub const NO_ANSWER: &str = "NO ANSWER";
pub const CME_ERROR: &str = "+CME ERROR:";
pub const CMS_ERROR: &str = "+CMS ERROR:";

// Unsolicited result codes
pub const URC_NEW_MESSAGE: &str = "+CMTI:";
pub const URC_STATUS_REPORT: &str = "+CDSI:";
pub const URC_RING: &str = "RING";

#[derive(Clone, AtatResp)]
pub struct NoResponse;

/// Attention command, used as a handshake.
#[derive(Clone, AtatCmd)]
#[at_cmd("", NoResponse, termination = "\r")]
pub struct AT;

/// Serialize `cmd` into the exact text written to the modem, terminator
/// included.
pub fn encode<Cmd: AtatCmd>(cmd: &Cmd) -> Result<CommandText, Error> {
    let mut buf = [0u8; COMMAND_LEN];
    if Cmd::MAX_LEN > buf.len() {
        return Err(Error::CommandTooLong);
    }

    let len = cmd.write(&mut buf);
    core::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|text| CommandText::try_from(text).ok())
        .ok_or(Error::CommandTooLong)
}

/// Frame a raw command line for the wire.
pub(crate) fn encode_raw(command: &str) -> Result<CommandText, Error> {
    let mut frame = CommandText::try_from(command.trim()).map_err(|_| Error::CommandTooLong)?;
    frame
        .push_str(COMMAND_TERMINATOR)
        .map_err(|_| Error::CommandTooLong)?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_handshake() {
        assert_eq!(encode(&AT).unwrap(), "AT\r");
    }

    #[test]
    fn frames_raw_commands() {
        assert_eq!(encode_raw(" AT+CSQ\r\n").unwrap(), "AT+CSQ\r");

        let long = "A".repeat(COMMAND_LEN);
        assert_eq!(encode_raw(&long), Err(Error::CommandTooLong));
    }
}
