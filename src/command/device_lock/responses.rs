//! Responses for Device lock Commands
use atat::atat_derive::AtatResp;

use super::types::*;
use crate::{error::Error, Line};

const PIN_STATUS_PREFIX: &str = "+CPIN:";

/// 9.1 Enter PIN +CPIN
#[derive(Clone, Debug, PartialEq, AtatResp)]
pub struct PinStatus {
    #[at_arg(position = 0)]
    pub code: PinStatusCode,
}

impl PinStatus {
    /// Extract the PIN status from the joined response to `AT+CPIN?`.
    ///
    /// A status this crate does not know, or a response without a `+CPIN:`
    /// line, is reported as [`Error::UnsupportedSimState`] carrying the raw
    /// text.
    pub fn from_response(response: &str) -> Result<Self, Error> {
        let Some(line) = response
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(PIN_STATUS_PREFIX))
        else {
            return Err(Error::UnsupportedSimState(truncated(response)));
        };

        atat::serde_at::from_str(line).map_err(|_| {
            let status = line[PIN_STATUS_PREFIX.len()..].trim();
            Error::UnsupportedSimState(truncated(status))
        })
    }
}

fn truncated(s: &str) -> Line {
    let mut line = Line::new();
    for c in s.chars() {
        if line.push(c).is_err() {
            break;
        }
    }
    line
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_pin_status() {
        assert_eq!(
            PinStatus::from_response("+CPIN: READY\nOK"),
            Ok(PinStatus {
                code: PinStatusCode::Ready
            })
        );

        assert_eq!(
            PinStatus::from_response("+CPIN: SIM PIN\nOK"),
            Ok(PinStatus {
                code: PinStatusCode::SimPin
            })
        );

        assert_eq!(
            PinStatus::from_response("+CPIN: PH-NETSUB PIN\nOK"),
            Ok(PinStatus {
                code: PinStatusCode::PhNetSubPin
            })
        );
    }

    #[test]
    fn unknown_status_carries_raw_text() {
        assert_eq!(
            PinStatus::from_response("+CPIN: NOT INSERTED\nOK"),
            Err(Error::UnsupportedSimState(
                Line::try_from("NOT INSERTED").unwrap()
            ))
        );

        assert_eq!(
            PinStatus::from_response("OK"),
            Err(Error::UnsupportedSimState(Line::try_from("OK").unwrap()))
        );
    }
}
