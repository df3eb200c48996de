use core::fmt;

use embedded_io_async::ErrorKind;

use crate::{CommandText, Line, Response};

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // Configuration errors
    InvalidConfig(&'static str),
    Dial,

    // Session errors
    NotInitialized,
    AlreadyRunning,
    AlreadyClosed,
    Cancelled,

    // Protocol errors
    /// The modem terminated `command` with a result code other than `OK`.
    Command {
        command: CommandText,
        code: Line,
        response: Response,
    },
    /// `AT+CMGS` finished without the text entry prompt.
    NoPrompt {
        response: Response,
    },
    CommandTooLong,
    InvalidRecipient,
    InvalidMessage,

    // Timeouts
    /// No result code was received for `command` before its deadline.
    Timeout {
        command: CommandText,
        response: Response,
    },
    StateTimeout,

    // Transport errors
    Transport(ErrorKind),
    Eof,

    // Bring-up errors
    NotResponding,
    SimPinRequired,
    UnsupportedSimState(Line),
    SimNotReady,
}

impl Error {
    /// The modem produced no result code in time. Retrying may succeed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::StateTimeout)
    }

    /// The session can no longer be used and has to be rebuilt.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Eof | Self::AlreadyClosed | Self::Cancelled
        )
    }

    /// Joined response text the modem produced before the error, if any.
    pub fn response(&self) -> Option<&str> {
        match self {
            Self::Command { response, .. }
            | Self::NoPrompt { response }
            | Self::Timeout { response, .. } => Some(response.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            Self::Dial => f.write_str("failed to open transport"),
            Self::NotInitialized => f.write_str("command loop is not running"),
            Self::AlreadyRunning => f.write_str("command loop is already running"),
            Self::AlreadyClosed => f.write_str("session already closed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Command { command, code, .. } => {
                write!(f, "command {:?} failed: {}", command.as_str(), code.as_str())
            }
            Self::NoPrompt { response } => {
                write!(f, "did not receive SMS prompt, got: {:?}", response.as_str())
            }
            Self::CommandTooLong => f.write_str("command too long"),
            Self::InvalidRecipient => f.write_str("invalid recipient"),
            Self::InvalidMessage => f.write_str("invalid message body"),
            Self::Timeout { command, response } => write!(
                f,
                "command {:?} timed out, got: {:?}",
                command.as_str(),
                response.as_str()
            ),
            Self::StateTimeout => f.write_str("modem initialization timed out"),
            Self::Transport(kind) => write!(f, "transport error: {:?}", kind),
            Self::Eof => f.write_str("transport closed by peer"),
            Self::NotResponding => f.write_str("modem not responding"),
            Self::SimPinRequired => f.write_str("SIM requires a PIN"),
            Self::UnsupportedSimState(status) => {
                write!(f, "unsupported SIM state: {:?}", status.as_str())
            }
            Self::SimNotReady => f.write_str("SIM not ready"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::InvalidConfig(reason) => defmt::write!(f, "InvalidConfig({=str})", reason),
            Self::Dial => defmt::write!(f, "Dial"),
            Self::NotInitialized => defmt::write!(f, "NotInitialized"),
            Self::AlreadyRunning => defmt::write!(f, "AlreadyRunning"),
            Self::AlreadyClosed => defmt::write!(f, "AlreadyClosed"),
            Self::Cancelled => defmt::write!(f, "Cancelled"),
            Self::Command { command, code, .. } => defmt::write!(
                f,
                "Command({=str}: {=str})",
                command.as_str(),
                code.as_str()
            ),
            Self::NoPrompt { response } => {
                defmt::write!(f, "NoPrompt({=str})", response.as_str())
            }
            Self::CommandTooLong => defmt::write!(f, "CommandTooLong"),
            Self::InvalidRecipient => defmt::write!(f, "InvalidRecipient"),
            Self::InvalidMessage => defmt::write!(f, "InvalidMessage"),
            Self::Timeout { command, .. } => defmt::write!(f, "Timeout({=str})", command.as_str()),
            Self::StateTimeout => defmt::write!(f, "StateTimeout"),
            Self::Transport(kind) => defmt::write!(f, "Transport({:?})", kind),
            Self::Eof => defmt::write!(f, "Eof"),
            Self::NotResponding => defmt::write!(f, "NotResponding"),
            Self::SimPinRequired => defmt::write!(f, "SimPinRequired"),
            Self::UnsupportedSimState(status) => {
                defmt::write!(f, "UnsupportedSimState({=str})", status.as_str())
            }
            Self::SimNotReady => defmt::write!(f, "SimNotReady"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
