#![cfg_attr(not(any(test, feature = "std")), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod asynch;
pub mod command;
pub mod config;
pub mod digest;
pub mod error;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use asynch::{
    control::Control, new, resources::Resources, runner::Runner, state::SessionState,
};
pub use command::urc::Urc;
pub use config::Config;
pub use error::Error;
pub use transport::Dialer;
#[cfg(feature = "serial")]
pub use transport::SerialDialer;

/// Maximum length of a single response line.
pub const LINE_LEN: usize = 256;

/// Maximum length of the newline-joined response to a single command.
pub const RESPONSE_LEN: usize = 1024;

/// Maximum length of a single command on the wire, terminator included. An
/// SMS body counts as a command.
pub const COMMAND_LEN: usize = 512;

/// Size of the buffer holding bytes read from the modem but not yet tokenized.
pub const INGRESS_BUF_SIZE: usize = 1024;

/// A single line received from the modem, with its terminator stripped.
pub type Line = heapless::String<LINE_LEN>;

/// Newline-joined response lines of one command.
pub type Response = heapless::String<RESPONSE_LEN>;

/// Text of a single command. Carries its terminator on the way to the modem,
/// and none when reported in an [`Error`].
pub type CommandText = heapless::String<COMMAND_LEN>;
