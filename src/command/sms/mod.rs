//! ### 11 - Short Messages Service

pub mod responses;
pub mod types;
pub mod urc;

use atat::atat_derive::AtatCmd;
use atat::serde_bytes::Bytes;

use super::{NoResponse, CTRL_Z, ESC};
use crate::{error::Error, COMMAND_LEN};
use types::MessageFormat;

/// Longest recipient address accepted by [`SendMessage`].
pub const MAX_RECIPIENT_LEN: usize = 32;

/// 11.4 Message format +CMGF
///
/// Selects PDU or text mode for the SMS commands.
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMGF", NoResponse, termination = "\r")]
pub struct SetMessageFormat {
    #[at_arg(position = 0)]
    pub format: MessageFormat,
}

/// 11.16 Send message +CMGS
///
/// Starts text mode submission of a message to `recipient`. The MT answers
/// with the text entry prompt `"> "`, after which the body is expected as a
/// [`MessageBody`].
#[derive(Clone, AtatCmd)]
#[at_cmd("+CMGS", NoResponse, termination = "\r")]
pub struct SendMessage<'a> {
    #[at_arg(position = 0, len = 32)]
    recipient: &'a str,
}

impl<'a> SendMessage<'a> {
    pub fn new(recipient: &'a str) -> Result<Self, Error> {
        if recipient.is_empty()
            || recipient.len() > MAX_RECIPIENT_LEN
            || recipient
                .chars()
                .any(|c| matches!(c, '"' | '\r' | '\n' | CTRL_Z | ESC))
        {
            return Err(Error::InvalidRecipient);
        }
        Ok(Self { recipient })
    }
}

/// Message text entered after the `+CMGS` prompt, terminated by Ctrl-Z.
#[derive(Clone, AtatCmd)]
#[at_cmd(
    "",
    NoResponse,
    value_sep = false,
    cmd_prefix = "",
    termination = "\x1a",
    quote_escape_strings = false
)]
pub struct MessageBody<'a> {
    #[at_arg(position = 0, len = 511)]
    text: &'a Bytes,
}

impl<'a> MessageBody<'a> {
    /// Ctrl-Z would submit the message early, ESC would abort it.
    pub fn new(text: &'a str) -> Result<Self, Error> {
        if text.is_empty() || text.chars().any(|c| matches!(c, CTRL_Z | ESC)) {
            return Err(Error::InvalidMessage);
        }
        // Room for the Ctrl-Z
        if text.len() >= COMMAND_LEN {
            return Err(Error::CommandTooLong);
        }
        Ok(Self {
            text: Bytes::new(text.as_bytes()),
        })
    }
}

/// Leaves text entry without sending the message.
#[derive(Clone, AtatCmd)]
#[at_cmd("\x1b", NoResponse, cmd_prefix = "", termination = "")]
pub struct AbortMessage;
