//! Responses for Short Messages Service Commands
use atat::atat_derive::AtatResp;

const SEND_MESSAGE_PREFIX: &str = "+CMGS:";

/// 11.16 Send message +CMGS
///
/// `<mr>`: reference the network assigned to the submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatResp)]
pub struct MessageReference {
    #[at_arg(position = 0)]
    pub mr: u8,
}

impl MessageReference {
    /// Find the `+CMGS: <mr>` line in the joined response to a message body.
    pub fn from_response(response: &str) -> Option<Self> {
        let line = response
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with(SEND_MESSAGE_PREFIX))?;

        atat::serde_at::from_str(line).ok()
    }
}
