//! Unsolicited responses for Short Messages Service Commands
use atat::atat_derive::AtatResp;
use heapless::String;

/// 11.8.1 New message indication +CMTI
/// 11.8.3 Status report indication +CDSI
///
/// Indicates that a new message, or a delivery status report, has been
/// stored at `index` in memory `storage`.
#[derive(Debug, Clone, PartialEq, Eq, AtatResp)]
pub struct MessageIndication {
    #[at_arg(position = 0)]
    pub storage: String<8>,
    #[at_arg(position = 1)]
    pub index: u16,
}
