//! Unsolicited result codes forwarded to the URC stream.

use heapless::String;
use serde::Serialize;

use super::{sms::urc::MessageIndication, URC_NEW_MESSAGE, URC_RING, URC_STATUS_REPORT};
use crate::Line;

/// All unsolicited responses the command loop recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Urc {
    /// A new message was stored at `index` in `storage`.
    NewMessage { storage: String<8>, index: u16 },
    /// A delivery status report was stored at `index` in `storage`.
    StatusReport { storage: String<8>, index: u16 },
    /// Incoming call.
    Ring,
    /// Recognized as unsolicited, but could not be parsed.
    Unknown(Line),
}

impl Urc {
    /// Parse a line the classifier marked as unsolicited.
    pub fn parse(line: &str) -> Self {
        if line == URC_RING {
            return Self::Ring;
        }

        let indication = || atat::serde_at::from_str::<MessageIndication>(line).ok();

        if line.starts_with(URC_NEW_MESSAGE) {
            if let Some(MessageIndication { storage, index }) = indication() {
                return Self::NewMessage { storage, index };
            }
        } else if line.starts_with(URC_STATUS_REPORT) {
            if let Some(MessageIndication { storage, index }) = indication() {
                return Self::StatusReport { storage, index };
            }
        }

        let mut raw = Line::new();
        for c in line.chars() {
            if raw.push(c).is_err() {
                break;
            }
        }
        Self::Unknown(raw)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Urc {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::NewMessage { storage, index } => {
                defmt::write!(f, "NewMessage({=str}, {})", storage.as_str(), index)
            }
            Self::StatusReport { storage, index } => {
                defmt::write!(f, "StatusReport({=str}, {})", storage.as_str(), index)
            }
            Self::Ring => defmt::write!(f, "Ring"),
            Self::Unknown(line) => defmt::write!(f, "Unknown({=str})", line.as_str()),
        }
    }
}
