//! Tokenizing and classification of the modem's output stream.
//!
//! Responses arrive as `\r\n` terminated lines, interleaved with unsolicited
//! result codes. The only token that is not line terminated is the SMS text
//! entry prompt `"> "`.
//!
//! **NOTE** Both functions assume the modem does not echo commands (`ATE0`).

use heapless::Vec;

use crate::command::{
    BUSY, CME_ERROR, CMS_ERROR, CRLF, ERROR, NO_ANSWER, NO_CARRIER, NO_DIALTONE, OK, PROMPT,
    URC_NEW_MESSAGE, URC_RING, URC_STATUS_REPORT,
};
use crate::Line;

/// Kind of a line received from the modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseKind {
    /// Terminates the response to a command, e.g. `OK` or `+CME ERROR: 10`.
    Final,
    /// Unsolicited notification, e.g. `+CMTI: "SM",3` or `RING`.
    Urc,
    /// Intermediate output of a command.
    Data,
    /// SMS text entry prompt.
    Prompt,
}

/// Split the next token off `buf`.
///
/// Returns how many bytes were consumed and the token, if a complete one is
/// available. `at_eof` signals that no more data will ever be appended to
/// `buf`, in which case any unterminated remainder is returned as the final
/// token.
pub fn split(buf: &[u8], at_eof: bool) -> (usize, Option<&[u8]>) {
    if at_eof && buf.is_empty() {
        return (0, None);
    }

    if buf.starts_with(PROMPT.as_bytes()) {
        return (PROMPT.len(), Some(&buf[..PROMPT.len()]));
    }

    if let Some(i) = buf.windows(CRLF.len()).position(|w| w == CRLF.as_bytes()) {
        return (i + CRLF.len(), Some(&buf[..i]));
    }

    if at_eof {
        return (buf.len(), Some(buf));
    }

    (0, None)
}

/// Classify a line received from the modem.
///
/// Matching is exact; the prompt and result code checks run before the URC
/// prefixes.
pub fn classify(line: &str) -> ResponseKind {
    if line == PROMPT {
        return ResponseKind::Prompt;
    }

    if matches!(
        line,
        OK | ERROR | NO_CARRIER | NO_DIALTONE | BUSY | NO_ANSWER
    ) {
        return ResponseKind::Final;
    }

    if line.starts_with(CME_ERROR) || line.starts_with(CMS_ERROR) {
        ResponseKind::Final
    } else if line.starts_with(URC_NEW_MESSAGE)
        || line.starts_with(URC_STATUS_REPORT)
        || line == URC_RING
    {
        ResponseKind::Urc
    } else {
        ResponseKind::Data
    }
}

/// Incremental tokenizer over a fixed size ingress buffer.
pub struct Tokenizer<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> Default for Tokenizer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Tokenizer<N> {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Number of buffered bytes not yet returned as a token.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Append bytes read from the transport.
    ///
    /// If the buffer cannot hold them, the buffered bytes are discarded first;
    /// a modem emitting more than `N` bytes without a line terminator is out
    /// of protocol.
    pub fn feed(&mut self, data: &[u8]) {
        if self.buf.len() + data.len() > N {
            warn!("Ingress buffer full, discarding {} bytes", self.buf.len());
            self.buf.clear();
        }

        let data = if data.len() > N {
            &data[data.len() - N..]
        } else {
            data
        };

        // Capacity checked above
        self.buf.extend_from_slice(data).ok();
    }

    /// Take the next complete token, if any.
    pub fn next_token(&mut self, at_eof: bool) -> Option<Line> {
        let (advance, token) = split(&self.buf, at_eof);
        let line = token.map(to_line);
        self.consume(advance);
        line
    }

    fn consume(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        let len = self.buf.len();
        self.buf.copy_within(n..len, 0);
        self.buf.truncate(len - n);
    }
}

fn to_line(bytes: &[u8]) -> Line {
    let mut line = Line::new();
    for chunk in bytes.utf8_chunks() {
        for c in chunk.valid().chars() {
            if line.push(c).is_err() {
                warn!("Line exceeds {} bytes, truncating", crate::LINE_LEN);
                return line;
            }
        }
        if !chunk.invalid().is_empty() && line.push(char::REPLACEMENT_CHARACTER).is_err() {
            return line;
        }
    }
    line
}
