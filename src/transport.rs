//! Connection to the modem.
//!
//! The core only needs a byte stream it can read from and write to. Closing
//! the connection is dropping both halves.

use embedded_io_async::{Read, Write};

use crate::error::Error;

/// Opens the connection to a modem. Invoked exactly once while constructing a
/// session.
///
/// Dropping the returned future abandons the attempt.
#[allow(async_fn_in_trait)]
pub trait Dialer {
    type Reader: Read;
    type Writer: Write;

    async fn dial(&mut self) -> Result<(Self::Reader, Self::Writer), Error>;
}

#[cfg(feature = "serial")]
pub use serial::SerialDialer;

#[cfg(feature = "serial")]
mod serial {
    use embedded_io_adapters::tokio_1::FromTokio;
    use tokio::io::{ReadHalf, WriteHalf};
    use tokio_serial::{SerialPortBuilderExt, SerialStream};

    use super::Dialer;
    use crate::error::Error;

    /// Opens a modem attached to a local serial port.
    #[derive(Debug, Clone)]
    pub struct SerialDialer {
        /// OS device path, e.g. `/dev/ttyUSB0` or `COM3`.
        pub port_name: std::string::String,
        pub baud_rate: u32,
    }

    impl SerialDialer {
        pub fn new(port_name: impl Into<std::string::String>, baud_rate: u32) -> Self {
            Self {
                port_name: port_name.into(),
                baud_rate,
            }
        }
    }

    impl Dialer for SerialDialer {
        type Reader = FromTokio<ReadHalf<SerialStream>>;
        type Writer = FromTokio<WriteHalf<SerialStream>>;

        async fn dial(&mut self) -> Result<(Self::Reader, Self::Writer), Error> {
            if self.port_name.is_empty() {
                return Err(Error::InvalidConfig("missing serial port name"));
            }

            let port = tokio_serial::new(self.port_name.as_str(), self.baud_rate)
                .open_native_async()
                .map_err(|e| {
                    error!("Failed to open serial port {}: {}", self.port_name.as_str(), e);
                    Error::Dial
                })?;

            info!("Opened {} at {} baud", self.port_name.as_str(), self.baud_rate);

            let (rx, tx) = tokio::io::split(port);
            Ok((FromTokio::new(rx), FromTokio::new(tx)))
        }
    }
}
