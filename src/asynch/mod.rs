//! Session setup and the async command loop.
//!
//! [`new`] dials the modem and runs the bring-up sequence. It returns a
//! [`Control`] handle for issuing commands and the [`Runner`] that has to be
//! polled for any command to make progress:
//!
//! ```ignore
//! static RESOURCES: StaticCell<Resources<4>> = StaticCell::new();
//!
//! let (control, mut runner) = cellular_sms::new(
//!     RESOURCES.init(Resources::new()),
//!     SerialDialer::new("/dev/ttyUSB0", 115_200),
//!     Config::new(),
//! )
//! .await?;
//!
//! join(runner.run(), async {
//!     control.send_sms("+1234567890", "Hello World").await
//! })
//! .await;
//! ```

pub mod control;
mod init;
pub mod resources;
pub mod runner;
pub mod state;

use embassy_time::{with_deadline, Instant};

use crate::config::Config;
use crate::error::Error;
use crate::transport::Dialer;

use self::control::Control;
use self::init::Initializer;
use self::resources::Resources;
use self::runner::Runner;

/// Dial the modem and bring it up.
///
/// On success the modem answers, has echo disabled, reports verbose errors,
/// has an unlocked SIM and is in SMS text mode. On failure the transport is
/// closed again. `resources` is reset, so it may be reused after an earlier
/// session terminated.
pub async fn new<'a, D: Dialer, const URC_CAPACITY: usize>(
    resources: &'a mut Resources<URC_CAPACITY>,
    mut dialer: D,
    config: Config,
) -> Result<
    (
        Control<'a, URC_CAPACITY>,
        Runner<'a, D::Reader, D::Writer, URC_CAPACITY>,
    ),
    Error,
> {
    config.validate()?;

    *resources = Resources::new();
    let resources: &'a Resources<URC_CAPACITY> = resources;

    let (reader, writer) = dialer.dial().await?;

    let deadline = Instant::now()
        .checked_add(config.init_timeout)
        .unwrap_or(Instant::MAX);
    let mut init = Initializer::new(reader, writer, &config, &resources.urc, deadline);
    match with_deadline(deadline, init.run()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            error!("Modem initialization timed out");
            return Err(Error::StateTimeout);
        }
    }

    let (reader, writer, tokenizer) = init.into_parts();

    Ok((
        Control::new(resources, &config),
        Runner::new(resources, reader, writer, tokenizer),
    ))
}
