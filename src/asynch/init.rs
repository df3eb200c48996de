use atat::AtatCmd;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Timer};
use embedded_io_async::{Error as _, Read, Write};

use crate::command::control::{types::Echo, SetEcho};
use crate::command::device_lock::{
    responses::PinStatus, types::PinStatusCode, GetPinStatus, SetPin,
};
use crate::command::mobile_control::{
    types::TerminationErrorMode, SetReportMobileTerminationError,
};
use crate::command::sms::{types::MessageFormat, SetMessageFormat};
use crate::command::{encode, urc::Urc, AT};
use crate::config::Config;
use crate::digest::{classify, ResponseKind, Tokenizer};
use crate::error::Error;
use crate::{Line, Response, INGRESS_BUF_SIZE};

use super::runner::{
    command_text, normalize, publish_urc, write_command, PendingResponse, READ_CHUNK_SIZE,
};

/// Brings a freshly dialed modem into a known state.
///
/// Runs on the transport directly, before the command loop takes it over.
pub(crate) struct Initializer<'a, R, W, const URC_CAPACITY: usize> {
    reader: R,
    writer: W,
    tokenizer: Tokenizer<INGRESS_BUF_SIZE>,
    config: &'a Config,
    urc: &'a Channel<CriticalSectionRawMutex, Urc, URC_CAPACITY>,
    /// End of the whole bring-up budget.
    deadline: Instant,
}

impl<'a, R: Read, W: Write, const URC_CAPACITY: usize> Initializer<'a, R, W, URC_CAPACITY> {
    pub(crate) fn new(
        reader: R,
        writer: W,
        config: &'a Config,
        urc: &'a Channel<CriticalSectionRawMutex, Urc, URC_CAPACITY>,
        deadline: Instant,
    ) -> Self {
        Self {
            reader,
            writer,
            tokenizer: Tokenizer::new(),
            config,
            urc,
            deadline,
        }
    }

    /// Hand the transport over, including bytes read but not yet consumed.
    pub(crate) fn into_parts(self) -> (R, W, Tokenizer<INGRESS_BUF_SIZE>) {
        (self.reader, self.writer, self.tokenizer)
    }

    pub(crate) async fn run(&mut self) -> Result<(), Error> {
        info!("Initializing modem");

        self.exchange(&AT).await.map_err(|e| {
            error!("Modem did not answer handshake: {:?}", e);
            if e.is_fatal() {
                e
            } else {
                Error::NotResponding
            }
        })?;

        self.exchange(&SetEcho { enabled: Echo::Off })
            .await
            .map_err(|e| step_failed("Disabling echo", e))?;

        self.exchange(&SetReportMobileTerminationError {
            n: TerminationErrorMode::Verbose,
        })
        .await
        .map_err(|e| step_failed("Enabling verbose errors", e))?;

        self.unlock_sim().await?;

        self.exchange(&SetMessageFormat {
            format: MessageFormat::Text,
        })
        .await
        .map_err(|e| step_failed("Selecting SMS text mode", e))?;

        info!("Modem initialized");
        Ok(())
    }

    async fn unlock_sim(&mut self) -> Result<(), Error> {
        let config = self.config;

        let response = self
            .exchange(&GetPinStatus)
            .await
            .map_err(|e| step_failed("Reading SIM status", e))?;

        match PinStatus::from_response(&response)?.code {
            PinStatusCode::Ready => {
                debug!("SIM ready");
                Ok(())
            }
            PinStatusCode::SimPin => {
                let Some(pin) = config.sim_pin.as_deref() else {
                    error!("SIM requires a PIN, but none is configured");
                    return Err(Error::SimPinRequired);
                };

                self.exchange(&SetPin { pin })
                    .await
                    .map_err(|e| step_failed("Entering SIM PIN", e))?;

                self.wait_for_sim_ready().await
            }
            code => {
                error!("Unsupported SIM state {}", code.as_str());
                let mut status = Line::new();
                status.push_str(code.as_str()).ok();
                Err(Error::UnsupportedSimState(status))
            }
        }
    }

    async fn wait_for_sim_ready(&mut self) -> Result<(), Error> {
        let config = self.config;
        let (timeout, retries) = config.sim_poll_budget();
        let give_up = Instant::now()
            .checked_add(timeout)
            .unwrap_or(Instant::MAX)
            .min(self.deadline);

        for attempt in 1..=retries {
            // The poll has to finish within the bring-up budget
            let poll_done = config
                .sim_poll_interval
                .checked_add(config.at_timeout)
                .and_then(|poll| Instant::now().checked_add(poll))
                .unwrap_or(Instant::MAX);
            if poll_done > self.deadline {
                debug!("No time left for SIM status poll {}", attempt);
                break;
            }

            Timer::after(config.sim_poll_interval).await;

            match self.exchange(&GetPinStatus).await {
                Ok(response) => match PinStatus::from_response(&response) {
                    Ok(PinStatus {
                        code: PinStatusCode::Ready,
                    }) => {
                        info!("SIM ready after {} polls", attempt);
                        return Ok(());
                    }
                    Ok(status) => debug!("SIM not ready: {}", status.code.as_str()),
                    Err(e) => debug!("SIM not ready: {:?}", e),
                },
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => debug!("SIM status poll failed: {:?}", e),
            }

            if Instant::now() >= give_up {
                break;
            }
        }

        error!("SIM not ready after entering PIN");
        Err(Error::SimNotReady)
    }

    async fn exchange<Cmd: AtatCmd>(&mut self, cmd: &Cmd) -> Result<Response, Error> {
        let frame = encode(cmd)?;
        debug!("Sending command {:?}", command_text(&frame).as_str());
        write_command(&mut self.writer, &frame).await?;

        let deadline = Instant::now() + self.config.at_timeout;
        let mut pending = PendingResponse::new(&frame);

        loop {
            let Some(line) = self.next_line(deadline).await? else {
                return Err(pending.into_timeout());
            };

            let line = normalize(&line);
            if line.is_empty() {
                continue;
            }

            match classify(line) {
                ResponseKind::Urc => publish_urc(self.urc, line),
                kind => {
                    if let Some(result) = pending.accept(kind, line) {
                        return result;
                    }
                }
            }
        }
    }

    /// Next line from the modem, or `None` once `deadline` has passed.
    async fn next_line(&mut self, deadline: Instant) -> Result<Option<Line>, Error> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];

        loop {
            if let Some(line) = self.tokenizer.next_token(false) {
                trace!("< {:?}", line.as_str());
                return Ok(Some(line));
            }

            match select(self.reader.read(&mut chunk), Timer::at(deadline)).await {
                Either::First(Ok(0)) => {
                    return match self.tokenizer.next_token(true) {
                        Some(line) => Ok(Some(line)),
                        None => Err(Error::Eof),
                    };
                }
                Either::First(Ok(n)) => {
                    trace!("Read {} bytes", n);
                    self.tokenizer.feed(&chunk[..n]);
                }
                Either::First(Err(e)) => return Err(Error::Transport(e.kind())),
                Either::Second(()) => return Ok(None),
            }
        }
    }
}

fn step_failed(step: &str, e: Error) -> Error {
    error!("{} failed: {:?}", step, e);
    e
}
