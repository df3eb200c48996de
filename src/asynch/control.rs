use atat::AtatCmd;
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use embassy_sync::mutex::MutexGuard;
use embassy_time::{Duration, Instant, Timer};

use crate::command::sms::responses::MessageReference;
use crate::command::sms::{MessageBody, SendMessage};
use crate::command::{encode, encode_raw, urc::Urc, PROMPT};
use crate::config::Config;
use crate::error::Error;
use crate::{CommandText, Response};

use super::resources::Resources;
use super::runner::{command_text, CommandRequest};
use super::state::SessionState;

/// Extra time a caller waits past its deadline for the command loop to report
/// the timeout itself.
const RESULT_GRACE: Duration = Duration::from_millis(100);

/// Handle for submitting commands to a running [`Runner`](super::runner::Runner).
///
/// Cheap to copy. Concurrent submissions are serialized.
#[derive(Clone, Copy)]
pub struct Control<'a, const URC_CAPACITY: usize> {
    resources: &'a Resources<URC_CAPACITY>,
    at_timeout: Duration,
    sms_timeout: Duration,
}

impl<'a, const URC_CAPACITY: usize> Control<'a, URC_CAPACITY> {
    pub(crate) fn new(resources: &'a Resources<URC_CAPACITY>, config: &Config) -> Self {
        Self {
            resources,
            at_timeout: config.at_timeout,
            sms_timeout: config.sms_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        self.resources.state.get()
    }

    /// Execute a raw command with the configured default timeout.
    ///
    /// Returns the newline-joined response lines, including the final `OK`.
    pub async fn submit(&self, command: &str) -> Result<Response, Error> {
        self.submit_with_timeout(command, self.at_timeout).await
    }

    pub async fn submit_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<Response, Error> {
        let frame = encode_raw(command)?;

        self.resources.state.ensure_running()?;
        let mut last_id = self.resources.submit.lock().await;
        self.exchange(&mut last_id, frame, timeout).await
    }

    /// Execute a typed command with the configured default timeout.
    pub async fn send<Cmd: AtatCmd>(&self, cmd: &Cmd) -> Result<Response, Error> {
        let frame = encode(cmd)?;

        self.resources.state.ensure_running()?;
        let mut last_id = self.resources.submit.lock().await;
        self.exchange(&mut last_id, frame, self.at_timeout).await
    }

    /// Send a text mode SMS.
    ///
    /// Returns the message reference assigned by the network, when the modem
    /// reports one. No other command is executed between the `AT+CMGS` prompt
    /// and the message body.
    pub async fn send_sms(
        &self,
        recipient: &str,
        message: &str,
    ) -> Result<Option<MessageReference>, Error> {
        let start = encode(&SendMessage::new(recipient)?)?;
        let body = encode(&MessageBody::new(message)?)?;

        self.resources.state.ensure_running()?;
        let mut last_id = self.resources.submit.lock().await;

        info!("Sending SMS to {}", recipient);

        let response = self
            .exchange(&mut last_id, start, self.at_timeout)
            .await
            .map_err(|e| {
                error!("SMS submission rejected: {:?}", e);
                e
            })?;

        if !response.contains(PROMPT) {
            error!("No SMS prompt, got {:?}", response.as_str());
            return Err(Error::NoPrompt { response });
        }

        let response = self
            .exchange(&mut last_id, body, self.sms_timeout)
            .await
            .map_err(|e| {
                error!("SMS body rejected: {:?}", e);
                e
            })?;

        let reference = MessageReference::from_response(&response);
        match &reference {
            Some(reference) => info!("SMS sent, reference {}", reference.mr),
            None => info!("SMS sent"),
        }
        Ok(reference)
    }

    /// Stream of unsolicited result codes.
    ///
    /// URCs are dropped while the stream is full.
    pub fn urc_receiver(&self) -> Receiver<'a, CriticalSectionRawMutex, Urc, URC_CAPACITY> {
        self.resources.urc.receiver()
    }

    /// Stop the command loop. The in-flight command, if any, fails with
    /// [`Error::Cancelled`].
    pub fn close(&self) -> Result<(), Error> {
        self.resources.state.close()?;
        info!("Closing modem session");
        self.resources.shutdown.signal(());
        Ok(())
    }

    /// Hand one command to the loop and wait for its result.
    ///
    /// The caller must hold the submit lock.
    async fn exchange(
        &self,
        last_id: &mut MutexGuard<'_, CriticalSectionRawMutex, u32>,
        frame: CommandText,
        timeout: Duration,
    ) -> Result<Response, Error> {
        // May have been closed while queued on the lock
        self.resources.state.ensure_running()?;

        **last_id = last_id.wrapping_add(1);
        let id = **last_id;
        let deadline = Instant::now() + timeout;

        self.resources.response.reset();

        let command = command_text(&frame);
        let request = CommandRequest {
            id,
            command: frame,
            deadline,
        };

        let result = async {
            self.resources.requests.send(request).await;

            // Freed by the loop draining its queue on exit
            if self.state() == SessionState::Closed {
                return Err(Error::AlreadyClosed);
            }

            loop {
                let result = self.resources.response.wait().await;
                if result.id == id {
                    return result.result;
                }
                debug!("Discarding result of abandoned command {}", result.id);
            }
        };

        match select(result, Timer::at(deadline + RESULT_GRACE)).await {
            Either::First(result) => result,
            Either::Second(()) => {
                warn!("No result for command {} from the command loop", id);
                Err(Error::Timeout {
                    command,
                    response: Response::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::device_lock::{responses::PinStatus, types::PinStatusCode, GetPinStatus};
    use crate::test_helpers::{bring_up_script, init_logger, local, start, MockModem, Session};
    use crate::{asynch, Resources};

    #[tokio::test]
    async fn sends_sms() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            let Session { control, .. } = start::<4>(modem).await;

            modem.expect("AT+CMGS=\"+1234567890\"", "\r\n> ");
            modem.expect("Hello World\x1a", "\r\n+CMGS: 123\r\n\r\nOK\r\n");

            let reference = control.send_sms("+1234567890", "Hello World").await;
            assert_eq!(reference, Ok(Some(MessageReference { mr: 123 })));
            modem.assert_done();
        })
        .await;
    }

    #[tokio::test]
    async fn sends_typed_commands() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            let Session { control, .. } = start::<4>(modem).await;

            modem.expect("AT+CPIN?", "\r\n+CPIN: READY\r\n\r\nOK\r\n");
            let response = control.send(&GetPinStatus).await.unwrap();
            assert_eq!(
                PinStatus::from_response(&response).map(|status| status.code),
                Ok(PinStatusCode::Ready)
            );
            modem.assert_done();
        })
        .await;
    }

    #[tokio::test]
    async fn network_rejection_is_reported() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            let Session { control, .. } = start::<4>(modem).await;

            modem.expect("AT+CMGS=\"+1234567890\"", "> ");
            modem.expect("Hello World\x1a", "+CMS ERROR: 500\r\n");

            let err = control
                .send_sms("+1234567890", "Hello World")
                .await
                .unwrap_err();
            assert!(format!("{}", err).contains("+CMS ERROR: 500"), "{}", err);
        })
        .await;
    }

    #[tokio::test]
    async fn body_is_not_sent_without_prompt() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            let Session { control, .. } = start::<4>(modem).await;

            modem.expect("AT+CMGS=\"+1234567890\"", "ERROR\r\n");

            let err = control
                .send_sms("+1234567890", "Hello World")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Command { .. }), "{:?}", err);
            assert_eq!(modem.commands(), ["AT+CMGS=\"+1234567890\""]);
            modem.assert_done();
        })
        .await;
    }

    #[tokio::test]
    async fn missing_prompt_is_detected() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            let Session { control, .. } = start::<4>(modem).await;

            // Prompt trimmed away by a misbehaving modem
            modem.expect("AT+CMGS=\"+1234567890\"", ">\r\nOK\r\n");

            let err = control
                .send_sms("+1234567890", "Hello World")
                .await
                .unwrap_err();
            assert!(matches!(err, Error::NoPrompt { .. }), "{:?}", err);
            assert_eq!(modem.commands(), ["AT+CMGS=\"+1234567890\""]);
        })
        .await;
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_the_modem() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            let Session { control, .. } = start::<4>(modem).await;

            assert_eq!(
                control.send_sms("", "Hello").await,
                Err(Error::InvalidRecipient)
            );
            assert_eq!(
                control.send_sms("+1\r\nAT+CFUN=0", "Hello").await,
                Err(Error::InvalidRecipient)
            );
            assert_eq!(
                control.send_sms("+1234567890", "").await,
                Err(Error::InvalidMessage)
            );
            assert!(modem.commands().is_empty());
        })
        .await;
    }

    #[tokio::test]
    async fn submit_before_loop_starts() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            bring_up_script(modem);

            let resources = Box::leak(Box::new(Resources::<4>::new()));
            let (control, _runner) = asynch::new(resources, modem, Config::new())
                .await
                .unwrap();

            assert_eq!(control.state(), SessionState::Created);
            assert_eq!(control.submit("AT").await, Err(Error::NotInitialized));
        })
        .await;
    }

    #[tokio::test]
    async fn concurrent_callers_are_serialized() {
        local(async {
            init_logger();
            let modem = MockModem::new();
            let Session { control, .. } = start::<4>(modem).await;

            modem.expect("AT+CSQ", "+CSQ: 20,99\r\nOK\r\n");
            modem.expect("AT+CREG?", "+CREG: 0,1\r\nOK\r\n");

            let (a, b) = embassy_futures::join::join(
                control.submit("AT+CSQ"),
                control.submit("AT+CREG?"),
            )
            .await;

            assert_eq!(a.unwrap(), "+CSQ: 20,99\nOK");
            assert_eq!(b.unwrap(), "+CREG: 0,1\nOK");
            modem.assert_done();
        })
        .await;
    }
}
