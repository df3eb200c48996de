use core::convert::Infallible;

use embassy_futures::select::{select, select3, Either, Either3};
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Timer};
use embedded_io_async::{Error as _, Read, Write};

use crate::command::{encode, sms::AbortMessage, urc::Urc, OK, PROMPT};
use crate::digest::{classify, ResponseKind, Tokenizer};
use crate::error::Error;
use crate::{CommandText, Line, Response, INGRESS_BUF_SIZE};

use super::resources::Resources;

/// Lines the scanner may run ahead of the dispatcher.
pub(crate) const TOKEN_QUEUE_DEPTH: usize = 8;

pub(crate) const READ_CHUNK_SIZE: usize = 64;

pub(crate) struct CommandRequest {
    pub(crate) id: u32,
    /// Written as is, terminator included.
    pub(crate) command: CommandText,
    pub(crate) deadline: Instant,
}

pub(crate) struct CommandResult {
    pub(crate) id: u32,
    pub(crate) result: Result<Response, Error>,
}

enum Ingress {
    Line(Line),
    /// The transport is gone. Always the last item.
    Closed(Error),
}

type TokenQueue = Channel<NoopRawMutex, Ingress, TOKEN_QUEUE_DEPTH>;

/// Owner of the modem transport.
///
/// Executes one command at a time on behalf of the
/// [`Control`](super::control::Control) handles, and forwards unsolicited
/// result codes. Nothing else touches the transport while the runner exists.
pub struct Runner<'a, R: Read, W: Write, const URC_CAPACITY: usize> {
    resources: &'a Resources<URC_CAPACITY>,
    transport: Option<(R, W)>,
    tokenizer: Tokenizer<INGRESS_BUF_SIZE>,
}

impl<'a, R: Read, W: Write, const URC_CAPACITY: usize> Runner<'a, R, W, URC_CAPACITY> {
    pub(crate) fn new(
        resources: &'a Resources<URC_CAPACITY>,
        reader: R,
        writer: W,
        tokenizer: Tokenizer<INGRESS_BUF_SIZE>,
    ) -> Self {
        Self {
            resources,
            transport: Some((reader, writer)),
            tokenizer,
        }
    }

    /// Run the command loop until the session is closed or the transport
    /// fails.
    ///
    /// Returns `Ok(())` after [`Control::close`](super::control::Control::close),
    /// and the transport error otherwise. The transport is dropped on return,
    /// and the runner cannot be started again.
    pub async fn run(&mut self) -> Result<(), Error> {
        let resources = self.resources;
        resources.state.start()?;

        let Some((mut reader, mut writer)) = self.transport.take() else {
            resources.state.set_closed();
            return Err(Error::AlreadyClosed);
        };

        info!("Command loop started");

        let tokens = TokenQueue::new();
        let result = match select(
            scan(&mut reader, &mut self.tokenizer, &tokens),
            dispatch(resources, &mut writer, &tokens),
        )
        .await
        {
            Either::First(never) => match never {},
            Either::Second(result) => result,
        };

        resources.state.set_closed();

        // A request accepted into the queue but never started
        let abandoned = match &result {
            Err(e) => e.clone(),
            Ok(()) => Error::Cancelled,
        };
        while let Ok(request) = resources.requests.try_receive() {
            debug!("Cancelling queued command {}", request.id);
            respond(resources, request.id, Err(abandoned.clone()));
        }

        match &result {
            Ok(()) => info!("Command loop stopped"),
            Err(e) => error!("Command loop terminated: {:?}", e),
        }

        result
    }
}

/// Read the transport and queue complete lines for the dispatcher.
async fn scan<R: Read>(
    reader: &mut R,
    tokenizer: &mut Tokenizer<INGRESS_BUF_SIZE>,
    tokens: &TokenQueue,
) -> Infallible {
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        while let Some(line) = tokenizer.next_token(false) {
            trace!("< {:?}", line.as_str());
            tokens.send(Ingress::Line(line)).await;
        }

        match reader.read(&mut chunk).await {
            Ok(0) => {
                while let Some(line) = tokenizer.next_token(true) {
                    trace!("< {:?}", line.as_str());
                    tokens.send(Ingress::Line(line)).await;
                }
                warn!("Transport closed by modem");
                tokens.send(Ingress::Closed(Error::Eof)).await;
                break;
            }
            Ok(n) => {
                trace!("Read {} bytes", n);
                tokenizer.feed(&chunk[..n]);
            }
            Err(e) => {
                tokens.send(Ingress::Closed(Error::Transport(e.kind()))).await;
                break;
            }
        }
    }

    core::future::pending().await
}

async fn dispatch<W: Write, const URC_CAPACITY: usize>(
    resources: &Resources<URC_CAPACITY>,
    writer: &mut W,
    tokens: &TokenQueue,
) -> Result<(), Error> {
    loop {
        // New requests are only accepted while nothing is in flight
        let request = match select3(
            resources.requests.receive(),
            tokens.receive(),
            resources.shutdown.wait(),
        )
        .await
        {
            Either3::First(request) => request,
            Either3::Second(Ingress::Line(line)) => {
                unsolicited(resources, writer, &line).await?;
                continue;
            }
            Either3::Second(Ingress::Closed(e)) => return Err(e),
            Either3::Third(()) => return Ok(()),
        };

        if let Some(result) = execute(resources, writer, tokens, request).await {
            return result;
        }
    }
}

/// Write `request` and collect its response.
///
/// Returns `Some` when the loop has to stop.
async fn execute<W: Write, const URC_CAPACITY: usize>(
    resources: &Resources<URC_CAPACITY>,
    writer: &mut W,
    tokens: &TokenQueue,
    request: CommandRequest,
) -> Option<Result<(), Error>> {
    let CommandRequest {
        id,
        command,
        deadline,
    } = request;

    let mut pending = PendingResponse::new(&command);

    if Instant::now() >= deadline {
        debug!("Command {} expired before it was sent", id);
        respond(resources, id, Err(pending.into_timeout()));
        return None;
    }

    debug!("Sending command {}: {:?}", id, command.trim());

    if let Err(e) = write_command(writer, &command).await {
        respond(resources, id, Err(e.clone()));
        return Some(Err(e));
    }

    loop {
        match select3(
            tokens.receive(),
            Timer::at(deadline),
            resources.shutdown.wait(),
        )
        .await
        {
            Either3::First(Ingress::Line(line)) => {
                let line = normalize(&line);
                if line.is_empty() {
                    continue;
                }

                match classify(line) {
                    ResponseKind::Urc => publish_urc(&resources.urc, line),
                    kind => {
                        if let Some(result) = pending.accept(kind, line) {
                            respond(resources, id, result);
                            return None;
                        }
                    }
                }
            }
            Either3::First(Ingress::Closed(e)) => {
                respond(resources, id, Err(e.clone()));
                return Some(Err(e));
            }
            Either3::Second(()) => {
                warn!("Command {} timed out", id);
                respond(resources, id, Err(pending.into_timeout()));
                return None;
            }
            Either3::Third(()) => {
                respond(resources, id, Err(Error::Cancelled));
                return Some(Ok(()));
            }
        }
    }
}

fn respond<const URC_CAPACITY: usize>(
    resources: &Resources<URC_CAPACITY>,
    id: u32,
    result: Result<Response, Error>,
) {
    resources.response.signal(CommandResult { id, result });
}

/// A line received while no command is in flight.
///
/// A text entry prompt here belongs to an abandoned message submission. It is
/// aborted, or the modem would take the next command as the message body.
async fn unsolicited<W: Write, const URC_CAPACITY: usize>(
    resources: &Resources<URC_CAPACITY>,
    writer: &mut W,
    line: &str,
) -> Result<(), Error> {
    let line = normalize(line);
    if line.is_empty() {
        return Ok(());
    }

    match classify(line) {
        ResponseKind::Urc => publish_urc(&resources.urc, line),
        ResponseKind::Prompt => {
            warn!("Unexpected text entry prompt, aborting message");
            write_command(writer, &encode(&AbortMessage)?).await?;
        }
        _ => warn!("Discarding unsolicited line: {:?}", line),
    }
    Ok(())
}

/// Forward a URC without ever blocking the reader.
pub(crate) fn publish_urc<const URC_CAPACITY: usize>(
    urc: &Channel<CriticalSectionRawMutex, Urc, URC_CAPACITY>,
    line: &str,
) {
    debug!("URC: {:?}", line);
    if urc.try_send(Urc::parse(line)).is_err() {
        warn!("URC queue full, dropping {:?}", line);
    }
}

/// The prompt is the only token whose surrounding whitespace is significant.
pub(crate) fn normalize(line: &str) -> &str {
    if line == PROMPT {
        line
    } else {
        line.trim()
    }
}

/// Write an encoded command, terminator included, in a single write.
pub(crate) async fn write_command<W: Write>(writer: &mut W, frame: &str) -> Result<(), Error> {
    trace!("> {:?}", frame);

    writer
        .write_all(frame.as_bytes())
        .await
        .map_err(|e| Error::Transport(e.kind()))?;
    writer.flush().await.map_err(|e| Error::Transport(e.kind()))
}

/// The command as reported in errors, without its terminator.
pub(crate) fn command_text(frame: &str) -> CommandText {
    CommandText::try_from(frame.trim()).unwrap_or_default()
}

/// Response lines collected for the command in flight.
pub(crate) struct PendingResponse {
    command: CommandText,
    response: Response,
    truncated: bool,
}

impl PendingResponse {
    pub(crate) fn new(frame: &str) -> Self {
        Self {
            command: command_text(frame),
            response: Response::new(),
            truncated: false,
        }
    }

    /// Add a normalized, non-URC line. Returns the outcome once `line`
    /// terminates the response.
    pub(crate) fn accept(
        &mut self,
        kind: ResponseKind,
        line: &str,
    ) -> Option<Result<Response, Error>> {
        self.append(line);

        match kind {
            ResponseKind::Data | ResponseKind::Urc => None,
            ResponseKind::Prompt => Some(Ok(core::mem::take(&mut self.response))),
            ResponseKind::Final if line == OK => Some(Ok(core::mem::take(&mut self.response))),
            ResponseKind::Final => Some(Err(Error::Command {
                command: self.command.clone(),
                code: truncated(line),
                response: core::mem::take(&mut self.response),
            })),
        }
    }

    pub(crate) fn into_timeout(self) -> Error {
        Error::Timeout {
            command: self.command,
            response: self.response,
        }
    }

    fn append(&mut self, line: &str) {
        if self.truncated {
            return;
        }

        let separator = if self.response.is_empty() { "" } else { "\n" };
        if self.response.push_str(separator).is_err() || self.response.push_str(line).is_err() {
            warn!(
                "Response to {:?} exceeds {} bytes, truncating",
                self.command.as_str(),
                crate::RESPONSE_LEN
            );
            self.truncated = true;
        }
    }
}

fn truncated(line: &str) -> Line {
    let mut out = Line::new();
    for c in line.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
