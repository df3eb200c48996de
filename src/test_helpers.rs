//! Scripted modem for driving the bring-up sequence and the command loop in
//! tests.

use core::cell::RefCell;
use core::future::Future;
use std::collections::VecDeque;
use std::string::String;
use std::sync::Once;
use std::vec::Vec;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embedded_io_async::{ErrorKind, ErrorType, Read, Write};
use tokio::task::JoinHandle;

use crate::asynch::{self, control::Control, resources::Resources, state::SessionState};
use crate::config::Config;
use crate::error::Error;
use crate::transport::Dialer;

pub(crate) fn init_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Run `f` on a `LocalSet`, so tasks borrowing non-`Send` state can be spawned.
pub(crate) async fn local<F: Future>(f: F) -> F::Output {
    tokio::task::LocalSet::new().run_until(f).await
}

enum Chunk {
    Data(Vec<u8>),
    Eof,
}

#[derive(Default)]
struct Inner {
    /// Expected commands, and what the modem answers to each.
    script: VecDeque<(String, Option<String>)>,
    /// Bytes written since the last command terminator.
    partial: Vec<u8>,
    /// Commands written so far. A message body keeps its Ctrl-Z, an abort
    /// is recorded as a lone ESC.
    commands: Vec<String>,
    unexpected: Vec<String>,
    /// Part of a chunk that did not fit into the reader's buffer.
    leftover: Vec<u8>,
    closed: bool,
    fail_writes: bool,
}

const CTRL_Z: u8 = 0x1a;
const ESC: u8 = 0x1b;

pub(crate) struct MockModem {
    inbound: Channel<CriticalSectionRawMutex, Chunk, 32>,
    inner: Mutex<CriticalSectionRawMutex, RefCell<Inner>>,
}

impl MockModem {
    /// Leaked, so sessions built on it are `'static`.
    pub(crate) fn new() -> &'static Self {
        Box::leak(Box::new(Self {
            inbound: Channel::new(),
            inner: Mutex::new(RefCell::new(Inner::default())),
        }))
    }

    /// Answer the next written command, which must be `command`, with `reply`.
    pub(crate) fn expect(&self, command: &str, reply: &str) {
        self.with(|inner| {
            inner
                .script
                .push_back((command.into(), Some(reply.into())))
        });
    }

    /// Expect `command` and leave it unanswered.
    pub(crate) fn expect_silent(&self, command: &str) {
        self.with(|inner| inner.script.push_back((command.into(), None)));
    }

    /// Emit bytes that do not answer any command.
    pub(crate) fn push(&self, data: &str) {
        if self
            .inbound
            .try_send(Chunk::Data(data.as_bytes().to_vec()))
            .is_err()
        {
            panic!("mock modem inbound queue full");
        }
    }

    /// Hang up. Reads return end of stream once buffered data is consumed.
    pub(crate) fn eof(&self) {
        if self.inbound.try_send(Chunk::Eof).is_err() {
            panic!("mock modem inbound queue full");
        }
    }

    pub(crate) fn fail_writes(&self) {
        self.with(|inner| inner.fail_writes = true);
    }

    /// Commands written so far, without their terminator.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.with(|inner| inner.commands.clone())
    }

    pub(crate) fn take_commands(&self) -> Vec<String> {
        self.with(|inner| core::mem::take(&mut inner.commands))
    }

    /// Every scripted command was written, in order, and nothing else.
    pub(crate) fn assert_done(&self) {
        self.with(|inner| {
            assert!(
                inner.unexpected.is_empty(),
                "unexpected commands: {:?}",
                inner.unexpected
            );
            assert!(
                inner.script.is_empty(),
                "commands never written: {:?}",
                inner.script
            );
        });
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        self.inner.lock(|inner| f(&mut inner.borrow_mut()))
    }

    fn take_leftover(&self, buf: &mut [u8]) -> Option<usize> {
        self.with(|inner| {
            if inner.leftover.is_empty() {
                return None;
            }
            let n = buf.len().min(inner.leftover.len());
            buf[..n].copy_from_slice(&inner.leftover[..n]);
            inner.leftover.drain(..n);
            Some(n)
        })
    }
}

pub(crate) struct MockReader<'a>(&'a MockModem);

pub(crate) struct MockWriter<'a>(&'a MockModem);

impl ErrorType for MockReader<'_> {
    type Error = ErrorKind;
}

impl ErrorType for MockWriter<'_> {
    type Error = ErrorKind;
}

impl Read for MockReader<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if let Some(n) = self.0.take_leftover(buf) {
                return Ok(n);
            }

            if self.0.with(|inner| inner.closed) {
                return Ok(0);
            }

            match self.0.inbound.receive().await {
                Chunk::Data(data) => self.0.with(|inner| inner.leftover.extend(data)),
                Chunk::Eof => self.0.with(|inner| inner.closed = true),
            }
        }
    }
}

impl Write for MockWriter<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let replies = self.0.with(|inner| {
            if inner.fail_writes {
                return Err(ErrorKind::BrokenPipe);
            }

            inner.partial.extend_from_slice(buf);

            let mut replies = Vec::new();
            while let Some(end) = inner
                .partial
                .iter()
                .position(|&b| matches!(b, b'\r' | CTRL_Z | ESC))
            {
                let mut line: Vec<u8> = inner.partial.drain(..=end).collect();
                if line.ends_with(b"\r") {
                    line.pop();
                }
                let command = String::from_utf8_lossy(&line).into_owned();
                inner.commands.push(command.clone());

                match inner.script.pop_front() {
                    Some((expected, reply)) => {
                        if expected != command {
                            inner
                                .unexpected
                                .push(format!("expected {:?}, got {:?}", expected, command));
                        }
                        replies.extend(reply);
                    }
                    None => inner.unexpected.push(command),
                }
            }
            Ok(replies)
        })?;

        for reply in replies {
            self.0.push(&reply);
        }

        Ok(buf.len())
    }
}

impl<'a> Dialer for &'a MockModem {
    type Reader = MockReader<'a>;
    type Writer = MockWriter<'a>;

    async fn dial(&mut self) -> Result<(Self::Reader, Self::Writer), Error> {
        Ok((MockReader(*self), MockWriter(*self)))
    }
}

/// Replies of an echoing modem with a ready SIM.
pub(crate) fn bring_up_script(modem: &MockModem) {
    modem.expect("AT", "AT\r\nOK\r\n");
    modem.expect("ATE0", "ATE0\r\nOK\r\n");
    modem.expect("AT+CMEE=2", "\r\nOK\r\n");
    modem.expect("AT+CPIN?", "\r\n+CPIN: READY\r\n\r\nOK\r\n");
    modem.expect("AT+CMGF=1", "\r\nOK\r\n");
}

pub(crate) struct Session<const URC_CAPACITY: usize> {
    pub(crate) control: Control<'static, URC_CAPACITY>,
    pub(crate) runner: JoinHandle<Result<(), Error>>,
}

/// Bring up `modem` and start the command loop on the local task set.
pub(crate) async fn start<const URC_CAPACITY: usize>(
    modem: &'static MockModem,
) -> Session<URC_CAPACITY> {
    bring_up_script(modem);

    let resources = Box::leak(Box::new(Resources::<URC_CAPACITY>::new()));
    let (control, mut runner) = asynch::new(resources, modem, Config::new())
        .await
        .unwrap();
    modem.assert_done();
    modem.take_commands();

    let runner = tokio::task::spawn_local(async move { runner.run().await });
    while control.state() != SessionState::Running {
        tokio::task::yield_now().await;
    }

    Session { control, runner }
}
