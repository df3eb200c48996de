use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::error::Error;

/// Lifecycle of a modem session.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionState {
    /// Bring-up finished, the command loop has not started yet.
    Created,
    /// The command loop owns the transport.
    Running,
    /// Closed by the owner, or the command loop terminated.
    Closed,
}

pub struct State {
    shared: Mutex<CriticalSectionRawMutex, Cell<SessionState>>,
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(Cell::new(SessionState::Created)),
        }
    }

    pub fn get(&self) -> SessionState {
        self.shared.lock(|s| s.get())
    }

    /// Transition `Created -> Running`.
    pub(crate) fn start(&self) -> Result<(), Error> {
        self.shared.lock(|s| match s.get() {
            SessionState::Created => {
                s.set(SessionState::Running);
                Ok(())
            }
            SessionState::Running => Err(Error::AlreadyRunning),
            SessionState::Closed => Err(Error::AlreadyClosed),
        })
    }

    /// Transition to `Closed`, reporting a second attempt.
    pub(crate) fn close(&self) -> Result<(), Error> {
        self.shared.lock(|s| match s.replace(SessionState::Closed) {
            SessionState::Closed => Err(Error::AlreadyClosed),
            _ => Ok(()),
        })
    }

    pub(crate) fn set_closed(&self) {
        self.shared.lock(|s| s.set(SessionState::Closed));
    }

    pub(crate) fn ensure_running(&self) -> Result<(), Error> {
        match self.get() {
            SessionState::Running => Ok(()),
            SessionState::Created => Err(Error::NotInitialized),
            SessionState::Closed => Err(Error::AlreadyClosed),
        }
    }
}
