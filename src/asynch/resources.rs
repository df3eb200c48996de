use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

use crate::command::urc::Urc;

use super::runner::{CommandRequest, CommandResult};
use super::state::State;

/// Shared state of one modem session.
///
/// Holds everything the [`Control`](super::control::Control) handles and the
/// [`Runner`](super::runner::Runner) exchange, so it can be placed in a
/// `static` on targets without an allocator.
pub struct Resources<const URC_CAPACITY: usize> {
    pub(crate) state: State,

    /// Intake of the command loop. Only read while no command is in flight.
    pub(crate) requests: Channel<CriticalSectionRawMutex, CommandRequest, 1>,
    pub(crate) response: Signal<CriticalSectionRawMutex, CommandResult>,
    /// Serializes callers. Holds the id of the last request.
    pub(crate) submit: Mutex<CriticalSectionRawMutex, u32>,
    pub(crate) shutdown: Signal<CriticalSectionRawMutex, ()>,

    pub(crate) urc: Channel<CriticalSectionRawMutex, Urc, URC_CAPACITY>,
}

impl<const URC_CAPACITY: usize> Default for Resources<URC_CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const URC_CAPACITY: usize> Resources<URC_CAPACITY> {
    pub const fn new() -> Self {
        Self {
            state: State::new(),

            requests: Channel::new(),
            response: Signal::new(),
            submit: Mutex::new(0),
            shutdown: Signal::new(),

            urc: Channel::new(),
        }
    }
}
