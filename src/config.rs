use embassy_time::Duration;
use heapless::String;

use crate::error::Error;

/// Maximum length of a SIM PIN.
pub const PIN_LEN: usize = 8;

/// Runtime configuration of a modem session.
///
/// ```ignore
/// let config = Config::new()
///     .with_sim_pin("1234")?
///     .with_at_timeout(Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// PIN used to unlock the SIM if it asks for one.
    pub sim_pin: Option<String<PIN_LEN>>,
    /// Deadline for a single command, unless the caller gives one.
    pub at_timeout: Duration,
    /// Budget for the whole bring-up sequence.
    pub init_timeout: Duration,
    /// Deadline for the message body phase of an SMS submission.
    pub sms_timeout: Duration,
    /// Pause between SIM status polls after entering the PIN.
    pub sim_poll_interval: Duration,
    pub sim_ready_timeout: Option<Duration>,
    pub sim_ready_retries: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sim_pin: None,
            at_timeout: Duration::from_secs(5),
            init_timeout: Duration::from_secs(30),
            sms_timeout: Duration::from_secs(60),
            sim_poll_interval: Duration::from_millis(500),
            sim_ready_timeout: None,
            sim_ready_retries: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sim_pin(mut self, pin: &str) -> Result<Self, Error> {
        let pin = String::try_from(pin).map_err(|_| Error::InvalidConfig("SIM PIN too long"))?;
        self.sim_pin = Some(pin);
        Ok(self)
    }

    pub fn with_at_timeout(mut self, timeout: Duration) -> Self {
        self.at_timeout = timeout;
        self
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn with_sms_timeout(mut self, timeout: Duration) -> Self {
        self.sms_timeout = timeout;
        self
    }

    pub fn with_sim_poll_interval(mut self, interval: Duration) -> Self {
        self.sim_poll_interval = interval;
        self
    }

    pub fn with_sim_ready_timeout(mut self, timeout: Duration) -> Self {
        self.sim_ready_timeout = Some(timeout);
        self
    }

    pub fn with_sim_ready_retries(mut self, retries: u32) -> Self {
        self.sim_ready_retries = Some(retries);
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        if let Some(pin) = &self.sim_pin {
            if pin.len() < 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidConfig("SIM PIN must be 4 to 8 digits"));
            }
        }

        if self.at_timeout == Duration::from_ticks(0)
            || self.init_timeout == Duration::from_ticks(0)
            || self.sms_timeout == Duration::from_ticks(0)
        {
            return Err(Error::InvalidConfig("timeouts must be non-zero"));
        }

        if self.sim_poll_interval == Duration::from_ticks(0) {
            return Err(Error::InvalidConfig("SIM poll interval must be non-zero"));
        }

        Ok(())
    }

    /// How long, and how many times, to poll the SIM status after entering
    /// the PIN.
    ///
    /// A knob left unset is derived from the other one and the poll interval.
    /// With neither set, polling may take up to `init_timeout`. Either way,
    /// polling stops early enough for bring-up to report
    /// [`Error::SimNotReady`] rather than [`Error::StateTimeout`].
    pub fn sim_poll_budget(&self) -> (Duration, u32) {
        let interval = self.sim_poll_interval.as_ticks().max(1);
        let retries_for = |timeout: Duration| {
            u32::try_from(timeout.as_ticks() / interval)
                .unwrap_or(u32::MAX)
                .max(1)
        };

        match (self.sim_ready_timeout, self.sim_ready_retries) {
            (Some(timeout), Some(retries)) => (timeout, retries),
            (Some(timeout), None) => (timeout, retries_for(timeout)),
            (None, Some(retries)) => (
                self.sim_poll_interval
                    .checked_mul(retries)
                    .unwrap_or(Duration::MAX),
                retries,
            ),
            (None, None) => (self.init_timeout, retries_for(self.init_timeout)),
        }
    }
}
