//! Argument and parameter types used by Device lock Commands and Responses

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinStatusCode {
    /// • READY: MT is not pending for any password
    Ready,
    /// • SIM PIN: MT is waiting SIM PIN to be given
    SimPin,
    /// • SIM PUK: MT is waiting SIM PUK to be given
    SimPuk,
    /// • SIM PIN2: MT is waiting SIM PIN2 to be given
    SimPin2,
    /// • SIM PUK2: MT is waiting SIM PUK2 to be given
    SimPuk2,
    /// • PH-NET PIN: MT is waiting network personalization password to be given
    PhNetPin,
    /// • PH-NETSUB PIN: MT is waiting network subset personalization password to be
    /// given
    PhNetSubPin,
    /// • PH-SP PIN: MT is waiting service provider personalization password to be given
    PhSpPin,
    /// • PH-CORP PIN: MT is waiting corporate personalization password to be given
    PhCorpPin,
    /// • PH-SIM PIN: MT is waiting phone to SIM/UICC card password to be given
    PhSimPin,
}

impl PinStatusCode {
    pub(crate) const ALL: [Self; 10] = [
        Self::Ready,
        Self::SimPin,
        Self::SimPuk,
        Self::SimPin2,
        Self::SimPuk2,
        Self::PhNetPin,
        Self::PhNetSubPin,
        Self::PhSpPin,
        Self::PhCorpPin,
        Self::PhSimPin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::SimPin => "SIM PIN",
            Self::SimPuk => "SIM PUK",
            Self::SimPin2 => "SIM PIN2",
            Self::SimPuk2 => "SIM PUK2",
            Self::PhNetPin => "PH-NET PIN",
            Self::PhNetSubPin => "PH-NETSUB PIN",
            Self::PhSpPin => "PH-SP PIN",
            Self::PhCorpPin => "PH-CORP PIN",
            Self::PhSimPin => "PH-SIM PIN",
        }
    }
}
