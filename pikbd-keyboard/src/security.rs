//! Vial security state
//!
//! The device gates keymap writes and matrix reads behind a physical
//! unlock handshake. The session mirrors the device state and never
//! fabricates a transition; everything here derives from wire replies.

use std::fmt;

use pikbd_transport::{UnlockPollResponse, UnlockStatusResponse};

/// Lock state as last reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityState {
    Locked,
    /// Handshake started; the unlock keys must be held until it resolves
    Unlocking,
    Unlocked,
}

impl SecurityState {
    pub fn from_flags(unlocked: bool, in_progress: bool) -> Self {
        if unlocked {
            Self::Unlocked
        } else if in_progress {
            Self::Unlocking
        } else {
            Self::Locked
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked)
    }
}

impl fmt::Display for SecurityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "locked"),
            Self::Unlocking => write!(f, "unlocking"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}

/// Unlock status snapshot, including the keys to hold for the handshake
#[derive(Debug, Clone)]
pub struct UnlockStatus {
    pub unlocked: bool,
    pub in_progress: bool,
    /// Matrix positions that must be held during the handshake
    pub keys: Vec<(u8, u8)>,
}

impl UnlockStatus {
    pub fn state(&self) -> SecurityState {
        SecurityState::from_flags(self.unlocked, self.in_progress)
    }
}

impl From<UnlockStatusResponse> for UnlockStatus {
    fn from(resp: UnlockStatusResponse) -> Self {
        Self {
            unlocked: resp.unlocked,
            in_progress: resp.in_progress,
            keys: resp.keys,
        }
    }
}

impl From<&UnlockPollResponse> for SecurityState {
    fn from(resp: &UnlockPollResponse) -> Self {
        Self::from_flags(resp.unlocked, resp.in_progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_flags() {
        assert_eq!(SecurityState::from_flags(true, false), SecurityState::Unlocked);
        // Firmware reports unlocked with the in-progress bit still set
        // briefly at the end of a handshake; unlocked wins.
        assert_eq!(SecurityState::from_flags(true, true), SecurityState::Unlocked);
        assert_eq!(
            SecurityState::from_flags(false, true),
            SecurityState::Unlocking
        );
        assert_eq!(SecurityState::from_flags(false, false), SecurityState::Locked);
    }
}
