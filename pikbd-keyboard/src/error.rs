//! Keyboard session error types

use pikbd_transport::{ExchangeError, ParseError, TransportError};
use thiserror::Error;

use crate::capability::Capability;
use crate::identity::{FirmwareVersion, KeyboardModel};

/// Errors from keyboard operations
#[derive(Error, Debug)]
pub enum KeyboardError {
    /// Transport layer error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Protocol-level error (well-formed transport, bad content)
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Security gate failure
    #[error("Security error: {0}")]
    Security(#[from] SecurityError),

    /// Capability gate failure
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    /// A write command timed out after the request was sent
    #[error("Outcome of {operation} is unknown: the command may have been applied")]
    Ambiguous { operation: &'static str },

    /// Parameter validation failure
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// The device answered, but not with what the protocol promises
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Response echo did not match the request
    #[error("Unexpected response: expected 0x{expected:02X}, got 0x{got:02X}")]
    UnexpectedResponse { expected: u8, got: u8 },

    /// The connected firmware does not meet a session requirement
    #[error("Unsupported device: {0}")]
    Unsupported(String),

    /// Response failed to decode
    #[error("Malformed response: {0}")]
    Malformed(#[from] ParseError),
}

/// Security state machine errors
#[derive(Error, Debug)]
pub enum SecurityError {
    /// A privileged operation was attempted while locked
    #[error("Device is locked; run unlock first")]
    LockedDevice,

    /// The unlock handshake did not complete before the deadline
    #[error("Unlock timed out after {waited:?}; the unlock keys were not held")]
    UnlockTimeout { waited: std::time::Duration },
}

/// Capability gate errors, raised before any exchange
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The feature does not exist on this model
    #[error("{feature} is not supported by the {model}")]
    UnsupportedByModel {
        feature: Capability,
        model: KeyboardModel,
    },

    /// The feature needs newer firmware than the device runs
    #[error("{feature} requires firmware {required} or later")]
    UnsupportedByFirmware {
        feature: Capability,
        required: FirmwareVersion,
    },
}

/// Parameter validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Numeric argument outside its legal range
    #[error("{field} {value} is out of range (max {max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },

    /// Malformed string argument
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl From<ExchangeError> for KeyboardError {
    fn from(e: ExchangeError) -> Self {
        match e {
            ExchangeError::Transport(t) => Self::Transport(t),
            ExchangeError::UnexpectedResponse { expected, got } => {
                Self::Protocol(ProtocolError::UnexpectedResponse { expected, got })
            }
            ExchangeError::Parse(p) => Self::Protocol(ProtocolError::Malformed(p)),
            ExchangeError::Ambiguous { command } => Self::Ambiguous { operation: command },
        }
    }
}
