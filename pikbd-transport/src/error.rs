//! Transport and exchange error types

use thiserror::Error;

use crate::command::ParseError;

/// Errors from the report transport itself
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Device disconnected")]
    Disconnected,

    #[error("Exchange timeout")]
    Timeout,

    #[error("Short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    #[error("No compatible keyboard found: {0}")]
    DeviceNotFound(String),

    #[error("Keyboard firmware is not compatible: {0}")]
    NotCompatible(String),

    #[error("HID permission denied: {0}")]
    PermissionDenied(String),

    #[error("HID error: {0}")]
    Hid(String),
}

impl From<hidapi::HidError> for TransportError {
    fn from(e: hidapi::HidError) -> Self {
        let msg = e.to_string();
        if msg.contains("Permission denied") || msg.contains("EPERM") {
            TransportError::PermissionDenied(msg)
        } else if msg.contains("No such device") || msg.contains("disconnected") {
            TransportError::Disconnected
        } else {
            TransportError::Hid(msg)
        }
    }
}

/// Errors from a serialized command exchange
///
/// Produced by [`FlowControlTransport`](crate::FlowControlTransport); splits
/// raw transport failures from codec-level ones so callers can map each to
/// their own taxonomy.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected response: expected 0x{expected:02X}, got 0x{got:02X}")]
    UnexpectedResponse { expected: u8, got: u8 },

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A non-idempotent command timed out after the write phase; the device
    /// may or may not have applied it.
    #[error("Outcome of {command} is unknown: acknowledgement timed out")]
    Ambiguous { command: &'static str },
}
