//! Transport layer for Raspberry Pi 500 series keyboard communication
//!
//! This crate provides report-level access to the keyboard's Vial
//! configuration interface:
//!
//! - HID device discovery and interface selection
//! - Fixed 32-byte report exchange with timeouts
//! - A typed command/reply codec over the raw reports
//! - Flow control: one exchange in flight, retries, failure poisoning

pub mod command;
pub mod error;
pub mod printer;
pub mod protocol;
pub mod types;

mod discovery;
mod flow_control;
mod hid;

pub use command::{
    validate_echo,
    Ack,
    BrightnessResponse,
    Command,
    DirectFastSet,
    DirectLedsResponse,
    EchoPolicy,
    FirmwareVersionResponse,
    GetBrightness,
    GetCurrentDirectLeds,
    GetFirmwareVersion,
    GetHue,
    GetKeycode,
    GetLayoutOptions,
    GetLedCount,
    GetLedInfo,
    GetPreset,
    GetPresetIndex,
    GetProtocolVersion,
    GetRgbInfo,
    GetSavedDirectLeds,
    GetSupportedEffects,
    GetSwitchMatrixState,
    GetUnlockStatus,
    GetUptime,
    GetVialKeyboardId,
    Hsv,
    HueResponse,
    KeycodeResponse,
    LayoutOptionsResponse,
    LedCountResponse,
    LedInfoResponse,
    LoadDirectLeds,
    Lock,
    ParseError,
    PresetIndexResponse,
    PresetResponse,
    PresetWire,
    ProtocolVersionResponse,
    Reply,
    ResetEeprom,
    ResetKeymap,
    RgbInfoResponse,
    SaveDirectLeds,
    SetBrightness,
    SetHue,
    SetKeycode,
    SetPreset,
    SetPresetIndex,
    SupportedEffectsResponse,
    SwitchMatrixResponse,
    UnlockPoll,
    UnlockPollResponse,
    UnlockStart,
    UnlockStatusResponse,
    UptimeResponse,
    VialKeyboardIdResponse,
};
pub use error::{ExchangeError, TransportError};
pub use printer::{PacketFilter, PrinterConfig, PrinterTransport};
pub use types::{DiscoveredDevice, TransportDeviceInfo};

pub use discovery::HidDiscovery;
pub use flow_control::FlowControlTransport;
pub use hid::HidTransport;

use async_trait::async_trait;
use std::sync::Arc;

/// The core transport trait - raw report exchange with the keyboard
///
/// Implementations move one framed report to the device and return the
/// report that comes back. Request/response pairing, echo validation and
/// retries live above this trait in [`FlowControlTransport`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one framed request and read one response report
    ///
    /// # Arguments
    /// * `request` - Full wire buffer (report ID byte + 32-byte body)
    ///
    /// # Returns
    /// Response report body (32 bytes, no report ID)
    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Get device information
    fn device_info(&self) -> &TransportDeviceInfo;

    /// Close the transport gracefully
    async fn close(&self) -> Result<(), TransportError>;
}

/// Type alias for a boxed transport
pub type BoxedTransport = Arc<dyn Transport>;
