//! Type-safe command builders and response parsers
//!
//! This module provides a cleaner API for building keyboard commands and
//! parsing responses, handling protocol quirks (byte ordering, echo layouts,
//! paged transfers) in one place.

use std::fmt;

use crate::protocol::{self, cmd, keyboard_value, rpi, vial, vialrgb};
use zerocopy::little_endian::U16;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

// =============================================================================
// Core Traits
// =============================================================================

/// How a response echoes the request it answers
///
/// Most commands echo their command byte (and sub-command byte where one
/// exists) at the start of the response. A few Vial replies carry raw data
/// from byte 0 with no echo at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoPolicy {
    /// Response byte 0 echoes the command, byte 1 the sub-command
    CmdAndSub,
    /// Response byte 0 echoes the command
    CmdOnly,
    /// Response carries no echo; data starts at byte 0
    None,
}

/// A command that can be serialized to a 32-byte report
pub trait Command {
    /// Command byte (e.g. 0xFC for RPI_COMMAND)
    const OPCODE: u8;

    /// Sub-command byte, if this command family uses one
    const SUB: Option<u8>;

    /// Echo layout of the expected response
    const ECHO: EchoPolicy;

    /// Whether resending after a timeout cannot change device state
    const IDEMPOTENT: bool;

    /// Serialize to bytes (excluding command and sub-command bytes)
    fn payload(&self) -> Vec<u8>;

    /// Assemble the logical report: command, sub-command, payload
    fn report(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(protocol::REPORT_SIZE);
        buf.push(Self::OPCODE);
        if let Some(sub) = Self::SUB {
            buf.push(sub);
        }
        buf.extend_from_slice(&self.payload());
        buf
    }

    /// Build the complete on-wire buffer (report ID plus padded report)
    fn build(&self) -> Vec<u8> {
        protocol::frame_report(&self.report())
    }

    /// Command name for diagnostics
    fn name() -> &'static str {
        protocol::command_name(Self::OPCODE, Self::SUB)
    }
}

/// A response that can be parsed from a 32-byte report
pub trait Reply: Sized {
    /// Minimum response length required
    const MIN_LEN: usize;

    /// Parse from response bytes (echo already validated)
    fn from_report(report: &[u8]) -> Result<Self, ParseError>;

    /// Parse with length validation
    fn parse(report: &[u8]) -> Result<Self, ParseError> {
        if report.len() < Self::MIN_LEN {
            return Err(ParseError::TooShort {
                expected: Self::MIN_LEN,
                got: report.len(),
            });
        }
        Self::from_report(report)
    }
}

/// Check that a response's leading bytes echo the request
pub fn validate_echo(
    policy: EchoPolicy,
    opcode: u8,
    sub: Option<u8>,
    report: &[u8],
) -> Result<(), ParseError> {
    match policy {
        EchoPolicy::None => Ok(()),
        EchoPolicy::CmdOnly => {
            if report.is_empty() {
                return Err(ParseError::TooShort {
                    expected: 1,
                    got: 0,
                });
            }
            if report[0] != opcode {
                return Err(ParseError::CommandMismatch {
                    expected: opcode,
                    got: report[0],
                });
            }
            Ok(())
        }
        EchoPolicy::CmdAndSub => {
            if report.len() < 2 {
                return Err(ParseError::TooShort {
                    expected: 2,
                    got: report.len(),
                });
            }
            if report[0] != opcode {
                return Err(ParseError::CommandMismatch {
                    expected: opcode,
                    got: report[0],
                });
            }
            if let Some(sub) = sub {
                if report[1] != sub {
                    return Err(ParseError::CommandMismatch {
                        expected: sub,
                        got: report[1],
                    });
                }
            }
            Ok(())
        }
    }
}

/// Parse error for responses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    TooShort { expected: usize, got: usize },
    CommandMismatch { expected: u8, got: u8 },
    InvalidValue { field: &'static str, value: u8 },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { expected, got } => {
                write!(
                    f,
                    "Response too short: expected {} bytes, got {}",
                    expected, got
                )
            }
            Self::CommandMismatch { expected, got } => {
                write!(
                    f,
                    "Command mismatch: expected 0x{:02X}, got 0x{:02X}",
                    expected, got
                )
            }
            Self::InvalidValue { field, value } => {
                write!(f, "Invalid value for {}: 0x{:02X}", field, value)
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Reply for commands that return nothing beyond their echo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

impl Reply for Ack {
    const MIN_LEN: usize = 1;

    fn from_report(_report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self)
    }
}

// =============================================================================
// Via Core Commands
// =============================================================================

/// GET_PROTOCOL_VERSION (0x01)
///
/// Sent with a zero sub-command byte; the high version byte doubles as the
/// sub-command echo, which holds as long as the version stays below 0x0100.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetProtocolVersion;

impl Command for GetProtocolVersion {
    const OPCODE: u8 = cmd::GET_PROTOCOL_VERSION;
    const SUB: Option<u8> = Some(0x00);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_PROTOCOL_VERSION response
#[derive(Debug, Clone, Copy)]
pub struct ProtocolVersionResponse {
    /// Via protocol version (big-endian on the wire)
    pub version: u16,
}

impl Reply for ProtocolVersionResponse {
    const MIN_LEN: usize = 3;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            version: u16::from_be_bytes([report[1], report[2]]),
        })
    }
}

/// GET_KEYBOARD_VALUE / GET_UPTIME (0x02 / 0x01)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetUptime;

impl Command for GetUptime {
    const OPCODE: u8 = cmd::GET_KEYBOARD_VALUE;
    const SUB: Option<u8> = Some(keyboard_value::GET_UPTIME);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_UPTIME response
#[derive(Debug, Clone, Copy)]
pub struct UptimeResponse {
    /// Milliseconds since firmware boot
    pub millis: u32,
}

impl Reply for UptimeResponse {
    const MIN_LEN: usize = 6;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            millis: u32::from_be_bytes([report[2], report[3], report[4], report[5]]),
        })
    }
}

/// GET_KEYBOARD_VALUE / GET_LAYOUT_OPTIONS (0x02 / 0x02)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetLayoutOptions;

impl Command for GetLayoutOptions {
    const OPCODE: u8 = cmd::GET_KEYBOARD_VALUE;
    const SUB: Option<u8> = Some(keyboard_value::GET_LAYOUT_OPTIONS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_LAYOUT_OPTIONS response
#[derive(Debug, Clone, Copy)]
pub struct LayoutOptionsResponse {
    /// Layout option bitfield
    pub options: u32,
}

impl Reply for LayoutOptionsResponse {
    const MIN_LEN: usize = 6;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            options: u32::from_be_bytes([report[2], report[3], report[4], report[5]]),
        })
    }
}

/// GET_KEYBOARD_VALUE / GET_SWITCH_MATRIX_STATE (0x02 / 0x03)
///
/// Requires an unlocked keyboard; locked firmware answers all zeroes.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetSwitchMatrixState;

impl Command for GetSwitchMatrixState {
    const OPCODE: u8 = cmd::GET_KEYBOARD_VALUE;
    const SUB: Option<u8> = Some(keyboard_value::GET_SWITCH_MATRIX_STATE);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_SWITCH_MATRIX_STATE response
///
/// Carries one packed bitmask per matrix row. Row width and count depend on
/// the keyboard model, so decoding is left to the caller.
#[derive(Debug, Clone)]
pub struct SwitchMatrixResponse {
    /// Raw row bitmask bytes (everything after the echo)
    pub raw: Vec<u8>,
}

impl Reply for SwitchMatrixResponse {
    const MIN_LEN: usize = 2;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            raw: report[2..].to_vec(),
        })
    }
}

// =============================================================================
// Dynamic Keymap Commands
// =============================================================================

/// DYNAMIC_KEYMAP_GET_KEYCODE (0x04)
#[derive(Debug, Clone, Copy)]
pub struct GetKeycode {
    pub layer: u8,
    pub row: u8,
    pub col: u8,
}

impl GetKeycode {
    pub fn new(layer: u8, row: u8, col: u8) -> Self {
        Self { layer, row, col }
    }
}

impl Command for GetKeycode {
    const OPCODE: u8 = cmd::DYNAMIC_KEYMAP_GET_KEYCODE;
    const SUB: Option<u8> = None;
    const ECHO: EchoPolicy = EchoPolicy::CmdOnly;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        vec![self.layer, self.row, self.col]
    }
}

/// DYNAMIC_KEYMAP_SET_KEYCODE (0x05)
#[derive(Debug, Clone, Copy)]
pub struct SetKeycode {
    pub layer: u8,
    pub row: u8,
    pub col: u8,
    pub keycode: u16,
}

impl SetKeycode {
    pub fn new(layer: u8, row: u8, col: u8, keycode: u16) -> Self {
        Self {
            layer,
            row,
            col,
            keycode,
        }
    }
}

impl Command for SetKeycode {
    const OPCODE: u8 = cmd::DYNAMIC_KEYMAP_SET_KEYCODE;
    const SUB: Option<u8> = None;
    const ECHO: EchoPolicy = EchoPolicy::CmdOnly;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        let kc = self.keycode.to_be_bytes();
        vec![self.layer, self.row, self.col, kc[0], kc[1]]
    }
}

/// Keycode response, shared by get and set (both echo the full position)
#[derive(Debug, Clone, Copy)]
pub struct KeycodeResponse {
    pub layer: u8,
    pub row: u8,
    pub col: u8,
    /// QMK keycode (big-endian on the wire)
    pub keycode: u16,
}

impl Reply for KeycodeResponse {
    const MIN_LEN: usize = 6;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            layer: report[1],
            row: report[2],
            col: report[3],
            keycode: u16::from_be_bytes([report[4], report[5]]),
        })
    }
}

/// DYNAMIC_KEYMAP_RESET (0x06)
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetKeymap;

impl Command for ResetKeymap {
    const OPCODE: u8 = cmd::DYNAMIC_KEYMAP_RESET;
    const SUB: Option<u8> = None;
    const ECHO: EchoPolicy = EchoPolicy::CmdOnly;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

// =============================================================================
// VialRGB Lighting Commands
// =============================================================================

/// HSV colour triple as stored by the firmware
///
/// Hue wraps the colour wheel over 0-255 rather than 0-359.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    pub const OFF: Self = Self::new(0, 0, 0);
}

/// LIGHTING_GET_VALUE / GET_INFO (0x08 / 0x40)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetRgbInfo;

impl Command for GetRgbInfo {
    const OPCODE: u8 = cmd::LIGHTING_GET_VALUE;
    const SUB: Option<u8> = Some(vialrgb::GET_INFO);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_INFO response
#[derive(Debug, Clone, Copy)]
pub struct RgbInfoResponse {
    /// VialRGB protocol version (little-endian on the wire)
    pub protocol: u16,
    /// Maximum brightness the firmware will apply
    pub max_brightness: u8,
}

impl Reply for RgbInfoResponse {
    const MIN_LEN: usize = 5;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            protocol: u16::from_le_bytes([report[2], report[3]]),
            max_brightness: report[4],
        })
    }
}

/// LIGHTING_GET_VALUE / GET_SUPPORTED (0x08 / 0x42)
///
/// Effect ids arrive in ascending pages of 15; `last_effect` is the highest
/// id already received and acts as the resume cursor.
#[derive(Debug, Clone, Copy)]
pub struct GetSupportedEffects {
    pub last_effect: u16,
}

impl GetSupportedEffects {
    pub fn new(last_effect: u16) -> Self {
        Self { last_effect }
    }
}

impl Command for GetSupportedEffects {
    const OPCODE: u8 = cmd::LIGHTING_GET_VALUE;
    const SUB: Option<u8> = Some(vialrgb::GET_SUPPORTED);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        self.last_effect.to_le_bytes().to_vec()
    }
}

/// GET_SUPPORTED response: one page of effect ids
#[derive(Debug, Clone)]
pub struct SupportedEffectsResponse {
    /// Effect ids in this page, terminator excluded
    pub effects: Vec<u16>,
    /// Whether the 0xFFFF terminator appeared in this page
    pub terminated: bool,
}

impl Reply for SupportedEffectsResponse {
    const MIN_LEN: usize = protocol::REPORT_SIZE;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        let mut effects = Vec::new();
        let mut terminated = false;
        for pair in report[2..protocol::REPORT_SIZE].chunks_exact(2) {
            let effect = u16::from_le_bytes([pair[0], pair[1]]);
            if effect == vialrgb::EFFECT_SKIP {
                terminated = true;
                break;
            }
            effects.push(effect);
        }
        Ok(Self {
            effects,
            terminated,
        })
    }
}

/// LIGHTING_GET_VALUE / GET_NUMBER_LEDS (0x08 / 0x43)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetLedCount;

impl Command for GetLedCount {
    const OPCODE: u8 = cmd::LIGHTING_GET_VALUE;
    const SUB: Option<u8> = Some(vialrgb::GET_NUMBER_LEDS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_NUMBER_LEDS response
#[derive(Debug, Clone, Copy)]
pub struct LedCountResponse {
    pub count: u16,
}

impl Reply for LedCountResponse {
    const MIN_LEN: usize = 4;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            count: u16::from_le_bytes([report[2], report[3]]),
        })
    }
}

/// LIGHTING_GET_VALUE / GET_LED_INFO (0x08 / 0x44)
#[derive(Debug, Clone, Copy)]
pub struct GetLedInfo {
    /// LED index (single byte on the wire)
    pub index: u8,
}

impl GetLedInfo {
    pub fn new(index: u8) -> Self {
        Self { index }
    }
}

impl Command for GetLedInfo {
    const OPCODE: u8 = cmd::LIGHTING_GET_VALUE;
    const SUB: Option<u8> = Some(vialrgb::GET_LED_INFO);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        vec![self.index]
    }
}

/// GET_LED_INFO response
///
/// `row`/`col` are 0xFF for LEDs with no matrix position.
#[derive(Debug, Clone, Copy)]
pub struct LedInfoResponse {
    /// Physical x position (0-224)
    pub x: u8,
    /// Physical y position (0-64)
    pub y: u8,
    /// QMK LED flags
    pub flags: u8,
    pub row: u8,
    pub col: u8,
}

impl Reply for LedInfoResponse {
    const MIN_LEN: usize = 7;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            x: report[2],
            y: report[3],
            flags: report[4],
            row: report[5],
            col: report[6],
        })
    }
}

/// LIGHTING_SET_VALUE / DIRECT_FASTSET (0x07 / 0x42)
///
/// Writes a contiguous run of LED colours starting at `start`. At most
/// [`protocol::DIRECT_LEDS_PER_REPORT`] colours fit in one report; longer
/// runs are truncated at construction.
#[derive(Debug, Clone)]
pub struct DirectFastSet {
    start: u16,
    colors: Vec<Hsv>,
}

impl DirectFastSet {
    pub fn new(start: u16, colors: &[Hsv]) -> Self {
        let take = colors.len().min(protocol::DIRECT_LEDS_PER_REPORT);
        Self {
            start,
            colors: colors[..take].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

impl Command for DirectFastSet {
    const OPCODE: u8 = cmd::LIGHTING_SET_VALUE;
    const SUB: Option<u8> = Some(vialrgb::DIRECT_FASTSET);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(3 + self.colors.len() * 3);
        buf.extend_from_slice(&self.start.to_le_bytes());
        buf.push(self.colors.len() as u8);
        for color in &self.colors {
            buf.extend_from_slice(&[color.h, color.s, color.v]);
        }
        buf
    }
}

// =============================================================================
// Raspberry Pi Vendor Commands
// =============================================================================

/// RPI_COMMAND / GET_VERSION (0xFC / 0x01)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetFirmwareVersion;

impl Command for GetFirmwareVersion {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::GET_VERSION);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_VERSION response
///
/// Minor and patch share one byte: high nibble minor, low nibble patch.
#[derive(Debug, Clone, Copy)]
pub struct FirmwareVersionResponse {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl Reply for FirmwareVersionResponse {
    const MIN_LEN: usize = 4;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            major: report[2],
            minor: report[3] >> 4,
            patch: report[3] & 0x0F,
        })
    }
}

/// RPI_COMMAND / RESET_EEPROM (0xFC / 0x02)
///
/// Clears presets and direct-LED storage back to factory defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetEeprom;

impl Command for ResetEeprom {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::RESET_EEPROM);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// RPI_COMMAND / GET_CURRENT_PRESET_INDEX (0xFC / 0x03)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPresetIndex;

impl Command for GetPresetIndex {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::GET_CURRENT_PRESET_INDEX);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_CURRENT_PRESET_INDEX response
#[derive(Debug, Clone, Copy)]
pub struct PresetIndexResponse {
    /// Index the firmware is running now
    pub current: u8,
    /// Index stored in EEPROM for the next boot
    pub saved: u8,
}

impl Reply for PresetIndexResponse {
    const MIN_LEN: usize = 4;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            current: report[2],
            saved: report[3],
        })
    }
}

/// RPI_COMMAND / SET_CURRENT_PRESET_INDEX (0xFC / 0x04)
#[derive(Debug, Clone, Copy)]
pub struct SetPresetIndex {
    pub index: u8,
    /// Persist the index to EEPROM as well as applying it
    pub save: bool,
}

impl SetPresetIndex {
    pub fn new(index: u8, save: bool) -> Self {
        Self { index, save }
    }
}

impl Command for SetPresetIndex {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::SET_CURRENT_PRESET_INDEX);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        vec![self.index, u8::from(self.save)]
    }
}

/// Preset slot as stored by the firmware
///
/// Matches the EEPROM record byte for byte; `effect` is little-endian.
/// `fixed_hue` zero means the preset follows the global hue instead of its
/// own `hue` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct PresetWire {
    pub index: u8,
    pub flags: u8,
    pub effect: U16,
    pub speed: u8,
    pub fixed_hue: u8,
    pub startup_animation: u8,
    pub hue: u8,
    pub sat: u8,
}

impl PresetWire {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: u8,
        flags: u8,
        effect: u16,
        speed: u8,
        fixed_hue: u8,
        startup_animation: u8,
        hue: u8,
        sat: u8,
    ) -> Self {
        Self {
            index,
            flags,
            effect: U16::new(effect),
            speed,
            fixed_hue,
            startup_animation,
            hue,
            sat,
        }
    }
}

/// RPI_COMMAND / GET_PRESET (0xFC / 0x05)
#[derive(Debug, Clone, Copy)]
pub struct GetPreset {
    pub index: u8,
}

impl GetPreset {
    pub fn new(index: u8) -> Self {
        Self { index }
    }
}

impl Command for GetPreset {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::GET_PRESET);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        vec![self.index]
    }
}

/// GET_PRESET response
#[derive(Debug, Clone, Copy)]
pub struct PresetResponse {
    pub preset: PresetWire,
}

impl Reply for PresetResponse {
    const MIN_LEN: usize = 11;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        let preset =
            PresetWire::read_from_bytes(&report[2..11]).map_err(|_| ParseError::TooShort {
                expected: Self::MIN_LEN,
                got: report.len(),
            })?;
        Ok(Self { preset })
    }
}

/// RPI_COMMAND / SET_PRESET (0xFC / 0x06)
#[derive(Debug, Clone, Copy)]
pub struct SetPreset {
    pub preset: PresetWire,
}

impl SetPreset {
    pub fn new(preset: PresetWire) -> Self {
        Self { preset }
    }
}

impl Command for SetPreset {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::SET_PRESET);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        self.preset.as_bytes().to_vec()
    }
}

/// RPI_COMMAND / GET_HUE (0xFC / 0x07)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetHue;

impl Command for GetHue {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::GET_HUE);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_HUE response
#[derive(Debug, Clone, Copy)]
pub struct HueResponse {
    pub hue: u8,
}

impl Reply for HueResponse {
    const MIN_LEN: usize = 3;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self { hue: report[2] })
    }
}

/// RPI_COMMAND / SET_HUE (0xFC / 0x08)
#[derive(Debug, Clone, Copy)]
pub struct SetHue {
    pub hue: u8,
}

impl SetHue {
    pub fn new(hue: u8) -> Self {
        Self { hue }
    }
}

impl Command for SetHue {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::SET_HUE);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        vec![self.hue]
    }
}

/// RPI_COMMAND / GET_BRIGHTNESS (0xFC / 0x09)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetBrightness;

impl Command for GetBrightness {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::GET_BRIGHTNESS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_BRIGHTNESS response
#[derive(Debug, Clone, Copy)]
pub struct BrightnessResponse {
    pub brightness: u8,
}

impl Reply for BrightnessResponse {
    const MIN_LEN: usize = 3;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            brightness: report[2],
        })
    }
}

/// RPI_COMMAND / SET_BRIGHTNESS (0xFC / 0x0A)
#[derive(Debug, Clone, Copy)]
pub struct SetBrightness {
    pub brightness: u8,
}

impl SetBrightness {
    pub fn new(brightness: u8) -> Self {
        Self { brightness }
    }
}

impl Command for SetBrightness {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::SET_BRIGHTNESS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        vec![self.brightness]
    }
}

/// RPI_COMMAND / GET_CURRENT_DIRECT_LEDS (0xFC / 0x0B)
#[derive(Debug, Clone, Copy)]
pub struct GetCurrentDirectLeds {
    pub offset: u16,
    pub count: u8,
}

impl GetCurrentDirectLeds {
    pub fn new(offset: u16, count: u8) -> Self {
        Self {
            offset,
            count: count.min(protocol::DIRECT_LEDS_PER_REPORT as u8),
        }
    }
}

impl Command for GetCurrentDirectLeds {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::GET_CURRENT_DIRECT_LEDS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        let mut buf = self.offset.to_le_bytes().to_vec();
        buf.push(self.count);
        buf
    }
}

/// RPI_COMMAND / GET_SAVED_DIRECT_LEDS (0xFC / 0x0C)
#[derive(Debug, Clone, Copy)]
pub struct GetSavedDirectLeds {
    pub offset: u16,
    pub count: u8,
}

impl GetSavedDirectLeds {
    pub fn new(offset: u16, count: u8) -> Self {
        Self {
            offset,
            count: count.min(protocol::DIRECT_LEDS_PER_REPORT as u8),
        }
    }
}

impl Command for GetSavedDirectLeds {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::GET_SAVED_DIRECT_LEDS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        let mut buf = self.offset.to_le_bytes().to_vec();
        buf.push(self.count);
        buf
    }
}

/// Direct-LED page response, shared by the current and saved variants
#[derive(Debug, Clone)]
pub struct DirectLedsResponse {
    /// First LED index in this page
    pub offset: u16,
    pub leds: Vec<Hsv>,
}

impl Reply for DirectLedsResponse {
    const MIN_LEN: usize = 5;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        let offset = u16::from_le_bytes([report[2], report[3]]);
        let count = report[4] as usize;
        if count > protocol::DIRECT_LEDS_PER_REPORT {
            return Err(ParseError::InvalidValue {
                field: "led count",
                value: report[4],
            });
        }
        let needed = 5 + count * 3;
        if report.len() < needed {
            return Err(ParseError::TooShort {
                expected: needed,
                got: report.len(),
            });
        }
        let leds = report[5..needed]
            .chunks_exact(3)
            .map(|c| Hsv::new(c[0], c[1], c[2]))
            .collect();
        Ok(Self { offset, leds })
    }
}

/// RPI_COMMAND / SAVE_DIRECT_LEDS (0xFC / 0x0D)
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveDirectLeds;

impl Command for SaveDirectLeds {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::SAVE_DIRECT_LEDS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// RPI_COMMAND / LOAD_DIRECT_LEDS (0xFC / 0x0E)
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadDirectLeds;

impl Command for LoadDirectLeds {
    const OPCODE: u8 = cmd::RPI_COMMAND;
    const SUB: Option<u8> = Some(rpi::LOAD_DIRECT_LEDS);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

// =============================================================================
// Vial Security Commands
// =============================================================================

/// VIAL_COMMAND / GET_KEYBOARD_ID (0xFE / 0x00)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetVialKeyboardId;

impl Command for GetVialKeyboardId {
    const OPCODE: u8 = cmd::VIAL_COMMAND;
    const SUB: Option<u8> = Some(vial::GET_KEYBOARD_ID);
    const ECHO: EchoPolicy = EchoPolicy::None;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_KEYBOARD_ID response (no echo, data from byte 0)
#[derive(Debug, Clone, Copy)]
pub struct VialKeyboardIdResponse {
    /// Vial protocol version
    pub vial_protocol: u32,
    /// Keyboard definition UID
    pub uid: u64,
    /// Feature flag bits
    pub flags: u8,
}

impl VialKeyboardIdResponse {
    /// Flag bit 0: firmware implements VialRGB
    pub fn supports_vialrgb(&self) -> bool {
        self.flags & 0x01 != 0
    }
}

impl Reply for VialKeyboardIdResponse {
    const MIN_LEN: usize = 13;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            vial_protocol: u32::from_le_bytes([report[0], report[1], report[2], report[3]]),
            uid: u64::from_le_bytes([
                report[4], report[5], report[6], report[7], report[8], report[9], report[10],
                report[11],
            ]),
            flags: report[12],
        })
    }
}

/// VIAL_COMMAND / GET_UNLOCK_STATUS (0xFE / 0x05)
#[derive(Debug, Clone, Copy, Default)]
pub struct GetUnlockStatus;

impl Command for GetUnlockStatus {
    const OPCODE: u8 = cmd::VIAL_COMMAND;
    const SUB: Option<u8> = Some(vial::GET_UNLOCK_STATUS);
    const ECHO: EchoPolicy = EchoPolicy::None;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// GET_UNLOCK_STATUS response (no echo, data from byte 0)
#[derive(Debug, Clone)]
pub struct UnlockStatusResponse {
    pub unlocked: bool,
    pub in_progress: bool,
    /// Matrix positions of the unlock combo, 0xFF pairs filtered out
    pub keys: Vec<(u8, u8)>,
}

impl Reply for UnlockStatusResponse {
    const MIN_LEN: usize = 2;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        let keys = report[2..]
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .filter(|&(row, col)| row != 0xFF && col != 0xFF)
            .collect();
        Ok(Self {
            unlocked: report[0] != 0,
            in_progress: report[1] != 0,
            keys,
        })
    }
}

/// VIAL_COMMAND / UNLOCK_START (0xFE / 0x06)
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlockStart;

impl Command for UnlockStart {
    const OPCODE: u8 = cmd::VIAL_COMMAND;
    const SUB: Option<u8> = Some(vial::UNLOCK_START);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// VIAL_COMMAND / UNLOCK_POLL (0xFE / 0x07)
///
/// Polling drives the handshake forward; repeating a poll is harmless.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnlockPoll;

impl Command for UnlockPoll {
    const OPCODE: u8 = cmd::VIAL_COMMAND;
    const SUB: Option<u8> = Some(vial::UNLOCK_POLL);
    const ECHO: EchoPolicy = EchoPolicy::None;
    const IDEMPOTENT: bool = true;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

/// UNLOCK_POLL response (no echo, data from byte 0)
#[derive(Debug, Clone, Copy)]
pub struct UnlockPollResponse {
    pub unlocked: bool,
    pub in_progress: bool,
    /// Hold countdown, decremented by the firmware while the combo is held
    pub counter: u8,
}

impl Reply for UnlockPollResponse {
    const MIN_LEN: usize = 3;

    fn from_report(report: &[u8]) -> Result<Self, ParseError> {
        Ok(Self {
            unlocked: report[0] != 0,
            in_progress: report[1] != 0,
            counter: report[2],
        })
    }
}

/// VIAL_COMMAND / LOCK (0xFE / 0x08)
#[derive(Debug, Clone, Copy, Default)]
pub struct Lock;

impl Command for Lock {
    const OPCODE: u8 = cmd::VIAL_COMMAND;
    const SUB: Option<u8> = Some(vial::LOCK);
    const ECHO: EchoPolicy = EchoPolicy::CmdAndSub;
    const IDEMPOTENT: bool = false;

    fn payload(&self) -> Vec<u8> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(prefix: &[u8]) -> Vec<u8> {
        let mut report = vec![0u8; protocol::REPORT_SIZE];
        report[..prefix.len()].copy_from_slice(prefix);
        report
    }

    #[test]
    fn test_build_frames_report_id_and_padding() {
        let wire = GetProtocolVersion.build();
        assert_eq!(wire.len(), protocol::WIRE_REPORT_SIZE);
        assert_eq!(wire[0], 0x00); // report ID
        assert_eq!(wire[1], 0x01); // GET_PROTOCOL_VERSION
        assert_eq!(wire[2], 0x00); // zero sub-command
        assert!(wire[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_protocol_version_big_endian() {
        let report = report_with(&[0x01, 0x00, 0x09]);
        let resp = ProtocolVersionResponse::parse(&report).unwrap();
        assert_eq!(resp.version, 9);
    }

    #[test]
    fn test_uptime_big_endian() {
        // 0x0001E240 = 123456 ms
        let report = report_with(&[0x02, 0x01, 0x00, 0x01, 0xE2, 0x40]);
        let resp = UptimeResponse::parse(&report).unwrap();
        assert_eq!(resp.millis, 123_456);
    }

    #[test]
    fn test_keycode_roundtrip_layout() {
        let wire = SetKeycode::new(1, 2, 3, 0x0204).build();
        // [id, cmd, layer, row, col, kc_hi, kc_lo]
        assert_eq!(&wire[1..7], &[0x05, 0x01, 0x02, 0x03, 0x02, 0x04]);

        let report = report_with(&[0x05, 0x01, 0x02, 0x03, 0x02, 0x04]);
        let resp = KeycodeResponse::parse(&report).unwrap();
        assert_eq!(resp.layer, 1);
        assert_eq!(resp.row, 2);
        assert_eq!(resp.col, 3);
        assert_eq!(resp.keycode, 0x0204);
    }

    #[test]
    fn test_validate_echo_policies() {
        let ok = report_with(&[0xFC, 0x03]);
        assert!(validate_echo(EchoPolicy::CmdAndSub, 0xFC, Some(0x03), &ok).is_ok());

        let wrong_sub = report_with(&[0xFC, 0x04]);
        assert_eq!(
            validate_echo(EchoPolicy::CmdAndSub, 0xFC, Some(0x03), &wrong_sub),
            Err(ParseError::CommandMismatch {
                expected: 0x03,
                got: 0x04
            })
        );

        let wrong_cmd = report_with(&[0x02, 0x03]);
        assert_eq!(
            validate_echo(EchoPolicy::CmdOnly, 0x04, None, &wrong_cmd),
            Err(ParseError::CommandMismatch {
                expected: 0x04,
                got: 0x02
            })
        );

        // No-echo replies accept anything
        assert!(validate_echo(EchoPolicy::None, 0xFE, Some(0x00), &wrong_cmd).is_ok());
    }

    #[test]
    fn test_rgb_info_little_endian() {
        let report = report_with(&[0x08, 0x40, 0x01, 0x00, 0xC8]);
        let resp = RgbInfoResponse::parse(&report).unwrap();
        assert_eq!(resp.protocol, 1);
        assert_eq!(resp.max_brightness, 200);
    }

    #[test]
    fn test_supported_effects_terminator() {
        let mut report = report_with(&[0x08, 0x42]);
        // effects 1, 2, 5 then terminator
        report[2..4].copy_from_slice(&1u16.to_le_bytes());
        report[4..6].copy_from_slice(&2u16.to_le_bytes());
        report[6..8].copy_from_slice(&5u16.to_le_bytes());
        report[8..10].copy_from_slice(&0xFFFFu16.to_le_bytes());
        let resp = SupportedEffectsResponse::parse(&report).unwrap();
        assert_eq!(resp.effects, vec![1, 2, 5]);
        assert!(resp.terminated);
    }

    #[test]
    fn test_supported_effects_full_page() {
        let mut report = report_with(&[0x08, 0x42]);
        for i in 0..15u16 {
            let off = 2 + i as usize * 2;
            report[off..off + 2].copy_from_slice(&(i + 1).to_le_bytes());
        }
        let resp = SupportedEffectsResponse::parse(&report).unwrap();
        assert_eq!(resp.effects.len(), 15);
        assert!(!resp.terminated);
    }

    #[test]
    fn test_firmware_version_nibbles() {
        let report = report_with(&[0xFC, 0x01, 0x01, 0x23]);
        let resp = FirmwareVersionResponse::parse(&report).unwrap();
        assert_eq!((resp.major, resp.minor, resp.patch), (1, 2, 3));
    }

    #[test]
    fn test_preset_wire_layout() {
        // index 7, flags 0xFF, effect 0x0001 LE, speed 255, fixed_hue 1,
        // startup 2, hue 255, sat 255
        let bytes = [0x07, 0xFF, 0x01, 0x00, 0xFF, 0x01, 0x02, 0xFF, 0xFF];
        let preset = PresetWire::read_from_bytes(&bytes[..]).unwrap();
        assert_eq!(preset.index, 7);
        assert_eq!(preset.effect.get(), 1);
        assert_eq!(preset.fixed_hue, 1);
        assert_eq!(preset.startup_animation, 2);
        assert_eq!(preset.as_bytes(), &bytes);

        let wire = SetPreset::new(preset).build();
        assert_eq!(&wire[1..3], &[0xFC, 0x06]);
        assert_eq!(&wire[3..12], &bytes);
    }

    #[test]
    fn test_preset_response_offsets() {
        let report = report_with(&[
            0xFC, 0x05, // echo
            0x02, 0xFF, 0x2A, 0x00, 0x80, 0x00, 0x02, 0x10, 0x20,
        ]);
        let resp = PresetResponse::parse(&report).unwrap();
        assert_eq!(resp.preset.index, 2);
        assert_eq!(resp.preset.effect.get(), 0x2A);
        assert_eq!(resp.preset.speed, 0x80);
        assert_eq!(resp.preset.hue, 0x10);
        assert_eq!(resp.preset.sat, 0x20);
    }

    #[test]
    fn test_fastset_payload_layout() {
        let colors = [Hsv::new(1, 2, 3), Hsv::new(4, 5, 6)];
        let wire = DirectFastSet::new(0x0102, &colors).build();
        // [id, cmd, sub, start_lo, start_hi, count, h, s, v, h, s, v]
        assert_eq!(
            &wire[1..12],
            &[0x07, 0x42, 0x02, 0x01, 0x02, 1, 2, 3, 4, 5, 6]
        );
    }

    #[test]
    fn test_fastset_truncates_to_report_capacity() {
        let colors = vec![Hsv::new(9, 9, 9); 12];
        let fastset = DirectFastSet::new(0, &colors);
        assert_eq!(fastset.len(), protocol::DIRECT_LEDS_PER_REPORT);
        // 5 header bytes + 27 colour bytes fill the report exactly
        assert_eq!(fastset.report().len(), protocol::REPORT_SIZE);
    }

    #[test]
    fn test_direct_leds_page() {
        let mut report = report_with(&[0xFC, 0x0B, 0x09, 0x00, 0x02]);
        report[5..11].copy_from_slice(&[10, 20, 30, 40, 50, 60]);
        let resp = DirectLedsResponse::parse(&report).unwrap();
        assert_eq!(resp.offset, 9);
        assert_eq!(
            resp.leds,
            vec![Hsv::new(10, 20, 30), Hsv::new(40, 50, 60)]
        );
    }

    #[test]
    fn test_direct_leds_rejects_oversized_count() {
        let report = report_with(&[0xFC, 0x0B, 0x00, 0x00, 0x0A]);
        let err = DirectLedsResponse::parse(&report).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue {
                field: "led count",
                value: 0x0A
            }
        );
    }

    #[test]
    fn test_vial_keyboard_id_no_echo() {
        let mut report = report_with(&[]);
        report[0..4].copy_from_slice(&6u32.to_le_bytes());
        report[4..12].copy_from_slice(&0xDEAD_BEEF_CAFE_F00Du64.to_le_bytes());
        report[12] = 0x01;
        let resp = VialKeyboardIdResponse::parse(&report).unwrap();
        assert_eq!(resp.vial_protocol, 6);
        assert_eq!(resp.uid, 0xDEAD_BEEF_CAFE_F00D);
        assert!(resp.supports_vialrgb());
    }

    #[test]
    fn test_unlock_status_filters_sentinel_pairs() {
        let mut report = vec![0xFFu8; protocol::REPORT_SIZE];
        report[0] = 0x00; // locked
        report[1] = 0x01; // in progress
        report[2..6].copy_from_slice(&[0x00, 0x00, 0x02, 0x0D]);
        let resp = UnlockStatusResponse::parse(&report).unwrap();
        assert!(!resp.unlocked);
        assert!(resp.in_progress);
        assert_eq!(resp.keys, vec![(0, 0), (2, 13)]);
    }

    #[test]
    fn test_unlock_poll_counter() {
        let report = report_with(&[0x00, 0x01, 0x32]);
        let resp = UnlockPollResponse::parse(&report).unwrap();
        assert!(!resp.unlocked);
        assert!(resp.in_progress);
        assert_eq!(resp.counter, 50);
    }

    #[test]
    fn test_too_short_report() {
        let report = [0x02u8, 0x01, 0x00];
        let err = UptimeResponse::parse(&report).unwrap_err();
        assert_eq!(
            err,
            ParseError::TooShort {
                expected: 6,
                got: 3
            }
        );
    }

    #[test]
    fn test_command_names() {
        assert_eq!(GetUptime::name(), "GET_UPTIME");
        assert_eq!(GetPreset::name(), "GET_PRESET");
        assert_eq!(UnlockStart::name(), "UNLOCK_START");
        assert_eq!(GetKeycode::name(), "DYNAMIC_KEYMAP_GET_KEYCODE");
    }
}
