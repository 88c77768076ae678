//! Protocol constants and report framing for Raspberry Pi keyboard firmware
//!
//! The firmware speaks Via protocol 9+ with Vial extensions plus a vendor
//! command family (0xFC) for presets, global colour and direct-LED storage.
//! All exchanges are 32-byte reports; multi-byte fields are little-endian
//! unless a command notes otherwise.

/// Top-level command bytes (first byte of every report)
pub mod cmd {
    pub const GET_PROTOCOL_VERSION: u8 = 0x01;
    pub const GET_KEYBOARD_VALUE: u8 = 0x02;
    pub const SET_KEYBOARD_VALUE: u8 = 0x03;
    pub const DYNAMIC_KEYMAP_GET_KEYCODE: u8 = 0x04;
    pub const DYNAMIC_KEYMAP_SET_KEYCODE: u8 = 0x05;
    pub const DYNAMIC_KEYMAP_RESET: u8 = 0x06;
    pub const LIGHTING_SET_VALUE: u8 = 0x07;
    pub const LIGHTING_GET_VALUE: u8 = 0x08;
    pub const RPI_COMMAND: u8 = 0xFC;
    pub const VIAL_COMMAND: u8 = 0xFE;

    /// Get human-readable name for a command byte
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            GET_PROTOCOL_VERSION => "GET_PROTOCOL_VERSION",
            GET_KEYBOARD_VALUE => "GET_KEYBOARD_VALUE",
            SET_KEYBOARD_VALUE => "SET_KEYBOARD_VALUE",
            DYNAMIC_KEYMAP_GET_KEYCODE => "DYNAMIC_KEYMAP_GET_KEYCODE",
            DYNAMIC_KEYMAP_SET_KEYCODE => "DYNAMIC_KEYMAP_SET_KEYCODE",
            DYNAMIC_KEYMAP_RESET => "DYNAMIC_KEYMAP_RESET",
            LIGHTING_SET_VALUE => "LIGHTING_SET_VALUE",
            LIGHTING_GET_VALUE => "LIGHTING_GET_VALUE",
            RPI_COMMAND => "RPI_COMMAND",
            VIAL_COMMAND => "VIAL_COMMAND",
            _ => "UNKNOWN",
        }
    }
}

/// Sub-commands for GET_KEYBOARD_VALUE
pub mod keyboard_value {
    pub const GET_UPTIME: u8 = 0x01;
    pub const GET_LAYOUT_OPTIONS: u8 = 0x02;
    pub const GET_SWITCH_MATRIX_STATE: u8 = 0x03;

    pub fn name(subcmd: u8) -> &'static str {
        match subcmd {
            GET_UPTIME => "GET_UPTIME",
            GET_LAYOUT_OPTIONS => "GET_LAYOUT_OPTIONS",
            GET_SWITCH_MATRIX_STATE => "GET_SWITCH_MATRIX_STATE",
            _ => "UNKNOWN",
        }
    }
}

/// Sub-commands for VIAL_COMMAND (0xFE)
///
/// GET_KEYBOARD_ID, GET_UNLOCK_STATUS and UNLOCK_POLL replies carry no
/// command echo; their data starts at byte 0.
pub mod vial {
    pub const GET_KEYBOARD_ID: u8 = 0x00;
    pub const GET_SIZE: u8 = 0x01;
    pub const GET_DEFINITION: u8 = 0x02;
    pub const GET_UNLOCK_STATUS: u8 = 0x05;
    pub const UNLOCK_START: u8 = 0x06;
    pub const UNLOCK_POLL: u8 = 0x07;
    pub const LOCK: u8 = 0x08;

    pub fn name(subcmd: u8) -> &'static str {
        match subcmd {
            GET_KEYBOARD_ID => "GET_KEYBOARD_ID",
            GET_SIZE => "GET_SIZE",
            GET_DEFINITION => "GET_DEFINITION",
            GET_UNLOCK_STATUS => "GET_UNLOCK_STATUS",
            UNLOCK_START => "UNLOCK_START",
            UNLOCK_POLL => "UNLOCK_POLL",
            LOCK => "LOCK",
            _ => "UNKNOWN",
        }
    }
}

/// VialRGB sub-commands (LIGHTING_GET_VALUE / LIGHTING_SET_VALUE)
///
/// The get and set namespaces overlap (0x41, 0x42), so lookups are split.
pub mod vialrgb {
    pub const GET_INFO: u8 = 0x40;
    pub const GET_MODE: u8 = 0x41;
    pub const GET_SUPPORTED: u8 = 0x42;
    pub const GET_NUMBER_LEDS: u8 = 0x43;
    pub const GET_LED_INFO: u8 = 0x44;

    pub const SET_MODE: u8 = 0x41;
    pub const DIRECT_FASTSET: u8 = 0x42;

    /// Effect id for per-LED direct control
    pub const EFFECT_DIRECT: u16 = 0x0001;
    /// Reserved effect id marking a preset slot as skipped in the Fn cycle
    pub const EFFECT_SKIP: u16 = 0xFFFF;
    /// Effect id for all LEDs off
    pub const EFFECT_OFF: u16 = 0x0000;

    pub fn get_name(subcmd: u8) -> &'static str {
        match subcmd {
            GET_INFO => "GET_INFO",
            GET_MODE => "GET_MODE",
            GET_SUPPORTED => "GET_SUPPORTED",
            GET_NUMBER_LEDS => "GET_NUMBER_LEDS",
            GET_LED_INFO => "GET_LED_INFO",
            _ => "UNKNOWN",
        }
    }

    pub fn set_name(subcmd: u8) -> &'static str {
        match subcmd {
            SET_MODE => "SET_MODE",
            DIRECT_FASTSET => "DIRECT_FASTSET",
            _ => "UNKNOWN",
        }
    }
}

/// Vendor sub-commands for RPI_COMMAND (0xFC)
pub mod rpi {
    pub const GET_VERSION: u8 = 0x01;
    pub const RESET_EEPROM: u8 = 0x02;
    pub const GET_CURRENT_PRESET_INDEX: u8 = 0x03;
    pub const SET_CURRENT_PRESET_INDEX: u8 = 0x04;
    pub const GET_PRESET: u8 = 0x05;
    pub const SET_PRESET: u8 = 0x06;
    pub const GET_HUE: u8 = 0x07;
    pub const SET_HUE: u8 = 0x08;
    pub const GET_BRIGHTNESS: u8 = 0x09;
    pub const SET_BRIGHTNESS: u8 = 0x0A;
    pub const GET_CURRENT_DIRECT_LEDS: u8 = 0x0B;
    pub const GET_SAVED_DIRECT_LEDS: u8 = 0x0C;
    pub const SAVE_DIRECT_LEDS: u8 = 0x0D;
    pub const LOAD_DIRECT_LEDS: u8 = 0x0E;

    pub fn name(subcmd: u8) -> &'static str {
        match subcmd {
            GET_VERSION => "GET_VERSION",
            RESET_EEPROM => "RESET_EEPROM",
            GET_CURRENT_PRESET_INDEX => "GET_CURRENT_PRESET_INDEX",
            SET_CURRENT_PRESET_INDEX => "SET_CURRENT_PRESET_INDEX",
            GET_PRESET => "GET_PRESET",
            SET_PRESET => "SET_PRESET",
            GET_HUE => "GET_HUE",
            SET_HUE => "SET_HUE",
            GET_BRIGHTNESS => "GET_BRIGHTNESS",
            SET_BRIGHTNESS => "SET_BRIGHTNESS",
            GET_CURRENT_DIRECT_LEDS => "GET_CURRENT_DIRECT_LEDS",
            GET_SAVED_DIRECT_LEDS => "GET_SAVED_DIRECT_LEDS",
            SAVE_DIRECT_LEDS => "SAVE_DIRECT_LEDS",
            LOAD_DIRECT_LEDS => "LOAD_DIRECT_LEDS",
            _ => "UNKNOWN",
        }
    }
}

/// Device identification constants
pub mod device {
    /// Raspberry Pi vendor ID
    pub const VENDOR_ID: u16 = 0x2E8A;

    /// Pi 500 keyboard (no RGB hardware)
    pub const PID_PI500: u16 = 0x0010;
    /// Pi 500+ keyboard
    pub const PID_PI500PLUS: u16 = 0x0011;

    /// Raw HID usage page of the Vial config interface
    pub const USAGE_PAGE: u16 = 0xFF60;
    /// Raw HID usage of the Vial config interface
    pub const USAGE: u16 = 0x61;

    /// Serial number advertised by Vial-capable firmware
    pub const VIAL_SERIAL: &str = "vial:f64c2b3c";

    /// Check if a PID belongs to a supported keyboard
    pub fn is_supported_pid(pid: u16) -> bool {
        pid == PID_PI500 || pid == PID_PI500PLUS
    }
}

/// HID communication timing constants
pub mod timing {
    /// Per-exchange read timeout (ms)
    pub const EXCHANGE_TIMEOUT_MS: i32 = 1000;
    /// Retries for idempotent reads that time out
    pub const READ_RETRIES: usize = 2;
    /// Read timeout while draining stale reports at open (ms)
    pub const DRAIN_TIMEOUT_MS: i32 = 500;
    /// Interval between unlock handshake polls (ms)
    pub const UNLOCK_POLL_INTERVAL_MS: u64 = 100;
    /// Overall unlock handshake deadline (ms)
    pub const UNLOCK_TIMEOUT_MS: u64 = 60_000;
}

/// Report body size (excluding the report ID byte)
pub const REPORT_SIZE: usize = 32;
/// On-wire write size: report ID 0x00 followed by the report body
pub const WIRE_REPORT_SIZE: usize = REPORT_SIZE + 1;

/// Direct-LED colours per report: 5 header bytes + 9 * 3 colour bytes = 32
pub const DIRECT_LEDS_PER_REPORT: usize = 9;

/// Frame a logical command payload into an on-wire report buffer
///
/// Format: `[report_id=0] [payload...] [zero padding]`, always
/// `WIRE_REPORT_SIZE` bytes. Payloads longer than the report body are
/// truncated; the codec never builds one.
pub fn frame_report(payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; WIRE_REPORT_SIZE];
    let len = std::cmp::min(payload.len(), REPORT_SIZE);
    buf[1..1 + len].copy_from_slice(&payload[..len]);
    buf
}

/// Whether a command family carries a sub-command byte
pub fn has_sub_command(opcode: u8) -> bool {
    matches!(
        opcode,
        cmd::GET_KEYBOARD_VALUE
            | cmd::SET_KEYBOARD_VALUE
            | cmd::LIGHTING_SET_VALUE
            | cmd::LIGHTING_GET_VALUE
            | cmd::RPI_COMMAND
            | cmd::VIAL_COMMAND
    )
}

/// Human-readable name for a command byte plus optional sub-command
pub fn command_name(opcode: u8, sub: Option<u8>) -> &'static str {
    match (opcode, sub) {
        (cmd::GET_KEYBOARD_VALUE, Some(s)) => keyboard_value::name(s),
        (cmd::LIGHTING_GET_VALUE, Some(s)) => vialrgb::get_name(s),
        (cmd::LIGHTING_SET_VALUE, Some(s)) => vialrgb::set_name(s),
        (cmd::RPI_COMMAND, Some(s)) => rpi::name(s),
        (cmd::VIAL_COMMAND, Some(s)) => vial::name(s),
        (opcode, _) => cmd::name(opcode),
    }
}
