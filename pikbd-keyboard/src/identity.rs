//! Device model, layout variant and firmware version resolution
//!
//! Model and variant come from the USB product string. The Pi 500 does not
//! encode its variant there; on Raspberry Pi hosts it can be read from the
//! device tree country code instead (best effort, the keyboard is built in).

use std::fmt;
use std::path::Path;

/// Keyboard model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardModel {
    /// Pi 500 keyboard (no per-key RGB hardware)
    Pi500,
    /// Pi 500+ keyboard
    Pi500Plus,
}

impl fmt::Display for KeyboardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pi500 => write!(f, "Pi 500"),
            Self::Pi500Plus => write!(f, "Pi 500+"),
        }
    }
}

/// Physical layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutVariant {
    Iso,
    Ansi,
    Jis,
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iso => write!(f, "ISO"),
            Self::Ansi => write!(f, "ANSI"),
            Self::Jis => write!(f, "JIS"),
        }
    }
}

/// Vendor firmware version, decoded from packed nibbles
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl FirmwareVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Everything the session learns about the device at open time
#[derive(Debug, Clone)]
pub struct DeviceIdentity {
    pub model: KeyboardModel,
    /// Unknown when neither the product string nor the device tree names one
    pub variant: Option<LayoutVariant>,
    pub firmware: FirmwareVersion,
    pub via_protocol: u16,
    pub vial_protocol: u32,
    pub keyboard_uid: u64,
    /// VialRGB flag from the Vial keyboard ID reply (bit 0)
    pub vialrgb: bool,
}

/// Parse model and variant from the USB product string
///
/// `"Pi 500 Keyboard..."` is a Pi 500 (variant resolved elsewhere);
/// `"Pi 500+ Keyboard - ISO"` and friends carry the variant inline.
/// Returns `None` for anything else.
pub fn parse_product_string(product: &str) -> Option<(KeyboardModel, Option<LayoutVariant>)> {
    // "Pi 500 Keyboard" is a substring of "Pi 500+ Keyboard", so test
    // the plus form first.
    if product.contains("Pi 500+ Keyboard") {
        let variant = if product.contains("ISO") {
            Some(LayoutVariant::Iso)
        } else if product.contains("ANSI") {
            Some(LayoutVariant::Ansi)
        } else if product.contains("JIS") {
            Some(LayoutVariant::Jis)
        } else {
            None
        };
        Some((KeyboardModel::Pi500Plus, variant))
    } else if product.contains("Pi 500 Keyboard") {
        Some((KeyboardModel::Pi500, None))
    } else {
        None
    }
}

/// Device tree node holding the keyboard country code on Pi hosts
pub const COUNTRY_CODE_PATH: &str = "/proc/device-tree/chosen/rpi-country-code";

/// Resolve the Pi 500 layout variant from the host device tree
///
/// The country code lives in byte 3 of the node. Absent or unreadable
/// (non-Pi host) resolves to `None`.
pub fn variant_from_device_tree(path: &Path) -> Option<LayoutVariant> {
    let raw = std::fs::read(path).ok()?;
    let code = *raw.get(3)?;
    Some(variant_from_country_code(code))
}

/// Map a device tree country code byte to a layout variant
pub fn variant_from_country_code(code: u8) -> LayoutVariant {
    match code {
        4 | 14 | 16 => LayoutVariant::Ansi,
        7 => LayoutVariant::Jis,
        _ => LayoutVariant::Iso,
    }
}
