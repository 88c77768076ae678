//! Device capability gating
//!
//! Every session operation checks the capability table before building a
//! command. The firmware mishandles unknown commands, so gating happens
//! host-side with zero exchanges on failure.

use std::fmt;

use crate::error::CapabilityError;
use crate::identity::{DeviceIdentity, FirmwareVersion, KeyboardModel};

/// Minimum vendor firmware version the client supports
pub const MIN_FIRMWARE: FirmwareVersion = FirmwareVersion::new(1, 2, 0);
/// Minimum Via protocol version
pub const MIN_VIA_PROTOCOL: u16 = 9;
/// Minimum Vial protocol version
pub const MIN_VIAL_PROTOCOL: u32 = 4;

/// Feature gated by device model and/or firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Keycode get/set/reset
    Keymap,
    /// Live switch matrix reads
    MatrixState,
    /// Presets, direct LEDs, global colour, effect and LED queries
    Lighting,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keymap => write!(f, "Key mapping"),
            Self::MatrixState => write!(f, "Switch matrix state"),
            Self::Lighting => write!(f, "RGB lighting"),
        }
    }
}

struct Requirement {
    /// `None` means any model qualifies
    model: Option<KeyboardModel>,
    /// Firmware must advertise the VialRGB flag
    needs_vialrgb: bool,
    min_firmware: FirmwareVersion,
}

const fn requirement(capability: Capability) -> Requirement {
    match capability {
        Capability::Keymap | Capability::MatrixState => Requirement {
            model: None,
            needs_vialrgb: false,
            min_firmware: MIN_FIRMWARE,
        },
        Capability::Lighting => Requirement {
            model: Some(KeyboardModel::Pi500Plus),
            needs_vialrgb: true,
            min_firmware: MIN_FIRMWARE,
        },
    }
}

/// What the connected device can do, resolved once at session open
#[derive(Debug, Clone, Copy)]
pub struct CapabilitySet {
    model: KeyboardModel,
    vialrgb: bool,
    firmware: FirmwareVersion,
}

impl CapabilitySet {
    pub fn new(model: KeyboardModel, vialrgb: bool, firmware: FirmwareVersion) -> Self {
        Self {
            model,
            vialrgb,
            firmware,
        }
    }

    pub fn from_identity(identity: &DeviceIdentity) -> Self {
        Self::new(identity.model, identity.vialrgb, identity.firmware)
    }

    /// Check a capability, naming what is missing on failure
    ///
    /// A Pi 500+ whose firmware does not advertise VialRGB fails the
    /// lighting check as a firmware limitation, not a model one.
    pub fn check(&self, capability: Capability) -> Result<(), CapabilityError> {
        let req = requirement(capability);
        if let Some(model) = req.model {
            if self.model != model {
                return Err(CapabilityError::UnsupportedByModel {
                    feature: capability,
                    model: self.model,
                });
            }
        }
        if req.needs_vialrgb && !self.vialrgb {
            return Err(CapabilityError::UnsupportedByFirmware {
                feature: capability,
                required: req.min_firmware,
            });
        }
        if self.firmware < req.min_firmware {
            return Err(CapabilityError::UnsupportedByFirmware {
                feature: capability,
                required: req.min_firmware,
            });
        }
        Ok(())
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.check(capability).is_ok()
    }
}
