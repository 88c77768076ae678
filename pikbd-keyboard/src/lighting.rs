//! Lighting presets, cycle mask and the direct-LED mirror

use pikbd_transport::{Hsv, LedInfoResponse, ParseError, PresetWire};

use crate::effects::{EFFECT_OFF, EFFECT_SKIP};

/// Number of preset slots in EEPROM
pub const PRESET_SLOT_COUNT: u8 = 8;

/// Scratch slot used for temporary effects and direct LED mode; never
/// reachable by the Fn cycle
pub const TEMP_PRESET_SLOT: u8 = 7;

/// Highest slot index included in the Fn cycle
pub const LAST_CYCLABLE_SLOT: u8 = 6;

/// LED flags value enabling all LEDs of a preset
pub const LED_FLAG_ALL: u8 = 0xFF;

/// Boot animation played before the preset takes over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StartupAnimation {
    None = 0x00,
    BlackNoFade = 0x01,
    #[default]
    BlackFadeValue = 0x02,
    WhiteNoFade = 0x03,
    WhiteFadeSat = 0x04,
}

impl StartupAnimation {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::None),
            0x01 => Some(Self::BlackNoFade),
            0x02 => Some(Self::BlackFadeValue),
            0x03 => Some(Self::WhiteNoFade),
            0x04 => Some(Self::WhiteFadeSat),
            _ => None,
        }
    }

    /// Get the display name for this animation
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::BlackNoFade => "Black No Fade",
            Self::BlackFadeValue => "Black Fade Value",
            Self::WhiteNoFade => "White No Fade",
            Self::WhiteFadeSat => "White Fade Sat",
        }
    }
}

/// One lighting preset slot
///
/// Brightness is device-global and deliberately absent: no preset field
/// carries a value/brightness component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub effect: u16,
    pub flags: u8,
    pub speed: u8,
    /// When false the effect follows the global hue instead of `hue`
    pub fixed_hue: bool,
    pub startup_animation: StartupAnimation,
    pub hue: u8,
    pub sat: u8,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            effect: EFFECT_OFF,
            flags: LED_FLAG_ALL,
            speed: 255,
            fixed_hue: false,
            startup_animation: StartupAnimation::default(),
            hue: 255,
            sat: 255,
        }
    }
}

impl Preset {
    /// Decode a preset from its EEPROM record
    pub fn from_wire(wire: &PresetWire) -> Result<Self, ParseError> {
        let startup_animation = StartupAnimation::from_u8(wire.startup_animation).ok_or(
            ParseError::InvalidValue {
                field: "startup_animation",
                value: wire.startup_animation,
            },
        )?;
        Ok(Self {
            effect: wire.effect.get(),
            flags: wire.flags,
            speed: wire.speed,
            fixed_hue: wire.fixed_hue != 0,
            startup_animation,
            hue: wire.hue,
            sat: wire.sat,
        })
    }

    /// Encode for a SET_PRESET write to the given slot
    pub fn to_wire(&self, index: u8) -> PresetWire {
        PresetWire::new(
            index,
            self.flags,
            self.effect,
            self.speed,
            self.fixed_hue as u8,
            self.startup_animation as u8,
            self.hue,
            self.sat,
        )
    }

    /// Whether this slot is excluded from the Fn cycle
    pub fn is_skipped(&self) -> bool {
        self.effect == EFFECT_SKIP
    }
}

/// Partial preset change for read-modify-write updates
///
/// Unset fields keep whatever the device currently stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetUpdate {
    pub effect: Option<u16>,
    pub flags: Option<u8>,
    pub speed: Option<u8>,
    pub fixed_hue: Option<bool>,
    pub startup_animation: Option<StartupAnimation>,
    pub hue: Option<u8>,
    pub sat: Option<u8>,
}

impl PresetUpdate {
    pub fn is_empty(&self) -> bool {
        self.effect.is_none()
            && self.flags.is_none()
            && self.speed.is_none()
            && self.fixed_hue.is_none()
            && self.startup_animation.is_none()
            && self.hue.is_none()
            && self.sat.is_none()
    }

    /// Apply this update on top of the device's current preset
    pub fn apply(&self, base: Preset) -> Preset {
        Preset {
            effect: self.effect.unwrap_or(base.effect),
            flags: self.flags.unwrap_or(base.flags),
            speed: self.speed.unwrap_or(base.speed),
            fixed_hue: self.fixed_hue.unwrap_or(base.fixed_hue),
            startup_animation: self.startup_animation.unwrap_or(base.startup_animation),
            hue: self.hue.unwrap_or(base.hue),
            sat: self.sat.unwrap_or(base.sat),
        }
    }
}

/// Which slots the Fn key cycles through
///
/// Derived from the preset table: a slot is excluded by storing the skip
/// effect. Slot 7 never participates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleMask {
    /// Enabled slots in ascending order, all within 0..=6
    pub enabled: Vec<u8>,
    /// Slot currently shown
    pub current: u8,
    /// Slot restored at power-on
    pub saved: u8,
}

impl CycleMask {
    /// Build from the cyclable presets in slot order
    pub fn from_presets(presets: &[Preset], current: u8, saved: u8) -> Self {
        let enabled = presets
            .iter()
            .enumerate()
            .take(usize::from(LAST_CYCLABLE_SLOT) + 1)
            .filter(|(_, p)| !p.is_skipped())
            .map(|(idx, _)| idx as u8)
            .collect();
        Self {
            enabled,
            current,
            saved,
        }
    }

    /// Visit order of one full cycle: ascending over enabled slots
    pub fn order(&self) -> &[u8] {
        &self.enabled
    }

    /// The slot the Fn cycle lands on after `slot`, wrapping around
    pub fn next_after(&self, slot: u8) -> Option<u8> {
        if self.enabled.is_empty() {
            return None;
        }
        self.enabled
            .iter()
            .copied()
            .find(|&s| s > slot)
            .or_else(|| self.enabled.first().copied())
    }
}

/// One entry of the device's LED map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedInfo {
    pub index: u16,
    pub x: u8,
    pub y: u8,
    pub flags: u8,
    /// Matrix position, when the LED sits under a key
    pub matrix: Option<(u8, u8)>,
}

impl LedInfo {
    pub fn from_response(index: u16, resp: &LedInfoResponse) -> Self {
        let matrix = if resp.row == 0xFF || resp.col == 0xFF {
            None
        } else {
            Some((resp.row, resp.col))
        };
        Self {
            index,
            x: resp.x,
            y: resp.y,
            flags: resp.flags,
            matrix,
        }
    }
}

/// Host-side copy of the direct-LED array
///
/// Mutations touch only this mirror; `Keyboard::send_leds` flushes it to
/// the device.
#[derive(Debug, Clone)]
pub struct LedMirror {
    map: Vec<LedInfo>,
    colors: Vec<Hsv>,
}

impl LedMirror {
    pub fn new(map: Vec<LedInfo>) -> Self {
        let colors = vec![Hsv::OFF; map.len()];
        Self { map, colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn map(&self) -> &[LedInfo] {
        &self.map
    }

    pub fn colors(&self) -> &[Hsv] {
        &self.colors
    }

    /// Set a colour by LED index; out-of-range indices report the bound
    pub fn set_by_index(&mut self, index: u16, color: Hsv) -> Result<(), u16> {
        match self.colors.get_mut(usize::from(index)) {
            Some(slot) => {
                *slot = color;
                Ok(())
            }
            None => Err(self.colors.len() as u16),
        }
    }

    /// Set a colour through the matrix map
    pub fn set_by_matrix(&mut self, row: u8, col: u8, color: Hsv) -> Option<u16> {
        let index = self
            .map
            .iter()
            .find(|led| led.matrix == Some((row, col)))
            .map(|led| led.index)?;
        let slot = self.colors.get_mut(usize::from(index))?;
        *slot = color;
        Some(index)
    }

    /// Reset every LED in the mirror to off
    pub fn clear(&mut self) {
        self.colors.fill(Hsv::OFF);
    }

    /// Overwrite the whole mirror, e.g. from a device read-back
    pub fn load(&mut self, colors: &[Hsv]) {
        let n = self.colors.len().min(colors.len());
        self.colors[..n].copy_from_slice(&colors[..n]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset_with_effect(effect: u16) -> Preset {
        Preset {
            effect,
            ..Preset::default()
        }
    }

    #[test]
    fn test_preset_wire_round_trip_preserves_hue_sat() {
        let preset = Preset {
            effect: 20,
            flags: 0xFF,
            speed: 128,
            fixed_hue: true,
            startup_animation: StartupAnimation::WhiteFadeSat,
            hue: 42,
            sat: 200,
        };
        let wire = preset.to_wire(3);
        assert_eq!(wire.index, 3);
        let back = Preset::from_wire(&wire).unwrap();
        assert_eq!(back, preset);
        assert_eq!(back.hue, 42);
        assert_eq!(back.sat, 200);
    }

    #[test]
    fn test_preset_rejects_unknown_animation() {
        let mut wire = Preset::default().to_wire(0);
        wire.startup_animation = 0x09;
        let err = Preset::from_wire(&wire).unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidValue {
                field: "startup_animation",
                value: 0x09
            }
        );
    }

    #[test]
    fn test_preset_update_partial_apply() {
        let base = Preset {
            effect: 2,
            hue: 10,
            sat: 20,
            ..Preset::default()
        };
        let update = PresetUpdate {
            hue: Some(99),
            ..PresetUpdate::default()
        };
        let merged = update.apply(base);
        assert_eq!(merged.hue, 99);
        assert_eq!(merged.effect, 2);
        assert_eq!(merged.sat, 20);

        assert!(PresetUpdate::default().is_empty());
        assert!(!update.is_empty());
    }

    #[test]
    fn test_cycle_mask_skips_slots() {
        let presets: Vec<Preset> = (0..7)
            .map(|i| {
                if i == 1 || i == 3 {
                    preset_with_effect(EFFECT_SKIP)
                } else {
                    preset_with_effect(2)
                }
            })
            .collect();
        let mask = CycleMask::from_presets(&presets, 0, 0);
        assert_eq!(mask.order(), &[0, 2, 4, 5, 6]);
        assert!(!mask.order().contains(&1));
        assert!(!mask.order().contains(&3));
        assert!(!mask.order().contains(&7));
    }

    #[test]
    fn test_cycle_mask_wraps_around() {
        let presets: Vec<Preset> = (0..7)
            .map(|i| {
                if i == 1 || i == 3 {
                    preset_with_effect(EFFECT_SKIP)
                } else {
                    preset_with_effect(2)
                }
            })
            .collect();
        let mask = CycleMask::from_presets(&presets, 0, 0);
        assert_eq!(mask.next_after(0), Some(2));
        assert_eq!(mask.next_after(2), Some(4));
        assert_eq!(mask.next_after(6), Some(0));
        // Between enabled slots lands on the next enabled one
        assert_eq!(mask.next_after(3), Some(4));

        let all_skipped: Vec<Preset> = (0..7).map(|_| preset_with_effect(EFFECT_SKIP)).collect();
        let empty = CycleMask::from_presets(&all_skipped, 0, 0);
        assert_eq!(empty.next_after(0), None);
    }

    #[test]
    fn test_mirror_set_and_clear() {
        let map: Vec<LedInfo> = (0..4)
            .map(|i| LedInfo {
                index: i,
                x: 0,
                y: 0,
                flags: 1,
                matrix: Some((0, i as u8)),
            })
            .collect();
        let mut mirror = LedMirror::new(map);
        assert_eq!(mirror.len(), 4);

        mirror.set_by_index(2, Hsv::new(10, 20, 30)).unwrap();
        assert_eq!(mirror.colors()[2], Hsv::new(10, 20, 30));

        assert_eq!(mirror.set_by_index(4, Hsv::OFF), Err(4));

        mirror.clear();
        assert!(mirror.colors().iter().all(|&c| c == Hsv::OFF));
    }

    #[test]
    fn test_mirror_matrix_lookup() {
        let map = vec![
            LedInfo {
                index: 0,
                x: 0,
                y: 0,
                flags: 1,
                matrix: Some((0, 0)),
            },
            // Decorative LED without a key under it
            LedInfo {
                index: 1,
                x: 5,
                y: 5,
                flags: 0,
                matrix: None,
            },
            LedInfo {
                index: 2,
                x: 9,
                y: 0,
                flags: 1,
                matrix: Some((1, 4)),
            },
        ];
        let mut mirror = LedMirror::new(map);

        assert_eq!(mirror.set_by_matrix(1, 4, Hsv::new(1, 2, 3)), Some(2));
        assert_eq!(mirror.colors()[2], Hsv::new(1, 2, 3));
        assert_eq!(mirror.set_by_matrix(5, 5, Hsv::OFF), None);
    }

    #[test]
    fn test_led_info_sentinel_matrix() {
        let resp = LedInfoResponse {
            x: 3,
            y: 4,
            flags: 1,
            row: 0xFF,
            col: 0xFF,
        };
        let led = LedInfo::from_response(7, &resp);
        assert_eq!(led.matrix, None);

        let resp = LedInfoResponse {
            x: 3,
            y: 4,
            flags: 1,
            row: 2,
            col: 9,
        };
        assert_eq!(LedInfo::from_response(8, &resp).matrix, Some((2, 9)));
    }
}
