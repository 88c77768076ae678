//! VialRGB effect table
//!
//! Effect ids are indices into the firmware's animation table; the names
//! here match the Vial sources. Three ids are special: 0 (off), 1 (per-LED
//! direct control) and 0xFFFF (slot skipped in the Fn cycle).

pub use pikbd_transport::protocol::vialrgb::{EFFECT_DIRECT, EFFECT_OFF, EFFECT_SKIP};

const EFFECT_NAMES: &[&str] = &[
    "Off",
    "Direct",
    "Solid Color",
    "Alphas Mods",
    "Gradient Up Down",
    "Gradient Left Right",
    "Breathing",
    "Band Sat",
    "Band Val",
    "Band Pinwheel Sat",
    "Band Pinwheel Val",
    "Band Spiral Sat",
    "Band Spiral Val",
    "Cycle All",
    "Cycle Left Right",
    "Cycle Up Down",
    "Rainbow Moving Chevron",
    "Cycle Out In",
    "Cycle Out In Dual",
    "Cycle Pinwheel",
    "Cycle Spiral",
    "Dual Beacon",
    "Rainbow Beacon",
    "Rainbow Pinwheels",
    "Raindrops",
    "Jellybean Raindrops",
    "Hue Breathing",
    "Hue Pendulum",
    "Hue Wave",
    "Typing Heatmap",
    "Digital Rain",
    "Solid Reactive Simple",
    "Solid Reactive",
    "Solid Reactive Wide",
    "Solid Reactive Multiwide",
    "Solid Reactive Cross",
    "Solid Reactive Multicross",
    "Solid Reactive Nexus",
    "Solid Reactive Multinexus",
    "Splash",
    "Multisplash",
    "Solid Splash",
    "Solid Multisplash",
    "Pixel Rain",
    "Pixel Fractal",
];

/// Human-readable name for an effect id
///
/// Total over the table plus the skip sentinel; unknown ids return `None`.
pub fn effect_name(id: u16) -> Option<&'static str> {
    if id == EFFECT_SKIP {
        return Some("Skip");
    }
    EFFECT_NAMES.get(id as usize).copied()
}

/// Look up an effect id by name
///
/// Case-insensitive; underscores and spaces are interchangeable, and the
/// `VIALRGB_EFFECT_` prefix from the firmware sources is accepted.
pub fn effect_id(name: &str) -> Option<u16> {
    let normalized = normalize(name);
    let wanted = normalized
        .strip_prefix("vialrgb effect ")
        .unwrap_or(&normalized);
    if wanted == "skip" {
        return Some(EFFECT_SKIP);
    }
    EFFECT_NAMES
        .iter()
        .position(|n| normalize(n) == wanted)
        .map(|idx| idx as u16)
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels_resolve() {
        assert_eq!(effect_name(EFFECT_OFF), Some("Off"));
        assert_eq!(effect_name(EFFECT_DIRECT), Some("Direct"));
        assert_eq!(effect_name(EFFECT_SKIP), Some("Skip"));
        assert_eq!(effect_id("off"), Some(EFFECT_OFF));
        assert_eq!(effect_id("direct"), Some(EFFECT_DIRECT));
        assert_eq!(effect_id("skip"), Some(EFFECT_SKIP));
    }

    #[test]
    fn test_lookup_is_case_and_separator_insensitive() {
        assert_eq!(effect_id("Band Pinwheel Sat"), Some(9));
        assert_eq!(effect_id("band_pinwheel_sat"), Some(9));
        assert_eq!(effect_id("BAND PINWHEEL SAT"), Some(9));
        assert_eq!(effect_id("  cycle spiral "), Some(20));
        assert_eq!(effect_id("VIALRGB_EFFECT_PIXEL_RAIN"), Some(43));
    }

    #[test]
    fn test_name_id_round_trip() {
        for id in 0..EFFECT_NAMES.len() as u16 {
            let name = effect_name(id).unwrap();
            assert_eq!(effect_id(name), Some(id), "round trip failed for {name}");
        }
    }

    #[test]
    fn test_unknown_lookups() {
        assert_eq!(effect_name(46), None);
        assert_eq!(effect_name(0x1234), None);
        assert_eq!(effect_id("lava lamp"), None);
    }
}
