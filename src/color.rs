// Colour string parsing

use pikbd_keyboard::Hsv;
use thiserror::Error;

/// Colour string that matches none of the accepted formats
#[derive(Debug, Error)]
#[error(
    "invalid colour {input:?}: use a named colour (\"red\", \"blue\"), \
     HSV values (\"128,255,255\"), RGB hex (\"#FF0000\") or \"rgb(255,0,0)\""
)]
pub struct ColourError {
    input: String,
}

/// Named colours as firmware HSV triples
const NAMED_COLOURS: &[(&str, Hsv)] = &[
    ("red", Hsv::new(0, 255, 255)),
    ("green", Hsv::new(85, 255, 255)),
    ("blue", Hsv::new(170, 255, 255)),
    ("white", Hsv::new(0, 0, 255)),
    ("black", Hsv::new(0, 0, 0)),
    ("yellow", Hsv::new(43, 255, 255)),
    ("cyan", Hsv::new(128, 255, 255)),
    ("magenta", Hsv::new(213, 255, 255)),
    ("orange", Hsv::new(21, 255, 255)),
    ("purple", Hsv::new(213, 127, 128)),
    ("pink", Hsv::new(234, 76, 255)),
];

/// Parse a colour given as a name, "h,s,v", "#RRGGBB" or "rgb(r,g,b)"
///
/// RGB forms are converted; the device always speaks HSV.
pub fn parse_colour(input: &str) -> Result<Hsv, ColourError> {
    let colour = input.trim().to_lowercase();

    if let Some(&(_, hsv)) = NAMED_COLOURS.iter().find(|(name, _)| *name == colour) {
        return Ok(hsv);
    }

    let hex = colour.strip_prefix('#').unwrap_or(&colour);
    if hex.len() == 6 {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        ) {
            return Ok(rgb_to_hsv(r, g, b));
        }
    }

    if let Some(inner) = colour.strip_prefix("rgb(").and_then(|s| s.strip_suffix(')')) {
        if let Some([r, g, b]) = parse_triple(inner) {
            return Ok(rgb_to_hsv(r, g, b));
        }
    } else if let Some([h, s, v]) = parse_triple(&colour) {
        return Ok(Hsv::new(h, s, v));
    }

    Err(ColourError {
        input: input.to_string(),
    })
}

fn parse_triple(s: &str) -> Option<[u8; 3]> {
    let mut parts = s.split(',');
    let triple = [
        parts.next()?.trim().parse().ok()?,
        parts.next()?.trim().parse().ok()?,
        parts.next()?.trim().parse().ok()?,
    ];
    parts.next().is_none().then_some(triple)
}

/// Convert RGB (0-255 each) to the firmware's 0-255 HSV scale
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let rf = f32::from(r) / 255.0;
    let gf = f32::from(g) / 255.0;
    let bf = f32::from(b) / 255.0;
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = max - min;

    let h = if diff == 0.0 {
        0.0
    } else if max == rf {
        (60.0 * ((gf - bf) / diff) + 360.0) % 360.0
    } else if max == gf {
        (60.0 * ((bf - rf) / diff) + 120.0) % 360.0
    } else {
        (60.0 * ((rf - gf) / diff) + 240.0) % 360.0
    };
    let s = if max == 0.0 { 0.0 } else { diff / max };

    Hsv::new(
        (h * 255.0 / 360.0) as u8,
        (s * 255.0) as u8,
        (max * 255.0) as u8,
    )
}
