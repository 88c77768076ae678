//! Keymap grid and switch matrix decoding

use crate::identity::KeyboardModel;

/// Keycode 0x0000, an unbound position
pub const KC_NO: u16 = 0x0000;

/// Number of dynamic keymap layers exposed by the firmware
pub const LAYER_COUNT: u8 = 4;

/// Matrix grid size for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixDims {
    pub rows: u8,
    pub cols: u8,
}

impl MatrixDims {
    pub const fn for_model(_model: KeyboardModel) -> Self {
        // Both keyboards run the same 6x16 electrical matrix
        Self { rows: 6, cols: 16 }
    }

    /// Bytes one row occupies in a switch matrix report
    pub fn row_width(&self) -> usize {
        match self.cols {
            0..=8 => 1,
            9..=16 => 2,
            17..=24 => 3,
            _ => 4,
        }
    }

    pub fn contains(&self, row: u8, col: u8) -> bool {
        row < self.rows && col < self.cols
    }
}

/// One keymap position and its bound keycode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    pub layer: u8,
    pub row: u8,
    pub col: u8,
    pub keycode: u16,
}

/// Decode a switch matrix report body into pressed positions
///
/// `raw` starts at the first row bitmask (echo bytes already stripped).
/// Rows are packed big-endian, one bitmask each, bit `1 << col` set while
/// the switch is closed.
pub fn decode_matrix_state(raw: &[u8], dims: MatrixDims) -> Vec<(u8, u8)> {
    let width = dims.row_width();
    let mut pressed = Vec::new();
    for row in 0..dims.rows {
        let start = usize::from(row) * width;
        let Some(chunk) = raw.get(start..start + width) else {
            break;
        };
        let mut bits: u32 = 0;
        for &b in chunk {
            bits = (bits << 8) | u32::from(b);
        }
        for col in 0..dims.cols {
            if bits & (1 << col) != 0 {
                pressed.push((row, col));
            }
        }
    }
    pressed
}
