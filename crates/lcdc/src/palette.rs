//! Palette quantization
//!
//! Colour lookup tables arrive as 16-bit-per-channel entries and are
//! stored in the controller's palette as RGB565.

use crate::descriptor::PALETTE_ENTRIES;
use crate::error::ValidationError;

/// One colour lookup table entry, 16 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LutEntry {
    /// Red
    pub red: u16,
    /// Green
    pub green: u16,
    /// Blue
    pub blue: u16,
}

impl LutEntry {
    /// Entry from 8-bit channels, replicated into 16 bits.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            red: u16::from_be_bytes([r, r]),
            green: u16::from_be_bytes([g, g]),
            blue: u16::from_be_bytes([b, b]),
        }
    }

    /// Round to RGB565.
    #[allow(clippy::arithmetic_side_effects)] // Safety: extracted channels fit their field widths
    pub fn to_rgb565(self) -> u16 {
        (extract(self.red, 5) << 11) | (extract(self.green, 6) << 5) | extract(self.blue, 5)
    }
}

/// Round a 16-bit channel to `bits` bits, to nearest.
#[allow(clippy::arithmetic_side_effects)] // Safety: 0 < bits <= 16, sums are done in u32
pub fn extract(value: u16, bits: u32) -> u16 {
    if bits == 0 || bits >= 16 {
        return value;
    }
    let shift = 16 - bits;
    let max = 0xFFFFu32 >> shift;
    let rounded = (u32::from(value) + (1 << (shift - 1))) >> shift;
    rounded.min(max) as u16
}

/// Quantize a full lookup table.
pub fn quantize(lut: &[LutEntry]) -> Result<[u16; PALETTE_ENTRIES], ValidationError> {
    if lut.len() != PALETTE_ENTRIES {
        return Err(ValidationError::PaletteSize { len: lut.len() });
    }
    let mut out = [0u16; PALETTE_ENTRIES];
    for (dst, entry) in out.iter_mut().zip(lut) {
        *dst = entry.to_rgb565();
    }
    Ok(out)
}
