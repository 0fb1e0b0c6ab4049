//! Framebuffer pixel formats

use crate::regs;

/// Scan-out pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    /// 8-bit palette index
    C8,
    /// 16 bpp, 5-5-5 with one padding bit
    Xrgb1555,
    /// 16 bpp, 5-6-5
    Rgb565,
    /// 24 bpp packed
    Rgb888,
    /// 32 bpp, 8-8-8 with one padding byte
    Xrgb8888,
    /// 32 bpp, 10-10-10 with two padding bits
    Xrgb2101010,
}

impl PixelFormat {
    /// Bytes per pixel in memory.
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::C8 => 1,
            Self::Xrgb1555 | Self::Rgb565 => 2,
            Self::Rgb888 => 3,
            Self::Xrgb8888 | Self::Xrgb2101010 => 4,
        }
    }

    /// Whether pixels are palette indices.
    pub const fn is_indexed(self) -> bool {
        matches!(self, Self::C8)
    }

    /// Depth field for the primary plane, under [`regs::CTRL_BPP_MASK`].
    pub(crate) const fn ctrl_bits(self) -> u32 {
        match self {
            Self::C8 => regs::CTRL_BPP_8,
            Self::Xrgb1555 => regs::CTRL_RGB555 | regs::CTRL_BPP_15_16,
            Self::Rgb565 => regs::CTRL_BPP_15_16,
            Self::Rgb888 => regs::CTRL_BPP_24_COMP,
            Self::Xrgb8888 => regs::CTRL_BPP_18_24,
            Self::Xrgb2101010 => regs::CTRL_BPP_30,
        }
    }

    /// Depth field for the overlay plane, under [`regs::OSDCTRL_BPP_MASK`].
    ///
    /// The overlay has no palette path, so `C8` maps to nothing.
    pub(crate) const fn osdctrl_bits(self) -> u32 {
        match self {
            Self::C8 => 0,
            Self::Xrgb1555 => regs::OSDCTRL_RGB555 | regs::OSDCTRL_BPP_15_16,
            Self::Rgb565 => regs::OSDCTRL_BPP_15_16,
            Self::Rgb888 => regs::OSDCTRL_BPP_24_COMP,
            Self::Xrgb8888 => regs::OSDCTRL_BPP_18_24,
            Self::Xrgb2101010 => regs::OSDCTRL_BPP_30,
        }
    }
}

impl core::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::C8 => "C8",
            Self::Xrgb1555 => "XRGB1555",
            Self::Rgb565 => "RGB565",
            Self::Rgb888 => "RGB888",
            Self::Xrgb8888 => "XRGB8888",
            Self::Xrgb2101010 => "XRGB2101010",
        };
        f.write_str(name)
    }
}
