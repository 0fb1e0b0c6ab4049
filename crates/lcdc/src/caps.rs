//! Per-SoC controller capabilities
//!
//! Static configuration selected once at engine construction. The tables
//! mirror the controller revisions found across the JZ47xx family.

use crate::format::PixelFormat;
use crate::plane::PlaneRole;

/// Controller revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SocModel {
    /// JZ4740: single plane, no OSD unit
    Jz4740,
    /// JZ4725B: first revision with the OSD unit
    Jz4725b,
    /// JZ4760: larger panels, 24/30-bit formats
    Jz4760,
    /// JZ4770: as JZ4760, framebuffers mapped cached
    Jz4770,
}

impl SocModel {
    /// Capability table for this revision.
    pub const fn caps(self) -> &'static ControllerCaps {
        match self {
            Self::Jz4740 => &JZ4740_CAPS,
            Self::Jz4725b => &JZ4725B_CAPS,
            Self::Jz4760 => &JZ4760_CAPS,
            Self::Jz4770 => &JZ4770_CAPS,
        }
    }
}

/// What a controller revision can do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerCaps {
    /// Revision this table describes
    pub model: SocModel,
    /// A separate device clock gate must be running for register access
    pub needs_dev_clk: bool,
    /// OSD unit present: overlay plane, positioning, IPU input
    pub has_osd: bool,
    /// Framebuffers are mapped cached and need explicit flushes
    pub map_noncoherent: bool,
    /// Widest supported active area
    pub max_width: u32,
    /// Tallest supported active area
    pub max_height: u32,
    /// Formats the primary plane scans out
    pub primary_formats: &'static [PixelFormat],
    /// Formats the overlay plane scans out (empty without OSD)
    pub overlay_formats: &'static [PixelFormat],
}

impl ControllerCaps {
    /// Formats accepted by `role`.
    pub fn formats(&self, role: PlaneRole) -> &'static [PixelFormat] {
        match role {
            PlaneRole::Primary => self.primary_formats,
            PlaneRole::Overlay => self.overlay_formats,
        }
    }

    /// Whether `role` can scan out `format`.
    pub fn supports(&self, role: PlaneRole, format: PixelFormat) -> bool {
        self.formats(role).contains(&format)
    }

    /// Whether the overlay plane exists.
    pub const fn has_overlay(&self) -> bool {
        self.has_osd
    }
}

// ── Tables ───────────────────────────────────────────────────────────────────

const JZ4740_FORMATS: &[PixelFormat] = &[
    PixelFormat::Xrgb1555,
    PixelFormat::Rgb565,
    PixelFormat::Xrgb8888,
];

const JZ4725B_PRIMARY_FORMATS: &[PixelFormat] = &[
    PixelFormat::Xrgb1555,
    PixelFormat::Rgb565,
    PixelFormat::Xrgb8888,
    PixelFormat::C8,
];

const JZ4725B_OVERLAY_FORMATS: &[PixelFormat] = &[
    PixelFormat::Xrgb1555,
    PixelFormat::Rgb565,
    PixelFormat::Xrgb8888,
];

const JZ4760_PRIMARY_FORMATS: &[PixelFormat] = &[
    PixelFormat::Xrgb1555,
    PixelFormat::Rgb565,
    PixelFormat::Rgb888,
    PixelFormat::Xrgb8888,
    PixelFormat::Xrgb2101010,
    PixelFormat::C8,
];

const JZ4760_OVERLAY_FORMATS: &[PixelFormat] = &[
    PixelFormat::Xrgb1555,
    PixelFormat::Rgb565,
    PixelFormat::Rgb888,
    PixelFormat::Xrgb8888,
    PixelFormat::Xrgb2101010,
];

/// JZ4740
pub const JZ4740_CAPS: ControllerCaps = ControllerCaps {
    model: SocModel::Jz4740,
    needs_dev_clk: true,
    has_osd: false,
    map_noncoherent: false,
    max_width: 800,
    max_height: 600,
    primary_formats: JZ4740_FORMATS,
    overlay_formats: &[],
};

/// JZ4725B
pub const JZ4725B_CAPS: ControllerCaps = ControllerCaps {
    model: SocModel::Jz4725b,
    needs_dev_clk: false,
    has_osd: true,
    map_noncoherent: false,
    max_width: 800,
    max_height: 600,
    primary_formats: JZ4725B_PRIMARY_FORMATS,
    overlay_formats: JZ4725B_OVERLAY_FORMATS,
};

/// JZ4760
pub const JZ4760_CAPS: ControllerCaps = ControllerCaps {
    model: SocModel::Jz4760,
    needs_dev_clk: false,
    has_osd: true,
    map_noncoherent: false,
    max_width: 1280,
    max_height: 720,
    primary_formats: JZ4760_PRIMARY_FORMATS,
    overlay_formats: JZ4760_OVERLAY_FORMATS,
};

/// JZ4770
pub const JZ4770_CAPS: ControllerCaps = ControllerCaps {
    model: SocModel::Jz4770,
    needs_dev_clk: false,
    has_osd: true,
    map_noncoherent: true,
    max_width: 1280,
    max_height: 720,
    primary_formats: JZ4760_PRIMARY_FORMATS,
    overlay_formats: JZ4760_OVERLAY_FORMATS,
};
