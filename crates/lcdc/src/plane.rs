//! Scan-out planes
//!
//! Two fetch channels feed the controller. Channel 0 carries the primary
//! plane (the only one able to use a palette); channel 1 carries the
//! overlay, which shares its channel with the alternate (IPU) source.
//! Neither channel scales horizontally. Vertically a plane may be shown
//! at exactly twice its source height by sending every line twice.

use crate::caps::ControllerCaps;
use crate::descriptor::ChainLayout;
use crate::error::ValidationError;
use crate::format::PixelFormat;
use crate::framebuffer::{Framebuffer, MAX_DIMENSION};
use crate::mode::DisplayMode;
use crate::regs;

/// Which fetch channel a plane occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlaneRole {
    /// Channel 0
    Primary,
    /// Channel 1
    Overlay,
}

impl PlaneRole {
    /// Both roles, in channel order.
    pub const ALL: [Self; 2] = [Self::Primary, Self::Overlay];

    /// Channel number.
    pub const fn index(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Overlay => 1,
        }
    }

    /// Tag carried by this channel's descriptors.
    pub const fn descriptor_id(self) -> u32 {
        match self {
            Self::Primary => 0xF0,
            Self::Overlay => 0xF1,
        }
    }

    pub(crate) const fn da_reg(self) -> u32 {
        match self {
            Self::Primary => regs::REG_DA0,
            Self::Overlay => regs::REG_DA1,
        }
    }

    pub(crate) const fn osdc_enable(self) -> u32 {
        match self {
            Self::Primary => regs::OSDC_F0EN,
            Self::Overlay => regs::OSDC_F1EN,
        }
    }

    pub(crate) const fn position_regs(self) -> (u32, u32) {
        match self {
            Self::Primary => (regs::REG_XYP0, regs::REG_SIZE0),
            Self::Overlay => (regs::REG_XYP1, regs::REG_SIZE1),
        }
    }
}

impl core::fmt::Display for PlaneRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Overlay => f.write_str("overlay"),
        }
    }
}

/// Source rectangle in 16.16 fixed point framebuffer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SourceRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
}

impl SourceRect {
    /// Rectangle from whole pixels.
    #[allow(clippy::arithmetic_side_effects)] // Safety: shifts by a constant below 32; inputs are below 2^16
    pub const fn pixels(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x: x << 16,
            y: y << 16,
            w: w << 16,
            h: h << 16,
        }
    }

    /// Whole-pixel figures, if there is no fractional part.
    #[allow(clippy::arithmetic_side_effects)] // Safety: shifts by a constant below 32
    pub const fn to_pixels(&self) -> Option<(u32, u32, u32, u32)> {
        if (self.x | self.y | self.w | self.h) & 0xFFFF != 0 {
            return None;
        }
        Some((self.x >> 16, self.y >> 16, self.w >> 16, self.h >> 16))
    }
}

/// Destination rectangle in output pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DestRect {
    /// Left edge
    pub x: i32,
    /// Top edge
    pub y: i32,
    /// Width
    pub w: u32,
    /// Height
    pub h: u32,
}

impl DestRect {
    /// Rectangle at `(x, y)`.
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Rectangle covering the active area of `mode`.
    pub const fn full_screen(mode: &DisplayMode) -> Self {
        Self::new(0, 0, mode.hdisplay, mode.vdisplay)
    }
}

/// Requested configuration of one plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaneState {
    /// Bound framebuffer; `None` disables the plane
    pub fb: Option<Framebuffer>,
    /// Region of the framebuffer to scan out
    pub src: SourceRect,
    /// Where it lands on screen
    pub dst: DestRect,
}

impl PlaneState {
    /// Plane showing nothing.
    pub const fn disabled() -> Self {
        Self {
            fb: None,
            src: SourceRect::pixels(0, 0, 0, 0),
            dst: DestRect::new(0, 0, 0, 0),
        }
    }

    /// Plane showing all of `fb` at `dst`.
    pub const fn new(fb: Framebuffer, dst: DestRect) -> Self {
        let desc = fb.desc();
        Self {
            src: SourceRect::pixels(0, 0, desc.width, desc.height),
            fb: Some(fb),
            dst,
        }
    }

    /// Same plane with a different source rectangle.
    #[must_use]
    pub const fn with_source(mut self, src: SourceRect) -> Self {
        self.src = src;
        self
    }

    /// Whether a framebuffer is bound.
    pub const fn is_enabled(&self) -> bool {
        self.fb.is_some()
    }

    /// Format of the bound framebuffer.
    pub fn format(&self) -> Option<PixelFormat> {
        self.fb.map(|fb| fb.format())
    }

    /// Whether moving from `self` to `next` needs a full modeset: the
    /// plane turns on or off, or moves, resizes or changes format.
    pub fn needs_modeset(&self, next: &Self) -> bool {
        match (self.fb, next.fb) {
            (None, None) => false,
            (Some(old), Some(new)) => old.format() != new.format() || self.dst != next.dst,
            _ => true,
        }
    }
}

/// A plane that passed validation, with its derived figures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CheckedPlane {
    /// Channel
    pub role: PlaneRole,
    /// Framebuffer scanned out
    pub fb: Framebuffer,
    /// Source left edge, pixels
    pub src_x: u32,
    /// Source top edge, pixels
    pub src_y: u32,
    /// Source width, pixels
    pub width: u32,
    /// Source height, lines
    pub height: u32,
    /// Output rectangle
    pub dst: DestRect,
    /// Transfer layout
    pub layout: ChainLayout,
}

impl CheckedPlane {
    /// Whether the plane needs the palette loaded.
    pub const fn uses_palette(&self) -> bool {
        self.fb.format().is_indexed()
    }

    /// Whether lines are sent twice.
    pub fn is_doublescan(&self) -> bool {
        self.layout == ChainLayout::Doublescan
    }
}

/// Validate one plane against the controller and the requested mode.
///
/// Disabled planes always pass and yield `None`.
pub fn check(
    role: PlaneRole,
    state: &PlaneState,
    caps: &ControllerCaps,
    mode: Option<&DisplayMode>,
) -> Result<Option<CheckedPlane>, ValidationError> {
    let Some(fb) = state.fb else {
        return Ok(None);
    };
    let plane = role;

    if role == PlaneRole::Overlay && !caps.has_osd {
        return Err(ValidationError::OverlayUnavailable);
    }
    if !caps.supports(role, fb.format()) {
        return Err(ValidationError::UnsupportedFormat {
            plane,
            format: fb.format(),
        });
    }

    let (src_x, src_y, src_w, src_h) = state
        .src
        .to_pixels()
        .ok_or(ValidationError::FractionalSource { plane })?;

    let desc = fb.desc();
    let inside = |start: u32, len: u32, limit: u32| {
        len > 0 && start.checked_add(len).is_some_and(|end| end <= limit)
    };
    if !inside(src_x, src_w, desc.width) || !inside(src_y, src_h, desc.height) {
        return Err(ValidationError::SourceOutsideFramebuffer { plane });
    }

    let dst = state.dst;
    let (Ok(dst_x), Ok(dst_y)) = (u32::try_from(dst.x), u32::try_from(dst.y)) else {
        return Err(ValidationError::PositionOutOfRange { plane });
    };

    if !caps.has_osd {
        let covers = mode.is_some_and(|m| dst == DestRect::full_screen(m));
        if !covers || src_x != 0 || src_w != dst.w || src_h != dst.h {
            return Err(ValidationError::MustCoverScreen { plane });
        }
    }

    let layout = if src_h.checked_mul(2) == Some(dst.h) {
        ChainLayout::Doublescan
    } else if src_h == dst.h {
        ChainLayout::Single
    } else {
        return Err(ValidationError::HeightMismatch {
            plane,
            src: src_h,
            dst: dst.h,
        });
    };

    let (max_w, max_h) = match mode {
        Some(m) => (m.hdisplay, m.vdisplay),
        None => (caps.max_width, MAX_DIMENSION),
    };
    // Doublescan output is measured in repeated lines.
    let max_h = match layout {
        ChainLayout::Doublescan => max_h.saturating_mul(2),
        ChainLayout::Single => max_h,
    };
    if !inside(dst_x, dst.w, max_w) || !inside(dst_y, dst.h, max_h) {
        return Err(ValidationError::PositionOutOfRange { plane });
    }

    if src_w != dst.w {
        return Err(ValidationError::WidthMismatch {
            plane,
            src: src_w,
            dst: dst.w,
        });
    }

    Ok(Some(CheckedPlane {
        role,
        fb,
        src_x,
        src_y,
        width: src_w,
        height: src_h,
        dst,
        layout,
    }))
}
