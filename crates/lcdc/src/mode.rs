//! Display modes
//!
//! A [`DisplayMode`] is what the caller asks for. [`CrtcMode`] is what the
//! timing generator is programmed with once the panel bus has been taken
//! into account: three-phase serial buses clock every pixel three times, so
//! the horizontal figures and the pixel clock are rescaled.

use bitflags::bitflags;
use platform::{BusConfig, BusFormat, ConnectorKind};

use crate::error::ValidationError;

bitflags! {
    /// Mode signalling flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModeFlags: u8 {
        /// Horizontal sync is active low
        const NHSYNC = 1 << 0;
        /// Vertical sync is active low
        const NVSYNC = 1 << 1;
        /// Interlaced scan (TV output only)
        const INTERLACE = 1 << 2;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ModeFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ModeFlags({=u8:#x})", self.bits());
    }
}

/// Requested display timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayMode {
    /// Pixel clock in kHz
    pub clock_khz: u32,
    /// Active pixels per line
    pub hdisplay: u32,
    /// First pixel of the horizontal sync pulse
    pub hsync_start: u32,
    /// First pixel after the horizontal sync pulse
    pub hsync_end: u32,
    /// Pixels per line including blanking
    pub htotal: u32,
    /// Active lines per frame
    pub vdisplay: u32,
    /// First line of the vertical sync pulse
    pub vsync_start: u32,
    /// First line after the vertical sync pulse
    pub vsync_end: u32,
    /// Lines per frame including blanking
    pub vtotal: u32,
    /// Polarity and scan flags
    pub flags: ModeFlags,
}

impl DisplayMode {
    /// Build a mode from `[display, sync_start, sync_end, total]` per axis.
    pub const fn from_timings(clock_khz: u32, h: [u32; 4], v: [u32; 4]) -> Self {
        Self {
            clock_khz,
            hdisplay: h[0],
            hsync_start: h[1],
            hsync_end: h[2],
            htotal: h[3],
            vdisplay: v[0],
            vsync_start: v[1],
            vsync_end: v[2],
            vtotal: v[3],
            flags: ModeFlags::empty(),
        }
    }

    /// Same mode with `flags`.
    #[must_use]
    pub const fn with_flags(mut self, flags: ModeFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Check `0 < display <= sync_start < sync_end <= total` on both axes.
    pub fn check(&self) -> Result<(), ValidationError> {
        let axis_ok = |display: u32, start: u32, end: u32, total: u32| {
            display > 0 && display <= start && start < end && end <= total
        };

        if self.clock_khz == 0
            || !axis_ok(self.hdisplay, self.hsync_start, self.hsync_end, self.htotal)
            || !axis_ok(self.vdisplay, self.vsync_start, self.vsync_end, self.vtotal)
        {
            return Err(ValidationError::InvalidTimings);
        }
        Ok(())
    }

    /// Timing-generator figures for this mode on the given bus.
    ///
    /// TV encoders take the mode unchanged. Three-phase serial formats get
    /// `clock * 3` and every horizontal figure `x * 3 - hdisplay * 2`; the
    /// active width itself stays in pixels.
    pub fn crtc_mode(&self, bus: &BusConfig) -> Result<CrtcMode, ValidationError> {
        self.check()?;

        let mut crtc = CrtcMode {
            clock_khz: self.clock_khz,
            hdisplay: self.hdisplay,
            hsync_start: self.hsync_start,
            hsync_end: self.hsync_end,
            htotal: self.htotal,
            vdisplay: self.vdisplay,
            vsync_start: self.vsync_start,
            vsync_end: self.vsync_end,
            vtotal: self.vtotal,
            mode_htotal: self.htotal,
            flags: self.flags,
        };

        if bus.connector == ConnectorKind::Tv {
            return Ok(crtc);
        }

        match bus.format {
            BusFormat::Rgb565_1x16 | BusFormat::Rgb666_1x18 | BusFormat::Rgb888_1x24 => {}
            BusFormat::Rgb888_3x8 | BusFormat::Rgb888_3x8_Delta => {
                let correction = self
                    .hdisplay
                    .checked_mul(2)
                    .ok_or(ValidationError::InvalidTimings)?;
                let triple = |x: u32| {
                    x.checked_mul(3)
                        .and_then(|x| x.checked_sub(correction))
                        .ok_or(ValidationError::InvalidTimings)
                };

                crtc.clock_khz = self
                    .clock_khz
                    .checked_mul(3)
                    .ok_or(ValidationError::InvalidTimings)?;
                crtc.hsync_start = triple(self.hsync_start)?;
                crtc.hsync_end = triple(self.hsync_end)?;
                crtc.htotal = triple(self.htotal)?;
            }
            BusFormat::Other(_) => return Err(ValidationError::UnsupportedBusFormat),
        }

        Ok(crtc)
    }
}

/// Mode as programmed into the timing generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CrtcMode {
    /// Dot clock in kHz
    pub clock_khz: u32,
    /// Active pixels per line
    pub hdisplay: u32,
    /// Horizontal sync start, in dot clocks
    pub hsync_start: u32,
    /// Horizontal sync end, in dot clocks
    pub hsync_end: u32,
    /// Line length, in dot clocks
    pub htotal: u32,
    /// Active lines per frame
    pub vdisplay: u32,
    /// Vertical sync start line
    pub vsync_start: u32,
    /// Vertical sync end line
    pub vsync_end: u32,
    /// Lines per frame
    pub vtotal: u32,
    /// Line length of the requested mode, in pixels
    pub mode_htotal: u32,
    /// Polarity and scan flags
    pub flags: ModeFlags,
}

impl CrtcMode {
    /// Dot clock in Hz.
    pub const fn clock_hz(&self) -> u32 {
        self.clock_khz.saturating_mul(1000)
    }

    /// Vertical sync pulse width in lines.
    pub const fn vsync_width(&self) -> u32 {
        self.vsync_end.saturating_sub(self.vsync_start)
    }
}
