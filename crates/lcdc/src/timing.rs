//! Timing calculator
//!
//! The timing generator counts from the start of the sync pulse:
//!
//! ```text
//!   0        pe            ds                 de         t
//!   |--sync--|--back porch--|----active--------|--front--|
//! ```
//!
//! `pe` is the pulse width, `ds = total - sync_start` the first active
//! position, `de = ds + display` the first blank one and
//! `t = de + sync_start - display` the full period (equal to `total`).

use crate::mode::CrtcMode;
use crate::regs;

/// Timing-generator register figures for one mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timings {
    /// Horizontal sync pulse end
    pub hpe: u32,
    /// Horizontal display start
    pub hds: u32,
    /// Horizontal display end
    pub hde: u32,
    /// Horizontal total
    pub ht: u32,
    /// Vertical sync pulse end
    pub vpe: u32,
    /// Vertical display start
    pub vds: u32,
    /// Vertical display end
    pub vde: u32,
    /// Vertical total
    pub vt: u32,
}

/// Sharp special-TFT control signal timings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SharpTimings {
    /// PS register
    pub ps: u32,
    /// CLS register
    pub cls: u32,
    /// SPL register
    pub spl: u32,
    /// REV register
    pub rev: u32,
}

#[allow(clippy::arithmetic_side_effects)] // Safety: CrtcMode comes from DisplayMode::crtc_mode, which enforces display <= sync_start < sync_end <= total
fn axis(display: u32, sync_start: u32, sync_end: u32, total: u32) -> (u32, u32, u32, u32) {
    let pe = sync_end - sync_start;
    let ds = total - sync_start;
    let de = ds + display;
    let t = de + sync_start - display;
    (pe, ds, de, t)
}

impl Timings {
    /// Compute the register figures for `mode`.
    pub fn from_mode(mode: &CrtcMode) -> Self {
        let (hpe, hds, hde, ht) =
            axis(mode.hdisplay, mode.hsync_start, mode.hsync_end, mode.htotal);
        let (vpe, vds, vde, vt) =
            axis(mode.vdisplay, mode.vsync_start, mode.vsync_end, mode.vtotal);
        Self {
            hpe,
            hds,
            hde,
            ht,
            vpe,
            vds,
            vde,
            vt,
        }
    }

    /// Horizontal sync pulse width.
    pub const fn hsync_width(&self) -> u32 {
        self.hpe
    }

    /// Vertical sync pulse width.
    pub const fn vsync_width(&self) -> u32 {
        self.vpe
    }

    /// Dot clocks per line.
    pub const fn line_time(&self) -> u32 {
        self.ht
    }

    /// Dot clocks per frame.
    pub const fn frame_time(&self) -> u32 {
        self.ht.saturating_mul(self.vt)
    }

    /// `(register, value)` pairs for the sync and active-area registers.
    #[allow(clippy::arithmetic_side_effects)] // Safety: field shifts are constant and below 32
    pub fn sync_registers(&self) -> [(u32, u32); 5] {
        [
            // Pulses start at 0; only the end positions are programmed.
            (regs::REG_VSYNC, self.vpe << regs::VSYNC_VPE_OFFSET),
            (regs::REG_HSYNC, self.hpe << regs::HSYNC_HPE_OFFSET),
            (
                regs::REG_VAT,
                (self.ht << regs::VAT_HT_OFFSET) | (self.vt << regs::VAT_VT_OFFSET),
            ),
            (
                regs::REG_DAH,
                (self.hds << regs::DAH_HDS_OFFSET) | (self.hde << regs::DAH_HDE_OFFSET),
            ),
            (
                regs::REG_DAV,
                (self.vds << regs::DAV_VDS_OFFSET) | (self.vde << regs::DAV_VDE_OFFSET),
            ),
        ]
    }

    /// IPU restart delay: how long the controller waits for the IPU before
    /// fetching a new frame (the programming manual's suggested value).
    #[allow(clippy::arithmetic_side_effects)] // Safety: division by a non-zero constant
    pub const fn ipu_restart(&self) -> u32 {
        regs::IPUR_IPUREN | ((self.ht.saturating_mul(self.vpe) / 3) << regs::IPUR_IPUR_LSB)
    }

    /// Control signal timings for Sharp special-TFT panels.
    #[allow(clippy::arithmetic_side_effects)] // Safety: 16-bit field shifts
    pub const fn sharp(&self, mode_htotal: u32) -> SharpTimings {
        let ps = (self.hde << 16) | self.hde.saturating_add(1);
        SharpTimings {
            ps,
            cls: ps,
            spl: (self.hpe << 16) | self.hpe.saturating_add(1),
            rev: mode_htotal << 16,
        }
    }
}
