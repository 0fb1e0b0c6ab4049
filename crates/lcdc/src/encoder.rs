//! Panel bus configuration
//!
//! Translates the panel's bus description and the mode's polarity flags
//! into the CFG and RGBC register values.

use platform::{BusConfig, BusFlags, BusFormat, ConnectorKind, RegisterMap};

use crate::mode::{CrtcMode, ModeFlags};
use crate::regs;

/// CFG and RGBC values for a bus/mode pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusSetup {
    /// CFG value; the SLCD bit is left to the serial host
    pub cfg: u32,
    /// RGBC value
    pub rgbc: u32,
}

/// Compute the bus registers for `mode` on `bus`.
pub fn bus_setup(bus: &BusConfig, mode: &CrtcMode) -> BusSetup {
    let mut cfg = 0;
    let mut rgbc = 0;

    if bus.connector == ConnectorKind::SharpTft {
        cfg |= regs::CFG_MODE_SPECIAL_TFT_1 | regs::CFG_REV_POLARITY;
    } else {
        cfg |= regs::CFG_PS_DISABLE
            | regs::CFG_CLS_DISABLE
            | regs::CFG_SPL_DISABLE
            | regs::CFG_REV_DISABLE;
    }

    if mode.flags.contains(ModeFlags::NHSYNC) {
        cfg |= regs::CFG_HSYNC_ACTIVE_LOW;
    }
    if mode.flags.contains(ModeFlags::NVSYNC) {
        cfg |= regs::CFG_VSYNC_ACTIVE_LOW;
    }
    if bus.flags.contains(BusFlags::DE_LOW) {
        cfg |= regs::CFG_DE_ACTIVE_LOW;
    }
    if bus.flags.contains(BusFlags::PIXDATA_NEGEDGE) {
        cfg |= regs::CFG_PCLK_FALLING_EDGE;
    }

    if bus.connector == ConnectorKind::Tv {
        cfg |= if mode.flags.contains(ModeFlags::INTERLACE) {
            regs::CFG_MODE_TV_OUT_I
        } else {
            regs::CFG_MODE_TV_OUT_P
        };
    } else {
        match bus.format {
            BusFormat::Rgb565_1x16 => cfg |= regs::CFG_MODE_GENERIC_16BIT,
            BusFormat::Rgb666_1x18 => cfg |= regs::CFG_MODE_GENERIC_18BIT,
            BusFormat::Rgb888_1x24 => cfg |= regs::CFG_MODE_GENERIC_24BIT,
            BusFormat::Rgb888_3x8_Delta => {
                rgbc |= regs::RGBC_EVEN_GBR | regs::RGBC_ODD_RGB;
                cfg |= regs::CFG_MODE_8BIT_SERIAL;
            }
            BusFormat::Rgb888_3x8 => cfg |= regs::CFG_MODE_8BIT_SERIAL,
            // Rejected during validation.
            BusFormat::Other(_) => {}
        }
    }

    BusSetup { cfg, rgbc }
}

/// Program CFG (leaving the SLCD bit alone) and RGBC.
pub fn apply<R: RegisterMap>(regs_map: &R, setup: &BusSetup) {
    regs_map.update_bits(regs::REG_CFG, !regs::CFG_SLCD, setup.cfg);
    regs_map.write(regs::REG_RGBC, setup.rgbc);
}
