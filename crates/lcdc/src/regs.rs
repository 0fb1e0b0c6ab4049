//! JZ47xx LCD controller register map
//!
//! Offsets are byte offsets from the controller base. Bit definitions are
//! grouped under the register they belong to.

#![allow(missing_docs)]

// ── Register offsets ─────────────────────────────────────────────────────────

pub const REG_CFG: u32 = 0x00;
pub const REG_VSYNC: u32 = 0x04;
pub const REG_HSYNC: u32 = 0x08;
pub const REG_VAT: u32 = 0x0C;
pub const REG_DAH: u32 = 0x10;
pub const REG_DAV: u32 = 0x14;
pub const REG_PS: u32 = 0x18;
pub const REG_CLS: u32 = 0x1C;
pub const REG_SPL: u32 = 0x20;
pub const REG_REV: u32 = 0x24;
pub const REG_CTRL: u32 = 0x30;
pub const REG_STATE: u32 = 0x34;
pub const REG_IID: u32 = 0x38;
pub const REG_DA0: u32 = 0x40;
pub const REG_SA0: u32 = 0x44;
pub const REG_FID0: u32 = 0x48;
pub const REG_CMD0: u32 = 0x4C;
pub const REG_DA1: u32 = 0x50;
pub const REG_SA1: u32 = 0x54;
pub const REG_FID1: u32 = 0x58;
pub const REG_CMD1: u32 = 0x5C;
pub const REG_RGBC: u32 = 0x90;
pub const REG_SLCD_MCFG: u32 = 0xA0;
pub const REG_SLCD_MCTRL: u32 = 0xA4;
pub const REG_SLCD_MSTATE: u32 = 0xA8;
pub const REG_SLCD_MDATA: u32 = 0xAC;
pub const REG_SLCD_MFIFO: u32 = 0xB0;
pub const REG_OSDC: u32 = 0x100;
pub const REG_OSDCTRL: u32 = 0x104;
pub const REG_OSDS: u32 = 0x108;
pub const REG_BGC: u32 = 0x10C;
pub const REG_IPUR: u32 = 0x11C;
pub const REG_XYP0: u32 = 0x120;
pub const REG_XYP1: u32 = 0x124;
pub const REG_SIZE0: u32 = 0x128;
pub const REG_SIZE1: u32 = 0x12C;

/// Length of the register window in bytes
pub const REG_WINDOW: u32 = 0x130;

/// Whether the register at `reg` accepts writes.
///
/// The fetch-status registers mirror the descriptor currently being
/// processed and are read-only.
pub const fn is_writeable(reg: u32) -> bool {
    !matches!(
        reg,
        REG_IID | REG_SA0 | REG_FID0 | REG_CMD0 | REG_SA1 | REG_FID1 | REG_CMD1
    )
}

// ── CFG ──────────────────────────────────────────────────────────────────────

pub const CFG_SLCD: u32 = 1 << 31;
pub const CFG_PS_DISABLE: u32 = 1 << 23;
pub const CFG_CLS_DISABLE: u32 = 1 << 22;
pub const CFG_SPL_DISABLE: u32 = 1 << 21;
pub const CFG_REV_DISABLE: u32 = 1 << 20;
pub const CFG_REV_POLARITY: u32 = 1 << 12;
pub const CFG_HSYNC_ACTIVE_LOW: u32 = 1 << 11;
pub const CFG_PCLK_FALLING_EDGE: u32 = 1 << 10;
pub const CFG_DE_ACTIVE_LOW: u32 = 1 << 9;
pub const CFG_VSYNC_ACTIVE_LOW: u32 = 1 << 8;

pub const CFG_MODE_GENERIC_16BIT: u32 = 0;
pub const CFG_MODE_GENERIC_18BIT: u32 = 1 << 7;
pub const CFG_MODE_GENERIC_24BIT: u32 = 1 << 6;
pub const CFG_MODE_SPECIAL_TFT_1: u32 = 1;
pub const CFG_MODE_TV_OUT_P: u32 = 4;
pub const CFG_MODE_TV_OUT_I: u32 = 6;
pub const CFG_MODE_8BIT_SERIAL: u32 = 0xC;

// ── Sync / area ──────────────────────────────────────────────────────────────

pub const VSYNC_VPS_OFFSET: u32 = 16;
pub const VSYNC_VPE_OFFSET: u32 = 0;
pub const HSYNC_HPS_OFFSET: u32 = 16;
pub const HSYNC_HPE_OFFSET: u32 = 0;
pub const VAT_HT_OFFSET: u32 = 16;
pub const VAT_VT_OFFSET: u32 = 0;
pub const DAH_HDS_OFFSET: u32 = 16;
pub const DAH_HDE_OFFSET: u32 = 0;
pub const DAV_VDS_OFFSET: u32 = 16;
pub const DAV_VDE_OFFSET: u32 = 0;

// ── CTRL ─────────────────────────────────────────────────────────────────────

pub const CTRL_BURST_16: u32 = 0x2 << 28;
pub const CTRL_RGB555: u32 = 1 << 27;
pub const CTRL_OFUP: u32 = 1 << 26;
pub const CTRL_EOF_IRQ: u32 = 1 << 13;
pub const CTRL_DISABLE: u32 = 1 << 4;
pub const CTRL_ENABLE: u32 = 1 << 3;
pub const CTRL_BPP_8: u32 = 0x3;
pub const CTRL_BPP_15_16: u32 = 0x4;
pub const CTRL_BPP_18_24: u32 = 0x5;
pub const CTRL_BPP_24_COMP: u32 = 0x6;
pub const CTRL_BPP_30: u32 = 0x7;
pub const CTRL_BPP_MASK: u32 = CTRL_RGB555 | 0x7;

// ── Descriptor command word ──────────────────────────────────────────────────

pub const CMD_SOF_IRQ: u32 = 1 << 31;
pub const CMD_EOF_IRQ: u32 = 1 << 30;
pub const CMD_ENABLE_PAL: u32 = 1 << 28;
/// Transfer length field, in 32-bit words
pub const CMD_LEN_MASK: u32 = 0x00FF_FFFF;

// ── STATE ────────────────────────────────────────────────────────────────────

pub const STATE_EOF_IRQ: u32 = 1 << 5;
pub const STATE_SOF_IRQ: u32 = 1 << 4;
pub const STATE_DISABLED: u32 = 1 << 0;

// ── OSD ──────────────────────────────────────────────────────────────────────

pub const OSDC_OSDEN: u32 = 1 << 0;
pub const OSDC_F0EN: u32 = 1 << 3;
pub const OSDC_F1EN: u32 = 1 << 4;

pub const OSDCTRL_IPU: u32 = 1 << 15;
pub const OSDCTRL_RGB555: u32 = 1 << 4;
pub const OSDCTRL_BPP_15_16: u32 = 0x4;
pub const OSDCTRL_BPP_18_24: u32 = 0x5;
pub const OSDCTRL_BPP_24_COMP: u32 = 0x6;
pub const OSDCTRL_BPP_30: u32 = 0x7;
pub const OSDCTRL_BPP_MASK: u32 = OSDCTRL_RGB555 | 0x7;

pub const IPUR_IPUREN: u32 = 1 << 31;
pub const IPUR_IPUR_LSB: u32 = 0;

pub const XYP_XPOS_LSB: u32 = 0;
pub const XYP_YPOS_LSB: u32 = 16;
pub const SIZE_WIDTH_LSB: u32 = 0;
pub const SIZE_HEIGHT_LSB: u32 = 16;

// ── RGBC ─────────────────────────────────────────────────────────────────────

pub const RGBC_ODD_RGB: u32 = 0;
pub const RGBC_EVEN_GBR: u32 = 3;

// ── Serial LCD ───────────────────────────────────────────────────────────────

pub const SLCD_MCFG_DWIDTH_8BIT: u32 = 0x3 << 10;
pub const SLCD_MCFG_CWIDTH_8BIT: u32 = 0x3 << 8;
pub const SLCD_MCTRL_DMATXEN: u32 = 1 << 0;
pub const SLCD_MSTATE_BUSY: u32 = 1 << 0;
pub const SLCD_MDATA_COMMAND: u32 = 1 << 31;
