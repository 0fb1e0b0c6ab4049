//! Panel / bridge abstraction
//!
//! The panel sits at the far end of the display controller's output bus.
//! The controller only needs to know how pixels travel on that bus and
//! when to switch the panel on and off; initialization command scripts and
//! backlight control live behind this trait.

use core::future::Future;

use bitflags::bitflags;

/// Pixel encoding on the panel bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(non_camel_case_types)]
pub enum BusFormat {
    /// 16 parallel data lines, RGB565
    Rgb565_1x16,
    /// 18 parallel data lines, RGB666
    Rgb666_1x18,
    /// 24 parallel data lines, RGB888
    Rgb888_1x24,
    /// 8 data lines, one component per clock (three clocks per pixel)
    Rgb888_3x8,
    /// As [`BusFormat::Rgb888_3x8`], with component order alternating per line
    Rgb888_3x8_Delta,
    /// Any other media bus code the controller has no mode for
    Other(u32),
}

impl BusFormat {
    /// Whether each pixel takes three bus clocks.
    pub const fn is_three_phase(self) -> bool {
        matches!(self, Self::Rgb888_3x8 | Self::Rgb888_3x8_Delta)
    }
}

bitflags! {
    /// Signal polarity flags reported by the panel
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BusFlags: u8 {
        /// Data-enable is active low
        const DE_LOW = 1 << 0;
        /// Pixel data is driven on the falling clock edge
        const PIXDATA_NEGEDGE = 1 << 1;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BusFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "BusFlags({=u8:#x})", self.bits());
    }
}

/// Kind of sink attached to the controller output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectorKind {
    /// Ordinary parallel or serial LCD
    #[default]
    Dpi,
    /// Sharp "special TFT" panel with PS/CLS/SPL/REV control signals
    SharpTft,
    /// Composite TV encoder; the bus format is not checked
    Tv,
}

/// Everything the controller needs to know about the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Pixel encoding
    pub format: BusFormat,
    /// Polarity flags
    pub flags: BusFlags,
    /// Sink kind
    pub connector: ConnectorKind,
}

impl BusConfig {
    /// Plain DPI panel with default polarities.
    pub const fn dpi(format: BusFormat) -> Self {
        Self {
            format,
            flags: BusFlags::empty(),
            connector: ConnectorKind::Dpi,
        }
    }
}

/// Panel collaborator
pub trait Panel {
    /// Error type
    type Error: core::fmt::Debug;

    /// Bus description; must be answerable before the first modeset.
    fn bus_config(&self) -> BusConfig;

    /// Switch the panel on once the controller is scanning out.
    fn enable(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Switch the panel off before the controller stops.
    fn disable(&mut self) -> impl Future<Output = Result<(), Self::Error>>;
}
