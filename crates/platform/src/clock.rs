//! Pixel clock abstraction
//!
//! The display controller's pixel clock is a divider fed from a parent
//! PLL that other peripherals may share. Rate changes are asynchronous:
//! the returned future resolves once the clock tree has acknowledged the
//! new rate.

use core::future::Future;

/// Pixel clock control
pub trait PixelClock {
    /// Error type
    type Error: core::fmt::Debug;

    /// Closest rate the clock tree can produce for `hz`, or `None` when the
    /// request is out of reach entirely.
    fn round_rate(&self, hz: u32) -> Option<u32>;

    /// Currently programmed pixel clock rate.
    fn rate(&self) -> u32;

    /// Program the pixel clock divider.
    fn set_rate(&self, hz: u32) -> impl Future<Output = Result<(), Self::Error>>;

    /// Reprogram the parent PLL.
    fn set_parent_rate(&self, hz: u32) -> impl Future<Output = Result<(), Self::Error>>;
}

impl<T: PixelClock + ?Sized> PixelClock for &T {
    type Error = T::Error;

    fn round_rate(&self, hz: u32) -> Option<u32> {
        T::round_rate(self, hz)
    }

    fn rate(&self) -> u32 {
        T::rate(self)
    }

    fn set_rate(&self, hz: u32) -> impl Future<Output = Result<(), Self::Error>> {
        T::set_rate(self, hz)
    }

    fn set_parent_rate(&self, hz: u32) -> impl Future<Output = Result<(), Self::Error>> {
        T::set_parent_rate(self, hz)
    }
}

/// Notification delivered by a clock framework around a parent rate change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RateChangeEvent {
    /// The parent is about to change; consumers must reach a safe point
    PreRateChange {
        /// Rate the parent is moving to
        new_hz: u32,
    },
    /// The parent has settled at its new rate
    PostRateChange {
        /// Rate the parent now runs at
        new_hz: u32,
    },
    /// The change was vetoed or failed; the old rate still applies
    AbortRateChange,
}

impl RateChangeEvent {
    /// Target rate carried by the event, if any.
    pub fn target_hz(&self) -> Option<u32> {
        match self {
            Self::PreRateChange { new_hz } | Self::PostRateChange { new_hz } => Some(*new_hz),
            Self::AbortRateChange => None,
        }
    }
}
