//! DMA abstraction layer
//!
//! Device addresses and the slave-channel interface used to push a memory
//! buffer into a peripheral data port.

use core::future::Future;

/// Bus address as seen by a DMA master.
///
/// Distinct from a CPU pointer: the controller's descriptor fetcher and the
/// slave DMA engine only ever see these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceAddr(pub u32);

impl DeviceAddr {
    /// Raw bus address
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Address `bytes` further on, or `None` past the end of the bus.
    #[must_use]
    pub const fn checked_offset(self, bytes: u32) -> Option<Self> {
        match self.0.checked_add(bytes) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }
}

impl core::fmt::Display for DeviceAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Memory-to-device DMA channel
pub trait SlaveDma {
    /// Error type
    type Error: core::fmt::Debug;

    /// Push `len` bytes starting at `src` into the peripheral.
    ///
    /// Resolves when the hardware reports the transfer complete. Dropping
    /// the future does not abort a transfer already handed to the hardware;
    /// it only stops the caller from observing its completion.
    fn push(&mut self, src: DeviceAddr, len: u32) -> impl Future<Output = Result<(), Self::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_offset_stops_at_bus_end() {
        assert_eq!(
            DeviceAddr(0x1000).checked_offset(0x10),
            Some(DeviceAddr(0x1010))
        );
        assert_eq!(DeviceAddr(u32::MAX).checked_offset(1), None);
    }

    #[test]
    fn display_is_zero_padded_hex() {
        use std::string::ToString;
        assert_eq!(DeviceAddr(0x2000).to_string(), "0x00002000");
    }
}
