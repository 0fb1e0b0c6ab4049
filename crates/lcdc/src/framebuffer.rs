//! Framebuffer registry
//!
//! Every framebuffer reserves `2 * height` descriptor slots when it is
//! created, so a later doublescan commit never has to allocate. Handles
//! are small `Copy` values; the registry only tracks which ones are live.

use platform::DeviceAddr;

use crate::descriptor::{SlotAllocator, SlotSpan};
use crate::error::{FramebufferError, ResourceExhaustionError};
use crate::format::PixelFormat;

/// Most framebuffers alive at once
pub const MAX_FRAMEBUFFERS: usize = 8;

/// Largest framebuffer dimension the position/size registers can carry
pub const MAX_DIMENSION: u32 = 4095;

/// Framebuffer identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramebufferId(u16);

impl core::fmt::Display for FramebufferId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "fb{}", self.0)
    }
}

/// Caller-supplied description of a pixel buffer in device memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FramebufferDesc {
    /// Device address of pixel (0, 0)
    pub addr: DeviceAddr,
    /// Line stride in bytes
    pub pitch: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in lines
    pub height: u32,
    /// Pixel format
    pub format: PixelFormat,
}

impl FramebufferDesc {
    /// Tightly packed buffer of `width x height` pixels.
    pub const fn packed(addr: DeviceAddr, width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            addr,
            pitch: width.saturating_mul(format.bytes_per_pixel()),
            width,
            height,
            format,
        }
    }

    /// Size of the pixel data in bytes.
    pub const fn len(&self) -> u32 {
        self.pitch.saturating_mul(self.height)
    }

    /// Whether the buffer holds no pixels.
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check(&self) -> Result<(), FramebufferError> {
        let min_pitch = self.width.saturating_mul(self.format.bytes_per_pixel());
        let fits = (1..=MAX_DIMENSION).contains(&self.width)
            && (1..=MAX_DIMENSION).contains(&self.height)
            && self.pitch >= min_pitch
            && self.pitch % 4 == 0
            && self.addr.checked_offset(self.len()).is_some();
        if fits {
            Ok(())
        } else {
            Err(FramebufferError::InvalidGeometry)
        }
    }
}

/// Registered framebuffer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Framebuffer {
    id: FramebufferId,
    desc: FramebufferDesc,
    slots: SlotSpan,
}

impl Framebuffer {
    /// Identity.
    pub const fn id(&self) -> FramebufferId {
        self.id
    }

    /// Geometry and format.
    pub const fn desc(&self) -> &FramebufferDesc {
        &self.desc
    }

    /// Pixel format.
    pub const fn format(&self) -> PixelFormat {
        self.desc.format
    }

    /// Descriptor slots reserved for doublescan chains.
    pub const fn slots(&self) -> SlotSpan {
        self.slots
    }

    /// Device address of pixel `(x, y)`.
    pub fn pixel_addr(&self, x: u32, y: u32) -> Option<DeviceAddr> {
        let offset = y
            .checked_mul(self.desc.pitch)?
            .checked_add(x.checked_mul(self.desc.format.bytes_per_pixel())?)?;
        self.desc.addr.checked_offset(offset)
    }
}

/// Live framebuffers and the slot arena backing them
#[derive(Debug)]
pub struct FramebufferRegistry {
    live: heapless::Vec<Framebuffer, MAX_FRAMEBUFFERS>,
    slots: SlotAllocator<MAX_FRAMEBUFFERS>,
    next_id: u16,
}

impl FramebufferRegistry {
    /// Registry over an arena of `slot_capacity` descriptors.
    pub const fn new(slot_capacity: u32) -> Self {
        Self {
            live: heapless::Vec::new(),
            slots: SlotAllocator::new(slot_capacity),
            next_id: 0,
        }
    }

    /// Register a buffer, reserving its descriptor slots.
    pub fn create(&mut self, desc: FramebufferDesc) -> Result<Framebuffer, FramebufferError> {
        desc.check()?;
        let table_full = ResourceExhaustionError {
            requested: desc.height.saturating_mul(2),
            available: 0,
        };
        if self.live.is_full() {
            return Err(FramebufferError::Exhausted(table_full));
        }

        let slots = self.slots.alloc(desc.height.saturating_mul(2))?;
        let fb = Framebuffer {
            id: FramebufferId(self.next_id),
            desc,
            slots,
        };
        if self.live.push(fb).is_err() {
            self.slots.free(slots);
            return Err(FramebufferError::Exhausted(table_full));
        }
        self.next_id = self.next_id.wrapping_add(1);
        Ok(fb)
    }

    /// Drop a buffer and release its slots.
    pub fn remove(&mut self, id: FramebufferId) -> Result<Framebuffer, FramebufferError> {
        let pos = self
            .live
            .iter()
            .position(|fb| fb.id == id)
            .ok_or(FramebufferError::Unknown)?;
        let fb = self.live.swap_remove(pos);
        self.slots.free(fb.slots);
        Ok(fb)
    }

    /// Whether `fb` is still registered with the same geometry.
    pub fn contains(&self, fb: &Framebuffer) -> bool {
        self.live.iter().any(|live| live == fb)
    }

    /// Number of live framebuffers.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no framebuffer is registered.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Descriptor slots reserved across all framebuffers.
    pub fn slots_in_use(&self) -> u32 {
        self.slots.in_use()
    }
}
