//! Register map abstraction
//!
//! Word-wide access to a memory-mapped register block. Offsets are byte
//! offsets from the block base and must be 4-byte aligned.
//!
//! `update_bits` is the transactional primitive: implementations must make
//! the read-modify-write atomic with respect to interrupt handlers touching
//! the same block (the end-of-frame handler clears status bits while a
//! commit may be toggling control bits).

use embassy_time::{Duration, Instant, Timer};

/// A bounded register poll ran past its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("register {reg:#x} never matched {expected:#x} under mask {mask:#x} ({timeout_us} us)")]
pub struct PollTimeout {
    /// Register offset that was polled
    pub reg: u32,
    /// Mask applied to each read
    pub mask: u32,
    /// Value the masked read had to equal
    pub expected: u32,
    /// Deadline that expired, in microseconds
    pub timeout_us: u32,
}

/// Register interface of a memory-mapped peripheral
pub trait RegisterMap {
    /// Read a register.
    fn read(&self, reg: u32) -> u32;

    /// Write a register.
    fn write(&self, reg: u32, val: u32);

    /// Replace the bits selected by `mask` with the matching bits of `val`.
    ///
    /// The register is only written when its value actually changes.
    fn update_bits(&self, reg: u32, mask: u32, val: u32);

    /// Set every bit in `bits`.
    fn set_bits(&self, reg: u32, bits: u32) {
        self.update_bits(reg, bits, bits);
    }

    /// Clear every bit in `bits`.
    fn clear_bits(&self, reg: u32, bits: u32) {
        self.update_bits(reg, bits, 0);
    }

    /// Poll `reg` every `step_us` until `read(reg) & mask == expected`.
    ///
    /// A `timeout_us` of zero polls forever; dropping the returned future is
    /// the only way out in that case. On success the last value read is
    /// returned. Like the usual kernel helper, one final read is taken after
    /// the deadline so a slow wake-up does not turn into a false timeout.
    async fn poll_until(
        &self,
        reg: u32,
        mask: u32,
        expected: u32,
        step_us: u32,
        timeout_us: u32,
    ) -> Result<u32, PollTimeout> {
        let deadline = if timeout_us == 0 {
            None
        } else {
            Instant::now().checked_add(Duration::from_micros(u64::from(timeout_us)))
        };

        loop {
            let val = self.read(reg);
            if val & mask == expected {
                return Ok(val);
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let val = self.read(reg);
                if val & mask == expected {
                    return Ok(val);
                }
                return Err(PollTimeout {
                    reg,
                    mask,
                    expected,
                    timeout_us,
                });
            }

            Timer::after_micros(u64::from(step_us)).await;
        }
    }
}

impl<T: RegisterMap + ?Sized> RegisterMap for &T {
    fn read(&self, reg: u32) -> u32 {
        T::read(self, reg)
    }

    fn write(&self, reg: u32, val: u32) {
        T::write(self, reg, val);
    }

    fn update_bits(&self, reg: u32, mask: u32, val: u32) {
        T::update_bits(self, reg, mask, val);
    }
}

// ── MMIO backend ─────────────────────────────────────────────────────────────

/// Register block reached through volatile loads and stores.
pub struct MmioRegisters {
    base: *mut u32,
    len: u32,
    writeable: fn(u32) -> bool,
}

// SAFETY: every access is a single aligned volatile word access, and the only
// compound operation (`update_bits`) runs inside a critical section.
unsafe impl Send for MmioRegisters {}
// SAFETY: see the `Send` impl above.
unsafe impl Sync for MmioRegisters {}

impl MmioRegisters {
    /// Wrap a mapped register block.
    ///
    /// `writeable` reports whether an offset accepts writes; writes to other
    /// offsets are dropped.
    ///
    /// # Safety
    ///
    /// `base` must point at a device register block that is mapped, 4-byte
    /// aligned, at least `len` bytes long, and valid for as long as the
    /// returned value lives.
    pub const unsafe fn new(base: *mut u32, len: u32, writeable: fn(u32) -> bool) -> Self {
        Self {
            base,
            len,
            writeable,
        }
    }

    fn word(&self, reg: u32) -> Option<*mut u32> {
        if reg % 4 != 0 || reg >= self.len {
            return None;
        }
        Some(self.base.wrapping_add((reg / 4) as usize))
    }

    fn read_word(&self, reg: u32) -> u32 {
        match self.word(reg) {
            // SAFETY: `word` bounds-checked the offset against the block
            // length promised by the caller of `new`.
            Some(ptr) => unsafe { ptr.read_volatile() },
            None => 0,
        }
    }

    fn write_word(&self, reg: u32, val: u32) {
        if !(self.writeable)(reg) {
            return;
        }
        if let Some(ptr) = self.word(reg) {
            // SAFETY: as in `read_word`.
            unsafe { ptr.write_volatile(val) }
        }
    }
}

impl RegisterMap for MmioRegisters {
    fn read(&self, reg: u32) -> u32 {
        self.read_word(reg)
    }

    fn write(&self, reg: u32, val: u32) {
        self.write_word(reg, val);
    }

    fn update_bits(&self, reg: u32, mask: u32, val: u32) {
        critical_section::with(|_| {
            let old = self.read_word(reg);
            let new = (old & !mask) | (val & mask);
            if new != old {
                self.write_word(reg, new);
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn all_writeable(_: u32) -> bool {
        true
    }

    fn even_words_only(reg: u32) -> bool {
        reg % 8 == 0
    }

    #[test]
    fn mmio_update_bits_preserves_unmasked_bits() {
        let mut block = [0xF0F0_0000u32, 0, 0, 0];
        // SAFETY: `block` outlives `regs` and is 16 bytes long.
        let regs = unsafe { MmioRegisters::new(block.as_mut_ptr(), 16, all_writeable) };
        regs.update_bits(0, 0x0000_FFFF, 0x1234_5678);
        assert_eq!(regs.read(0), 0xF0F0_5678);
    }

    #[test]
    fn mmio_drops_out_of_range_and_read_only_writes() {
        let mut block = [0u32; 4];
        // SAFETY: `block` outlives `regs` and is 16 bytes long.
        let regs = unsafe { MmioRegisters::new(block.as_mut_ptr(), 16, even_words_only) };
        regs.write(0x4, 0xAA);
        regs.write(0x8, 0xBB);
        regs.write(0x40, 0xCC);
        assert_eq!(regs.read(0x4), 0);
        assert_eq!(regs.read(0x8), 0xBB);
        assert_eq!(regs.read(0x40), 0);
    }

    #[test]
    fn poll_timeout_display_names_register() {
        use std::string::ToString;

        let err = PollTimeout {
            reg: 0x34,
            mask: 1,
            expected: 1,
            timeout_us: 100,
        };
        assert!(err.to_string().contains("0x34"));
    }
}
