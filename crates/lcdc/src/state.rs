//! Versioned engine state
//!
//! The settled configuration is never edited in place. A commit takes a
//! [`Pending`] duplicate, fills it in during validation and hands it back
//! with [`Versioned::swap`] once the hardware is programmed. A duplicate
//! taken from an older version is refused, so two commits proposed
//! against the same configuration cannot both land.

/// Engine-private flags derived while validating a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineState {
    /// No plane is scanning out, so no frame interrupt will arrive
    pub vblank_suppressed: bool,
    /// Channel 0 fetches the palette before each frame
    pub palette_in_use: bool,
    /// At least one plane is doublescanned
    pub doublescan_in_use: bool,
}

/// Settled value tagged with a generation counter
#[derive(Debug)]
pub struct Versioned<T> {
    version: u32,
    value: T,
}

/// Working copy of a [`Versioned`] value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pending<T> {
    base: u32,
    /// The value being prepared
    pub value: T,
}

/// The pending copy was taken from a superseded version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stale {
    /// Version the copy was taken from
    pub base: u32,
    /// Version now settled
    pub current: u32,
}

impl<T: Clone> Versioned<T> {
    /// Generation 0 holding `value`.
    pub const fn new(value: T) -> Self {
        Self { version: 0, value }
    }

    /// Current generation.
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Settled value.
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Copy to prepare the next generation in.
    pub fn duplicate(&self) -> Pending<T> {
        Pending {
            base: self.version,
            value: self.value.clone(),
        }
    }

    /// Whether `pending` was taken from the current generation.
    pub const fn is_current(&self, pending: &Pending<T>) -> bool {
        pending.base == self.version
    }

    /// Install `pending` as the next generation, returning the old value.
    pub fn swap(&mut self, pending: Pending<T>) -> Result<T, Stale> {
        if !self.is_current(&pending) {
            return Err(Stale {
                base: pending.base,
                current: self.version,
            });
        }
        self.version = self.version.wrapping_add(1);
        Ok(core::mem::replace(&mut self.value, pending.value))
    }
}

impl<T> Pending<T> {
    /// Version this copy was taken from.
    pub const fn base(&self) -> u32 {
        self.base
    }
}
