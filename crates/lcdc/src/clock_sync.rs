//! Pixel clock rate-change coordination
//!
//! Changing the parent clock while the controller fetches a frame tears
//! the image, so a parent change waits for the next frame boundary and the
//! commit path re-derives the pixel divider afterwards. Both sides take
//! the same async mutex; whoever holds it owns the clock tree.
//!
//! ```text
//!   Idle ─► RateChangeRequested ─► WaitingForBlank ─► Applying ─► Idle
//! ```

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};

/// Where a parent-clock change currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSyncPhase {
    /// Nothing in progress
    #[default]
    Idle,
    /// Lock taken, pixel divider marked for update
    RateChangeRequested,
    /// Waiting for the current frame to finish
    WaitingForBlank,
    /// Parent clock being reprogrammed
    Applying,
}

/// State guarded by the clock mutex
#[derive(Debug, Default)]
pub struct ClockSyncState {
    /// The pixel divider must be re-derived on the next commit flush
    pub pending_rate_change: bool,
}

/// Clock mutex plus an observable phase
pub struct ClockSync {
    state: Mutex<CriticalSectionRawMutex, ClockSyncState>,
    phase: BlockingMutex<CriticalSectionRawMutex, Cell<ClockSyncPhase>>,
}

impl ClockSync {
    /// Idle, nothing pending.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(ClockSyncState {
                pending_rate_change: false,
            }),
            phase: BlockingMutex::new(Cell::new(ClockSyncPhase::Idle)),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ClockSyncPhase {
        self.phase.lock(Cell::get)
    }

    pub(crate) fn set_phase(&self, phase: ClockSyncPhase) {
        self.phase.lock(|p| p.set(phase));
    }

    /// Take the clock mutex.
    pub async fn lock(&self) -> MutexGuard<'_, CriticalSectionRawMutex, ClockSyncState> {
        self.state.lock().await
    }

    /// Start a parent change: take the mutex and mark the divider stale.
    ///
    /// The change lasts until the returned guard is dropped.
    pub async fn begin(&self) -> RateChange<'_> {
        let mut guard = self.state.lock().await;
        guard.pending_rate_change = true;
        self.set_phase(ClockSyncPhase::RateChangeRequested);
        RateChange {
            sync: self,
            _guard: guard,
        }
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self::new()
    }
}

/// A parent-clock change in progress; dropping it returns to idle
pub struct RateChange<'a> {
    sync: &'a ClockSync,
    _guard: MutexGuard<'a, CriticalSectionRawMutex, ClockSyncState>,
}

impl RateChange<'_> {
    /// Advance the observable phase.
    pub fn advance(&self, phase: ClockSyncPhase) {
        self.sync.set_phase(phase);
    }
}

impl Drop for RateChange<'_> {
    fn drop(&mut self) {
        self.sync.set_phase(ClockSyncPhase::Idle);
    }
}
