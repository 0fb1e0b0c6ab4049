//! Serial panel refresh
//!
//! Smart panels have no scan-out timing of their own: every frame is
//! pushed to the serial FIFO by a slave DMA channel. The commit path
//! stages the frame to push and kicks the loop; the loop pushes it,
//! reports a completed frame and sleeps for one vertical sync period
//! before the next push.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::signal::Signal;
use embassy_time::Duration;
use platform::DeviceAddr;

/// One frame push
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshJob {
    /// First byte to push
    pub src: DeviceAddr,
    /// Bytes to push
    pub len: u32,
    /// Delay between pushes
    pub interval: Duration,
}

/// Staged refresh job plus the wake-up for an idle loop
pub struct RefreshControl {
    job: BlockingMutex<CriticalSectionRawMutex, Cell<Option<RefreshJob>>>,
    kick: Signal<CriticalSectionRawMutex, ()>,
}

impl RefreshControl {
    /// Nothing staged.
    pub const fn new() -> Self {
        Self {
            job: BlockingMutex::new(Cell::new(None)),
            kick: Signal::new(),
        }
    }

    /// Stage `job` and wake the loop if it is idle.
    ///
    /// A loop already sleeping between pushes keeps its schedule and
    /// picks the new job up on its next push.
    pub fn arm(&self, job: RefreshJob) {
        self.job.lock(|j| j.set(Some(job)));
        self.kick.signal(());
    }

    /// Stop refreshing. A push already in flight still completes.
    pub fn cancel(&self) {
        self.job.lock(|j| j.set(None));
        self.kick.reset();
    }

    /// Staged job, if refreshing.
    pub fn job(&self) -> Option<RefreshJob> {
        self.job.lock(Cell::get)
    }

    /// Wait until a job is staged.
    pub async fn armed(&self) -> RefreshJob {
        loop {
            if let Some(job) = self.job() {
                return job;
            }
            self.kick.wait().await;
        }
    }
}

impl Default for RefreshControl {
    fn default() -> Self {
        Self::new()
    }
}
