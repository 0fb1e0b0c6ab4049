//! Frame-completion signal
//!
//! Raised once per scanned-out frame: by the end-of-frame interrupt on
//! parallel panels, by the refresh task on serial ones. Waiters take a
//! [`FrameTicket`] first and then wait for the sequence to move past it,
//! so a frame that completes between arming and awaiting is never lost.

use core::cell::RefCell;
use core::future::poll_fn;
use core::task::Poll;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::waitqueue::MultiWakerRegistration;

/// Most tasks waiting for a frame at once
const MAX_WAITERS: usize = 4;

/// Frame sequence observed before waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameTicket(u32);

struct Inner {
    sequence: u32,
    wakers: MultiWakerRegistration<MAX_WAITERS>,
}

/// Broadcast frame-completion counter
pub struct FrameSignal {
    inner: BlockingMutex<CriticalSectionRawMutex, RefCell<Inner>>,
}

impl FrameSignal {
    /// Signal at sequence 0.
    pub const fn new() -> Self {
        Self {
            inner: BlockingMutex::new(RefCell::new(Inner {
                sequence: 0,
                wakers: MultiWakerRegistration::new(),
            })),
        }
    }

    /// Frames completed so far (wrapping).
    pub fn sequence(&self) -> u32 {
        self.inner.lock(|inner| inner.borrow().sequence)
    }

    /// Register interest in the next frame.
    pub fn ticket(&self) -> FrameTicket {
        FrameTicket(self.sequence())
    }

    /// Record a completed frame and wake every waiter.
    ///
    /// Safe to call from interrupt context and to call spuriously.
    pub fn complete(&self) {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            inner.sequence = inner.sequence.wrapping_add(1);
            inner.wakers.wake();
        });
    }

    /// Wait until at least one frame completed after `ticket` was taken.
    ///
    /// Returns the new sequence number.
    pub async fn wait(&self, ticket: FrameTicket) -> u32 {
        poll_fn(|cx| {
            self.inner.lock(|inner| {
                let mut inner = inner.borrow_mut();
                if inner.sequence != ticket.0 {
                    Poll::Ready(inner.sequence)
                } else {
                    inner.wakers.register(cx.waker());
                    Poll::Pending
                }
            })
        })
        .await
    }
}

impl Default for FrameSignal {
    fn default() -> Self {
        Self::new()
    }
}
