//! Mock implementations for testing
//!
//! Every mock keeps its state behind interior mutability so a test can hand
//! `&mock` to the code under test and still inspect the mock afterwards.

#![cfg(any(test, feature = "std"))]

use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_time::{Duration, Timer};

use crate::*;

// ── Registers ────────────────────────────────────────────────────────────────

/// Size of the mocked register window in bytes
pub const MOCK_REG_WINDOW: u32 = 0x200;

const MOCK_REG_WORDS: usize = (MOCK_REG_WINDOW / 4) as usize;

/// One logged register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    /// Register offset
    pub reg: u32,
    /// Value written
    pub val: u32,
}

/// Hardware reaction to a register write.
///
/// When a write to `reg` sets any bit of `trigger`, `set` and `clear` are
/// applied to `target`. Used to model status bits that follow control bits,
/// e.g. a "stopped" flag raised after a "disable" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteEffect {
    /// Register whose write arms the effect
    pub reg: u32,
    /// Bits that must be set in the written value
    pub trigger: u32,
    /// Register the effect lands on
    pub target: u32,
    /// Bits to set in `target`
    pub set: u32,
    /// Bits to clear in `target`
    pub clear: u32,
}

#[derive(Debug, Clone, Copy)]
struct ReadOverride {
    reg: u32,
    mask: u32,
    value: u32,
    remaining: Option<u32>,
}

struct RegFile {
    values: [u32; MOCK_REG_WORDS],
    log: heapless::Vec<RegWrite, 1024>,
    overrides: heapless::Vec<ReadOverride, 8>,
    effects: heapless::Vec<WriteEffect, 8>,
}

impl RegFile {
    fn slot(&mut self, reg: u32) -> Option<&mut u32> {
        self.values.get_mut((reg / 4) as usize)
    }

    fn peek(&self, reg: u32) -> u32 {
        self.values.get((reg / 4) as usize).copied().unwrap_or(0)
    }

    fn store(&mut self, reg: u32, val: u32) {
        if let Some(slot) = self.slot(reg) {
            *slot = val;
        }
        if self.log.len() < self.log.capacity() {
            let _ = self.log.push(RegWrite { reg, val });
        }

        let effects = self.effects.clone();
        for effect in effects
            .iter()
            .filter(|e| e.reg == reg && val & e.trigger != 0)
        {
            if let Some(slot) = self.slot(effect.target) {
                *slot = (*slot | effect.set) & !effect.clear;
            }
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: remaining > 0 checked before decrement
    fn load(&mut self, reg: u32) -> u32 {
        let mut val = self.peek(reg);
        for ov in self.overrides.iter_mut().filter(|o| o.reg == reg) {
            match ov.remaining {
                Some(0) => continue,
                Some(ref mut n) => *n -= 1,
                None => {}
            }
            val = (val & !ov.mask) | (ov.value & ov.mask);
        }
        self.overrides.retain(|o| o.remaining != Some(0));
        val
    }
}

/// Register file with a write log
pub struct MockRegisters {
    file: BlockingMutex<CriticalSectionRawMutex, RefCell<RegFile>>,
}

impl MockRegisters {
    /// All registers zero, empty log.
    pub fn new() -> Self {
        Self {
            file: BlockingMutex::new(RefCell::new(RegFile {
                values: [0; MOCK_REG_WORDS],
                log: heapless::Vec::new(),
                overrides: heapless::Vec::new(),
                effects: heapless::Vec::new(),
            })),
        }
    }

    fn with<T>(&self, f: impl FnOnce(&mut RegFile) -> T) -> T {
        self.file.lock(|file| f(&mut file.borrow_mut()))
    }

    /// Set a register without logging, as if the hardware changed it.
    pub fn poke(&self, reg: u32, val: u32) {
        self.with(|file| {
            if let Some(slot) = file.slot(reg) {
                *slot = val;
            }
        });
    }

    /// Current register value, without side effects.
    pub fn peek(&self, reg: u32) -> u32 {
        self.with(|file| file.peek(reg))
    }

    /// Force the bits in `mask` to read as `value`.
    ///
    /// With `reads == Some(n)` the override applies to the next `n` reads
    /// only; with `None` it stays until [`MockRegisters::clear_overrides`].
    pub fn force_reads(&self, reg: u32, mask: u32, value: u32, reads: Option<u32>) {
        self.with(|file| {
            let _ = file.overrides.push(ReadOverride {
                reg,
                mask,
                value,
                remaining: reads,
            });
        });
    }

    /// Drop every read override.
    pub fn clear_overrides(&self) {
        self.with(|file| file.overrides.clear());
    }

    /// Install a write side effect.
    pub fn on_write(&self, effect: WriteEffect) {
        self.with(|file| {
            let _ = file.effects.push(effect);
        });
    }

    /// Every value written to `reg`, oldest first.
    pub fn writes_to(&self, reg: u32) -> heapless::Vec<u32, 64> {
        self.with(|file| {
            file.log
                .iter()
                .filter(|w| w.reg == reg)
                .map(|w| w.val)
                .take(64)
                .collect()
        })
    }

    /// Number of logged writes.
    pub fn write_count(&self) -> usize {
        self.with(|file| file.log.len())
    }

    /// Position of the first logged write to `reg`, if any.
    pub fn first_write_index(&self, reg: u32) -> Option<usize> {
        self.with(|file| file.log.iter().position(|w| w.reg == reg))
    }

    /// Forget the write log.
    pub fn clear_log(&self) {
        self.with(|file| file.log.clear());
    }
}

impl Default for MockRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterMap for MockRegisters {
    fn read(&self, reg: u32) -> u32 {
        self.with(|file| file.load(reg))
    }

    fn write(&self, reg: u32, val: u32) {
        self.with(|file| file.store(reg, val));
    }

    fn update_bits(&self, reg: u32, mask: u32, val: u32) {
        self.with(|file| {
            let old = file.peek(reg);
            let new = (old & !mask) | (val & mask);
            if new != old {
                file.store(reg, new);
            }
        });
    }
}

// ── Clock ────────────────────────────────────────────────────────────────────

/// Clock tree operation observed by [`MockClock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// Pixel divider programmed
    SetRate(u32),
    /// Parent PLL programmed
    SetParentRate(u32),
}

/// Clock with a configurable achievable range and acknowledge latency
pub struct MockClock {
    min_hz: u32,
    max_hz: u32,
    ack: Duration,
    rate: Cell<u32>,
    parent: Cell<u32>,
    events: RefCell<heapless::Vec<ClockEvent, 32>>,
}

impl MockClock {
    /// Accept any rate in `min_hz..=max_hz`, acknowledging immediately.
    pub fn new(min_hz: u32, max_hz: u32) -> Self {
        Self {
            min_hz,
            max_hz,
            ack: Duration::from_ticks(0),
            rate: Cell::new(0),
            parent: Cell::new(0),
            events: RefCell::new(heapless::Vec::new()),
        }
    }

    /// Delay every rate change by `ack` before it is recorded.
    #[must_use]
    pub fn with_ack_latency(mut self, ack: Duration) -> Self {
        self.ack = ack;
        self
    }

    /// Current parent rate.
    pub fn parent_rate(&self) -> u32 {
        self.parent.get()
    }

    /// Every acknowledged change, oldest first.
    pub fn events(&self) -> heapless::Vec<ClockEvent, 32> {
        self.events.borrow().clone()
    }

    fn record(&self, event: ClockEvent) {
        let mut events = self.events.borrow_mut();
        if events.len() < events.capacity() {
            let _ = events.push(event);
        }
    }

    async fn settle(&self) {
        if self.ack.as_ticks() != 0 {
            Timer::after(self.ack).await;
        }
    }
}

impl PixelClock for MockClock {
    type Error = Infallible;

    fn round_rate(&self, hz: u32) -> Option<u32> {
        (self.min_hz..=self.max_hz).contains(&hz).then_some(hz)
    }

    fn rate(&self) -> u32 {
        self.rate.get()
    }

    async fn set_rate(&self, hz: u32) -> Result<(), Self::Error> {
        self.settle().await;
        self.rate.set(hz);
        self.record(ClockEvent::SetRate(hz));
        Ok(())
    }

    async fn set_parent_rate(&self, hz: u32) -> Result<(), Self::Error> {
        self.settle().await;
        self.parent.set(hz);
        self.record(ClockEvent::SetParentRate(hz));
        Ok(())
    }
}

// ── Panel ────────────────────────────────────────────────────────────────────

/// Panel that counts enable/disable calls
pub struct MockPanel {
    bus: BusConfig,
    power_up: Duration,
    enabled: Cell<bool>,
    enables: Cell<u32>,
    disables: Cell<u32>,
}

impl MockPanel {
    /// Panel with the given bus description, initially off.
    pub fn new(bus: BusConfig) -> Self {
        Self {
            bus,
            power_up: Duration::from_ticks(0),
            enabled: Cell::new(false),
            enables: Cell::new(0),
            disables: Cell::new(0),
        }
    }

    /// Take `power_up` to come on after each enable call.
    #[must_use]
    pub fn with_power_up(mut self, power_up: Duration) -> Self {
        self.power_up = power_up;
        self
    }

    /// Whether the panel is currently on.
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Number of enable calls.
    pub fn enable_count(&self) -> u32 {
        self.enables.get()
    }

    /// Number of disable calls.
    pub fn disable_count(&self) -> u32 {
        self.disables.get()
    }
}

impl Panel for &MockPanel {
    type Error = Infallible;

    fn bus_config(&self) -> BusConfig {
        self.bus
    }

    async fn enable(&mut self) -> Result<(), Self::Error> {
        if self.power_up.as_ticks() != 0 {
            Timer::after(self.power_up).await;
        }
        self.enabled.set(true);
        self.enables.set(self.enables.get().saturating_add(1));
        Ok(())
    }

    async fn disable(&mut self) -> Result<(), Self::Error> {
        self.enabled.set(false);
        self.disables.set(self.disables.get().saturating_add(1));
        Ok(())
    }
}

// ── DMA ──────────────────────────────────────────────────────────────────────

/// Slave DMA channel that logs pushes and completes after a fixed latency
pub struct MockDma {
    latency: Duration,
    pushes: RefCell<heapless::Vec<(DeviceAddr, u32), 64>>,
}

impl MockDma {
    /// Channel whose transfers take `latency` to complete.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            pushes: RefCell::new(heapless::Vec::new()),
        }
    }

    /// Logged pushes as `(source, length)`.
    pub fn pushes(&self) -> heapless::Vec<(DeviceAddr, u32), 64> {
        self.pushes.borrow().clone()
    }

    /// Number of pushes started.
    pub fn push_count(&self) -> usize {
        self.pushes.borrow().len()
    }
}

impl SlaveDma for &MockDma {
    type Error = Infallible;

    async fn push(&mut self, src: DeviceAddr, len: u32) -> Result<(), Self::Error> {
        {
            let mut pushes = self.pushes.borrow_mut();
            if pushes.len() < pushes.capacity() {
                let _ = pushes.push((src, len));
            }
        }
        Timer::after(self.latency).await;
        Ok(())
    }
}
