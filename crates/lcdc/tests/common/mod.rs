//! Shared rig for engine integration tests.
//!
//! Every collaborator is a platform mock handed to the engine by reference,
//! so tests keep full visibility into register writes, clock changes and
//! panel power transitions.

#![allow(dead_code, clippy::arithmetic_side_effects)]

use core::convert::Infallible;

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use lcdc::descriptor::HwDescriptor;
use lcdc::regs;
use lcdc::{
    CommitRequest, DisplayEngine, DisplayMode, EngineConfig, Error, Framebuffer, FramebufferDesc,
    PixelFormat, SettledCommit, SocModel, StaticDescriptorMemory,
};
use platform::mocks::{MockClock, MockPanel, MockRegisters, WriteEffect};
use platform::{BusConfig, BusFormat, DeviceAddr};

/// Line-descriptor slots available to the engine under test
pub const SLOTS: usize = 2048;
/// Bus address of the descriptor memory
pub const DESC_BASE: DeviceAddr = DeviceAddr(0x0010_0000);
/// Bus address of the first test framebuffer
pub const FB_BASE: u32 = 0x0200_0000;

pub type TestEngine<'a> =
    DisplayEngine<&'a MockRegisters, &'a MockClock, &'a MockPanel, StaticDescriptorMemory<SLOTS>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// 320x240 at 60 Hz on a 16-bit bus
pub fn qvga() -> DisplayMode {
    DisplayMode::from_timings(7_200, [320, 340, 360, 400], [240, 260, 280, 300])
}

pub struct Rig {
    pub regs: MockRegisters,
    pub clock: MockClock,
    pub panel: MockPanel,
}

impl Rig {
    pub fn new(bus: BusConfig) -> Self {
        Self::with_clock(bus, MockClock::new(1_000_000, 50_000_000))
    }

    pub fn rgb565() -> Self {
        Self::new(BusConfig::dpi(BusFormat::Rgb565_1x16))
    }

    pub fn with_clock(bus: BusConfig, clock: MockClock) -> Self {
        init_tracing();
        let regs = MockRegisters::new();
        // The controller reports itself stopped once asked to stop.
        regs.on_write(WriteEffect {
            reg: regs::REG_CTRL,
            trigger: regs::CTRL_DISABLE,
            target: regs::REG_STATE,
            set: regs::STATE_DISABLED,
            clear: 0,
        });
        Self {
            regs,
            clock,
            panel: MockPanel::new(bus),
        }
    }

    pub fn engine(&self, model: SocModel) -> TestEngine<'_> {
        DisplayEngine::new(
            EngineConfig::for_model(model),
            &self.regs,
            &self.clock,
            &self.panel,
            StaticDescriptorMemory::new(DESC_BASE),
        )
    }
}

/// Packed framebuffer number `n`, 1 MiB apart from its neighbours.
pub fn framebuffer(
    engine: &TestEngine<'_>,
    n: u32,
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Framebuffer {
    let addr = DeviceAddr(FB_BASE + n * 0x0010_0000);
    engine
        .create_framebuffer(FramebufferDesc::packed(addr, width, height, format))
        .unwrap()
}

/// Raise end-of-frame every half millisecond, forever.
pub async fn vblank_pump(engine: &TestEngine<'_>, regs: &MockRegisters) -> Infallible {
    loop {
        regs.poke(
            regs::REG_STATE,
            regs.peek(regs::REG_STATE) | regs::STATE_EOF_IRQ,
        );
        engine.handle_irq();
        Timer::after(Duration::from_micros(500)).await;
    }
}

/// Run `fut` with end-of-frame interrupts firing.
pub async fn with_vblank<F: core::future::Future>(
    engine: &TestEngine<'_>,
    regs: &MockRegisters,
    fut: F,
) -> F::Output {
    match select(fut, vblank_pump(engine, regs)).await {
        Either::First(out) => out,
        Either::Second(never) => match never {},
    }
}

/// Commit `req` with end-of-frame interrupts firing.
pub async fn commit(
    engine: &TestEngine<'_>,
    regs: &MockRegisters,
    req: &CommitRequest<'_>,
) -> Result<SettledCommit, Error> {
    with_vblank(engine, regs, engine.commit(req)).await
}

/// Descriptors channel `role` fetches, in order.
pub async fn chain(
    engine: &TestEngine<'_>,
    role: lcdc::PlaneRole,
) -> Vec<(DeviceAddr, HwDescriptor)> {
    let mut nodes = Vec::new();
    engine
        .walk_chain(role, 4 * SLOTS, |addr, desc| nodes.push((addr, *desc)))
        .await;
    nodes
}
