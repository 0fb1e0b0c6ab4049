//! Display engine
//!
//! Owns the controller and its collaborators and applies commits in the
//! fixed phase order the hardware needs:
//!
//! ```text
//! modeset disables ─► bus setup ─► begin ─► planes ─► flush ─► modeset enables ─► wait
//!   panel off          CFG/RGBC     OSDCTRL   chains    timings    DA0/DA1           one frame
//!   scan-out off                              BPP/XYP   clock      scan-out on
//!   plane bits                                palette   event      panel on
//! ```
//!
//! Locking: `hw` serializes commits and owns the panel and descriptor
//! memory. `settled` and `framebuffers` are short critical sections so
//! `propose` never waits on a commit in progress. The clock mutex lives in
//! [`ClockSync`] and is shared with parent-clock notifications.

use core::cell::{Cell, RefCell};
use core::sync::atomic::{fence, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{with_timeout, Duration, Timer};
use platform::{
    BusConfig, ConnectorKind, DeviceAddr, Panel, PixelClock, RateChangeEvent, RegisterMap, SlaveDma,
};

use crate::caps::{ControllerCaps, SocModel};
use crate::clock_sync::{ClockSync, ClockSyncPhase, ClockSyncState, RateChange};
use crate::commit::{
    self, CommitHandle, CommitRequest, Configuration, FrameEvent, Limits, SettledCommit,
};
use crate::descriptor::{self, ChainLayout, ChainParams, DescriptorMemory, HwDescriptor};
use crate::encoder;
use crate::error::{CommitError, Error, FramebufferError, HardwareTimeoutError, ValidationError};
use crate::frame::{FrameSignal, FrameTicket};
use crate::framebuffer::{Framebuffer, FramebufferDesc, FramebufferRegistry};
use crate::log::{debug, error, info, trace, warning};
use crate::mode::CrtcMode;
use crate::plane::{CheckedPlane, PlaneRole, PlaneState};
use crate::refresh::{RefreshControl, RefreshJob};
use crate::regs;
use crate::slcd::SlcdHost;
use crate::state::Versioned;
use crate::timing::Timings;

/// How long a frame wait may take before it is abandoned
const FRAME_TIMEOUT: Duration = Duration::from_millis(100);
/// Controller-stopped poll interval
const DISABLE_POLL_US: u32 = 1_000;
/// Serial engine idle poll interval
const SLCD_POLL_US: u32 = 4;
/// Serial engine idle deadline
const SLCD_TIMEOUT_US: u32 = 100_000;

/// Static engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Controller revision capabilities
    pub caps: &'static ControllerCaps,
}

impl EngineConfig {
    /// Configuration for a known controller revision.
    pub const fn for_model(model: SocModel) -> Self {
        Self { caps: model.caps() }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct VblankState {
    enabled: bool,
    serial: bool,
}

struct Hardware<P, M> {
    panel: P,
    memory: M,
    panel_is_slcd: bool,
}

/// Atomic commit engine for one LCD controller
pub struct DisplayEngine<R, C, P, M> {
    caps: &'static ControllerCaps,
    bus: BusConfig,
    regs: R,
    clock: C,
    clock_sync: ClockSync,
    frame: FrameSignal,
    refresh: RefreshControl,
    vblank: BlockingMutex<CriticalSectionRawMutex, Cell<VblankState>>,
    settled: BlockingMutex<CriticalSectionRawMutex, RefCell<Versioned<Configuration>>>,
    framebuffers: BlockingMutex<CriticalSectionRawMutex, RefCell<FramebufferRegistry>>,
    suspended: BlockingMutex<CriticalSectionRawMutex, Cell<Option<CommitRequest<'static>>>>,
    hw: Mutex<CriticalSectionRawMutex, Hardware<P, M>>,
}

impl<R, C, P, M> DisplayEngine<R, C, P, M>
where
    R: RegisterMap,
    C: PixelClock,
    P: Panel,
    M: DescriptorMemory,
{
    /// Take ownership of the controller.
    ///
    /// Links the fixed descriptors and, on controllers with an OSD unit,
    /// turns the OSD on. Scan-out stays off until the first commit.
    pub fn new(config: EngineConfig, regs_map: R, clock: C, panel: P, mut memory: M) -> Self {
        let caps = config.caps;
        let bus = panel.bus_config();

        descriptor::init_control_block(&mut memory);
        let slot_capacity = u32::try_from(memory.slots().len()).unwrap_or(u32::MAX);

        if caps.has_osd {
            regs_map.write(regs::REG_OSDC, regs::OSDC_OSDEN);
        }

        info!(
            "lcdc: {} descriptor slots, osd={}, max {}x{}",
            slot_capacity, caps.has_osd, caps.max_width, caps.max_height
        );

        Self {
            caps,
            bus,
            regs: regs_map,
            clock,
            clock_sync: ClockSync::new(),
            frame: FrameSignal::new(),
            refresh: RefreshControl::new(),
            vblank: BlockingMutex::new(Cell::new(VblankState::default())),
            settled: BlockingMutex::new(RefCell::new(Versioned::new(Configuration::off()))),
            framebuffers: BlockingMutex::new(RefCell::new(FramebufferRegistry::new(slot_capacity))),
            suspended: BlockingMutex::new(Cell::new(None)),
            hw: Mutex::new(Hardware {
                panel,
                memory,
                panel_is_slcd: false,
            }),
        }
    }

    /// Controller capabilities.
    pub const fn caps(&self) -> &'static ControllerCaps {
        self.caps
    }

    /// Panel bus description captured at construction.
    pub const fn bus_config(&self) -> &BusConfig {
        &self.bus
    }

    /// Command transport for smart panels sharing the controller's pins.
    pub const fn slcd(&self) -> SlcdHost<'_, R> {
        SlcdHost::new(&self.regs)
    }

    /// Frames completed since construction.
    pub fn frame_sequence(&self) -> u32 {
        self.frame.sequence()
    }

    /// Where a parent-clock change currently is.
    pub fn clock_sync_phase(&self) -> ClockSyncPhase {
        self.clock_sync.phase()
    }

    /// Configuration currently on the hardware.
    pub fn settled(&self) -> Configuration {
        self.settled.lock(|s| *s.borrow().get())
    }

    /// Plane currently scanned out on `role`'s channel.
    pub fn committed_plane(&self, role: PlaneRole) -> PlaneState {
        *self.settled().plane(role)
    }

    // ── Framebuffers ─────────────────────────────────────────────────────────

    /// Register a framebuffer, reserving descriptors for doublescan.
    pub fn create_framebuffer(
        &self,
        desc: FramebufferDesc,
    ) -> Result<Framebuffer, FramebufferError> {
        self.framebuffers
            .lock(|reg| reg.borrow_mut().create(desc))
            .inspect_err(|e| warning!("lcdc: framebuffer creation failed: {}", e))
    }

    /// Release a framebuffer that no settled plane shows.
    pub fn destroy_framebuffer(&self, fb: &Framebuffer) -> Result<(), FramebufferError> {
        if self.settled().references(fb) {
            return Err(FramebufferError::InUse);
        }
        self.framebuffers
            .lock(|reg| reg.borrow_mut().remove(fb.id()))
            .map(|_| ())
    }

    // ── Commit ───────────────────────────────────────────────────────────────

    /// Validate `req` against the settled configuration.
    ///
    /// Touches no hardware. The handle stays valid until another commit
    /// settles.
    pub fn propose(&self, req: &CommitRequest<'_>) -> Result<CommitHandle, ValidationError> {
        let result = self.settled.lock(|settled| {
            self.framebuffers.lock(|reg| {
                let reg = reg.borrow();
                let limits = Limits {
                    caps: self.caps,
                    bus: &self.bus,
                    round_rate: |hz| self.clock.round_rate(hz),
                    is_live: |fb: &Framebuffer| reg.contains(fb),
                };
                commit::validate(req, &settled.borrow(), &limits)
            })
        });

        match &result {
            Ok(handle) => debug!(
                "lcdc: commit accepted, modeset={} no_vblank={}",
                handle.mode_changed(),
                handle.no_vblank()
            ),
            Err(e) => debug!("lcdc: commit rejected: {}", e),
        }
        result
    }

    /// Apply an accepted commit and wait until it is on screen.
    pub async fn await_settled(&self, handle: CommitHandle) -> Result<SettledCommit, CommitError> {
        let CommitHandle {
            next,
            checked,
            timings,
            palette,
            modeset,
            event,
        } = handle;

        let mut hw = self.hw.lock().await;

        let old = self
            .settled
            .lock(|s| {
                let s = s.borrow();
                s.is_current(&next).then(|| *s.get())
            })
            .ok_or(CommitError::Superseded)?;
        let live = self.framebuffers.lock(|reg| {
            let reg = reg.borrow();
            checked.iter().flatten().all(|p| reg.contains(&p.fb))
        });
        if !live {
            return Err(CommitError::Superseded);
        }
        let new = next.value;

        if modeset {
            debug!("lcdc: modeset, active {} -> {}", old.active, new.active);
        }

        // Modeset disables
        if modeset && old.active {
            self.crtc_disable(&mut hw).await?;
        }
        for role in PlaneRole::ALL {
            if old.plane(role).is_enabled() && !new.plane(role).is_enabled() {
                self.plane_disable(role);
            }
        }

        // Bus setup
        if modeset && new.active {
            if let Some(crtc) = new.crtc.as_ref() {
                encoder::apply(&self.regs, &encoder::bus_setup(&self.bus, crtc));
            }
        }

        // Begin
        if modeset && self.caps.has_osd {
            let ipu = if new.alternate_source {
                regs::OSDCTRL_IPU
            } else {
                0
            };
            self.regs
                .update_bits(regs::REG_OSDCTRL, regs::OSDCTRL_IPU, ipu);
        }

        // Planes
        for plane in checked.iter().flatten() {
            self.plane_update(&mut hw.memory, plane, &new, modeset);
        }
        if let Some(pal) = palette {
            hw.memory.control_mut().palette = pal;
        }
        fence(Ordering::SeqCst);

        // Flush. A parent rate change stays out until the commit has settled.
        let mut clock_state = self.clock_sync.lock().await;
        let ticket = self.frame.ticket();
        let mut update_clk_rate = false;
        if modeset && new.active {
            hw.panel_is_slcd = self.regs.read(regs::REG_CFG) & regs::CFG_SLCD != 0;
            self.vblank.lock(|v| {
                v.set(VblankState {
                    serial: hw.panel_is_slcd,
                    ..v.get()
                });
            });
            if let (Some(t), Some(crtc)) = (timings.as_ref(), new.crtc.as_ref()) {
                self.write_timings(t, crtc);
            }
            update_clk_rate = true;
        }
        if hw.panel_is_slcd && new.active {
            let job = new
                .crtc
                .as_ref()
                .filter(|_| new.plane(PlaneRole::Primary).fb.is_some())
                .and_then(|crtc| refresh_job(hw.memory.control().heads.first(), crtc));
            match job {
                Some(job) => self.refresh.arm(job),
                None => self.refresh.cancel(),
            }
        }
        self.flush_clock(&mut clock_state, update_clk_rate, new.crtc.as_ref())
            .await?;

        let armed = new.active && !new.private.vblank_suppressed;

        // Modeset enables
        if modeset && new.active {
            if let Err(e) = self.crtc_enable(&mut hw, &new).await {
                self.refresh.cancel();
                return Err(e);
            }
        }

        self.settled
            .lock(|s| s.borrow_mut().swap(next))
            .map_err(|_| CommitError::Superseded)?;
        drop(clock_state);
        drop(hw);

        info!(
            "lcdc: commit settled, modeset={} active={}",
            modeset, new.active
        );

        if armed {
            self.wait_one_frame(ticket).await;
        }

        Ok(SettledCommit {
            modeset,
            no_vblank: new.private.vblank_suppressed,
            event: event.then(|| FrameEvent {
                sequence: self.frame.sequence(),
                synthesized: !armed,
            }),
            configuration: new,
        })
    }

    /// Propose and apply in one step.
    pub async fn commit(&self, req: &CommitRequest<'_>) -> Result<SettledCommit, Error> {
        let handle = self.propose(req)?;
        Ok(self.await_settled(handle).await?)
    }

    /// Visit the descriptor chain channel `role` fetches, starting at the
    /// address programmed into its DA register.
    ///
    /// Returns the number of descriptors visited.
    pub async fn walk_chain<F>(&self, role: PlaneRole, limit: usize, visit: F) -> usize
    where
        F: FnMut(DeviceAddr, &HwDescriptor),
    {
        let palette = role == PlaneRole::Primary && self.settled().private.palette_in_use;
        let hw = self.hw.lock().await;
        let start = if palette {
            descriptor::palette_desc_addr(&hw.memory)
        } else {
            descriptor::head_addr(&hw.memory, role)
        };
        descriptor::walk(&hw.memory, start, limit, visit)
    }

    /// Run `f` over the descriptor memory.
    pub async fn with_descriptors<T>(&self, f: impl FnOnce(&M) -> T) -> T {
        let hw = self.hw.lock().await;
        f(&hw.memory)
    }

    // ── Power management ─────────────────────────────────────────────────────

    /// Remember the settled configuration and turn everything off.
    ///
    /// Suspending again before [`DisplayEngine::resume`] keeps the first
    /// saved configuration.
    pub async fn suspend(&self) -> Result<(), Error> {
        let saved = self.settled().to_request();
        self.commit(&CommitRequest::disable()).await?;
        self.suspended.lock(|s| {
            let earlier = s.take();
            s.set(earlier.or(Some(saved)));
        });
        info!("lcdc: suspended");
        Ok(())
    }

    /// Restore the configuration saved by [`DisplayEngine::suspend`].
    pub async fn resume(&self) -> Result<(), Error> {
        let Some(saved) = self.suspended.lock(Cell::take) else {
            return Ok(());
        };
        self.commit(&saved).await?;
        info!("lcdc: resumed");
        Ok(())
    }

    // ── Frame completion ─────────────────────────────────────────────────────

    /// End-of-frame interrupt handler. Returns whether a frame ended.
    pub fn handle_irq(&self) -> bool {
        let state = self.regs.read(regs::REG_STATE);
        self.regs
            .update_bits(regs::REG_STATE, regs::STATE_EOF_IRQ, 0);

        if state & regs::STATE_EOF_IRQ != 0 {
            self.frame.complete();
            trace!("lcdc: end of frame");
            true
        } else {
            false
        }
    }

    /// Unmask the end-of-frame interrupt (parallel panels only).
    pub fn enable_vblank(&self) {
        if !self.vblank.lock(Cell::get).serial {
            self.regs
                .update_bits(regs::REG_CTRL, regs::CTRL_EOF_IRQ, regs::CTRL_EOF_IRQ);
        }
    }

    /// Mask the end-of-frame interrupt (parallel panels only).
    pub fn disable_vblank(&self) {
        if !self.vblank.lock(Cell::get).serial {
            self.regs.update_bits(regs::REG_CTRL, regs::CTRL_EOF_IRQ, 0);
        }
    }

    fn vblank_on(&self) {
        self.enable_vblank();
        self.vblank.lock(|v| {
            v.set(VblankState {
                enabled: true,
                ..v.get()
            });
        });
    }

    fn vblank_off(&self) {
        self.disable_vblank();
        self.vblank.lock(|v| {
            v.set(VblankState {
                enabled: false,
                ..v.get()
            });
        });
    }

    async fn wait_one_frame(&self, ticket: FrameTicket) {
        if !self.vblank.lock(Cell::get).enabled {
            return;
        }
        if with_timeout(FRAME_TIMEOUT, self.frame.wait(ticket))
            .await
            .is_err()
        {
            warning!("lcdc: no frame completed within 100 ms");
        }
    }

    /// Push frames to a smart panel for as long as the engine lives.
    ///
    /// Idles while no serial panel is scanning out.
    pub async fn run_serial_refresh<D: SlaveDma>(&self, mut dma: D) {
        loop {
            let job = self.refresh.armed().await;
            trace!(
                "lcdc: refresh push {} bytes from {:#x}",
                job.len,
                job.src.get()
            );

            if dma.push(job.src, job.len).await.is_err() {
                error!("lcdc: refresh push failed, stopping refresh");
                self.refresh.cancel();
                continue;
            }

            self.frame.complete();
            Timer::after(job.interval).await;
        }
    }

    // ── Clock ────────────────────────────────────────────────────────────────

    /// Change the pixel clock's parent at the next frame boundary.
    ///
    /// Blocks while a commit is reprogramming the clock; the next commit
    /// re-derives the pixel divider.
    pub async fn request_clock_rate_change(&self, hz: u32) -> Result<(), CommitError> {
        debug!("lcdc: parent clock change to {} Hz requested", hz);
        let change = self.pre_rate_change().await;
        change.advance(ClockSyncPhase::Applying);
        let result = self.clock.set_parent_rate(hz).await;
        self.post_rate_change(change);

        result.map_err(|_| {
            error!("lcdc: parent clock rejected {} Hz", hz);
            CommitError::Clock { hz }
        })
    }

    /// The parent clock is about to change: take the clock mutex and wait
    /// for the current frame to finish.
    ///
    /// Hold the returned guard until the change is done.
    pub async fn pre_rate_change(&self) -> RateChange<'_> {
        let change = self.clock_sync.begin().await;
        change.advance(ClockSyncPhase::WaitingForBlank);
        let ticket = self.frame.ticket();
        self.wait_one_frame(ticket).await;
        change
    }

    /// The parent clock change finished or was aborted.
    pub fn post_rate_change(&self, change: RateChange<'_>) {
        drop(change);
    }

    /// Clock-framework notifier. `held` carries the guard from the
    /// pre-change notification to the post- or abort notification.
    pub async fn on_rate_change<'a>(
        &'a self,
        event: RateChangeEvent,
        held: &mut Option<RateChange<'a>>,
    ) {
        match event {
            RateChangeEvent::PreRateChange { new_hz } => {
                debug!("lcdc: parent clock changing to {} Hz", new_hz);
                *held = Some(self.pre_rate_change().await);
            }
            RateChangeEvent::PostRateChange { .. } | RateChangeEvent::AbortRateChange => {
                if let Some(change) = held.take() {
                    self.post_rate_change(change);
                }
            }
        }
    }

    async fn flush_clock(
        &self,
        sync: &mut ClockSyncState,
        update: bool,
        crtc: Option<&CrtcMode>,
    ) -> Result<(), CommitError> {
        if !(update || sync.pending_rate_change) {
            return Ok(());
        }
        let Some(crtc) = crtc else {
            return Ok(());
        };

        let hz = crtc.clock_hz();
        self.clock.set_rate(hz).await.map_err(|_| {
            error!("lcdc: pixel clock rejected {} Hz", hz);
            CommitError::Clock { hz }
        })?;
        sync.pending_rate_change = false;
        debug!("lcdc: pixel clock set to {} Hz", hz);
        Ok(())
    }

    // ── Hardware phases ──────────────────────────────────────────────────────

    async fn crtc_disable(&self, hw: &mut Hardware<P, M>) -> Result<(), CommitError> {
        hw.panel.disable().await.map_err(|_| CommitError::Panel)?;
        self.vblank_off();

        if hw.panel_is_slcd {
            self.refresh.cancel();
        } else {
            self.regs
                .update_bits(regs::REG_CTRL, regs::CTRL_DISABLE, regs::CTRL_DISABLE);
            self.regs
                .poll_until(
                    regs::REG_STATE,
                    regs::STATE_DISABLED,
                    regs::STATE_DISABLED,
                    DISABLE_POLL_US,
                    0,
                )
                .await
                .map_err(HardwareTimeoutError::from)?;
        }
        debug!("lcdc: scan-out stopped");
        Ok(())
    }

    async fn crtc_enable(
        &self,
        hw: &mut Hardware<P, M>,
        new: &Configuration,
    ) -> Result<(), CommitError> {
        self.regs.write(regs::REG_STATE, 0);

        let da0 = if new.private.palette_in_use {
            descriptor::palette_desc_addr(&hw.memory)
        } else {
            descriptor::head_addr(&hw.memory, PlaneRole::Primary)
        };
        self.regs.write(PlaneRole::Primary.da_reg(), da0.get());
        self.regs.write(
            PlaneRole::Overlay.da_reg(),
            descriptor::head_addr(&hw.memory, PlaneRole::Overlay).get(),
        );

        if hw.panel_is_slcd {
            self.regs
                .poll_until(
                    regs::REG_SLCD_MSTATE,
                    regs::SLCD_MSTATE_BUSY,
                    0,
                    SLCD_POLL_US,
                    SLCD_TIMEOUT_US,
                )
                .await
                .map_err(|e| {
                    error!("lcdc: serial engine stayed busy, scan-out not started");
                    HardwareTimeoutError::from(e)
                })?;
            self.regs
                .write(regs::REG_SLCD_MCTRL, regs::SLCD_MCTRL_DMATXEN);
        } else {
            self.regs.update_bits(
                regs::REG_CTRL,
                regs::CTRL_ENABLE | regs::CTRL_DISABLE,
                regs::CTRL_ENABLE,
            );
        }

        self.vblank_on();
        hw.panel.enable().await.map_err(|_| CommitError::Panel)?;
        debug!("lcdc: scan-out started");
        Ok(())
    }

    fn write_timings(&self, t: &Timings, crtc: &CrtcMode) {
        for (reg, val) in t.sync_registers() {
            self.regs.write(reg, val);
        }

        if self.bus.connector == ConnectorKind::SharpTft {
            let sharp = t.sharp(crtc.mode_htotal);
            self.regs.write(regs::REG_PS, sharp.ps);
            self.regs.write(regs::REG_CLS, sharp.cls);
            self.regs.write(regs::REG_SPL, sharp.spl);
            self.regs.write(regs::REG_REV, sharp.rev);
        }

        self.regs
            .set_bits(regs::REG_CTRL, regs::CTRL_OFUP | regs::CTRL_BURST_16);
        self.regs.write(regs::REG_IPUR, t.ipu_restart());
    }

    fn plane_disable(&self, role: PlaneRole) {
        if self.caps.has_osd {
            self.regs.clear_bits(regs::REG_OSDC, role.osdc_enable());
        }
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: positions and sizes are validated below 4096, shifts are constant
    fn plane_config(&self, plane: &CheckedPlane) {
        let role = plane.role;
        let format = plane.fb.format();

        if self.caps.has_osd {
            self.regs.set_bits(regs::REG_OSDC, role.osdc_enable());
        }

        if self.caps.has_osd && role == PlaneRole::Overlay {
            self.regs.update_bits(
                regs::REG_OSDCTRL,
                regs::OSDCTRL_BPP_MASK,
                format.osdctrl_bits(),
            );
        } else {
            self.regs
                .update_bits(regs::REG_CTRL, regs::CTRL_BPP_MASK, format.ctrl_bits());
        }

        if self.caps.has_osd {
            let (xy_reg, size_reg) = role.position_regs();
            let x = u32::try_from(plane.dst.x).unwrap_or(0);
            let y = u32::try_from(plane.dst.y).unwrap_or(0);
            self.regs.write(
                xy_reg,
                (x << regs::XYP_XPOS_LSB) | (y << regs::XYP_YPOS_LSB),
            );
            self.regs.write(
                size_reg,
                (plane.dst.w << regs::SIZE_WIDTH_LSB) | (plane.dst.h << regs::SIZE_HEIGHT_LSB),
            );
        }
    }

    fn plane_update(
        &self,
        memory: &mut M,
        plane: &CheckedPlane,
        new: &Configuration,
        modeset: bool,
    ) {
        let role = plane.role;
        let desc = *plane.fb.desc();

        if self.caps.map_noncoherent {
            memory.flush_for_device(desc.addr, desc.len());
        }

        let next = if role == PlaneRole::Primary && new.private.palette_in_use {
            descriptor::palette_desc_addr(memory)
        } else {
            descriptor::head_addr(memory, role)
        };
        let params = ChainParams {
            src: plane
                .fb
                .pixel_addr(plane.src_x, plane.src_y)
                .unwrap_or(desc.addr),
            pitch: desc.pitch,
            width: plane.width,
            height: plane.height,
            cpp: desc.format.bytes_per_pixel(),
            next,
            id: role.descriptor_id(),
        };

        let head = match plane.layout {
            ChainLayout::Single => descriptor::single(&params),
            ChainLayout::Doublescan => {
                let span = plane.fb.slots();
                let lines_phys = descriptor::slot_addr(memory, span.first);
                let lines = memory
                    .slots_mut()
                    .get_mut(span.first as usize..span.end() as usize)
                    .unwrap_or_default();
                match descriptor::doublescan(lines, lines_phys, &params) {
                    Ok(head) => head,
                    Err(e) => {
                        error!("lcdc: {} plane doublescan chain: {}", role, e);
                        return;
                    }
                }
            }
        };

        if let Some(slot) = memory.control_mut().heads.get_mut(role.index()) {
            *slot = head;
        }

        if modeset {
            self.plane_config(plane);
        }
    }
}

/// Frame push for the channel 0 head, `None` while it carries no pixels.
fn refresh_job(head: Option<&HwDescriptor>, crtc: &CrtcMode) -> Option<RefreshJob> {
    let head = head.copied()?;
    let len = (head.cmd & !regs::CMD_EOF_IRQ & regs::CMD_LEN_MASK).saturating_mul(4);
    (len != 0).then(|| RefreshJob {
        src: DeviceAddr(head.addr),
        len,
        interval: Duration::from_hz(u64::from(crtc.vsync_width().max(1))),
    })
}
