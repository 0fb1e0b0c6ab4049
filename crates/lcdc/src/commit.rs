//! Commit requests and validation
//!
//! A commit moves through three types:
//!
//! ```text
//! CommitRequest ──propose──► CommitHandle ──await_settled──► SettledCommit
//!       │                        │
//!       └──► ValidationError     └──► CommitError
//! ```
//!
//! Validation is pure: it reads the settled configuration, never the
//! hardware, and produces the next configuration as a [`Pending`] copy.

use platform::BusConfig;

use crate::caps::ControllerCaps;
use crate::descriptor::PALETTE_ENTRIES;
use crate::error::ValidationError;
use crate::framebuffer::Framebuffer;
use crate::mode::{CrtcMode, DisplayMode};
use crate::palette::{self, LutEntry};
use crate::plane::{self, CheckedPlane, PlaneRole, PlaneState};
use crate::state::{EngineState, Pending, Versioned};
use crate::timing::Timings;

/// Proposed display configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitRequest<'a> {
    /// New mode; `None` keeps the settled one
    pub mode: Option<DisplayMode>,
    /// Whether the controller scans out
    pub active: bool,
    /// Channel 0 plane
    pub primary: PlaneState,
    /// Channel 1 plane
    pub overlay: PlaneState,
    /// Channel 1 is fed by the IPU instead of memory
    pub alternate_source: bool,
    /// New colour lookup table for indexed formats
    pub palette: Option<&'a [LutEntry]>,
    /// Report the frame the commit becomes visible in
    pub event: bool,
}

impl<'a> CommitRequest<'a> {
    /// Scan out `mode` with both planes off.
    pub const fn enable(mode: DisplayMode) -> Self {
        Self {
            mode: Some(mode),
            active: true,
            primary: PlaneState::disabled(),
            overlay: PlaneState::disabled(),
            alternate_source: false,
            palette: None,
            event: false,
        }
    }

    /// Stop scanning out.
    pub const fn disable() -> Self {
        Self {
            mode: None,
            active: false,
            primary: PlaneState::disabled(),
            overlay: PlaneState::disabled(),
            alternate_source: false,
            palette: None,
            event: false,
        }
    }

    /// Keep the settled mode, planes off.
    pub const fn keep_mode() -> Self {
        Self {
            active: true,
            ..Self::disable()
        }
    }

    /// Same request with `plane` on channel 0.
    #[must_use]
    pub const fn with_primary(mut self, plane: PlaneState) -> Self {
        self.primary = plane;
        self
    }

    /// Same request with `plane` on channel 1.
    #[must_use]
    pub const fn with_overlay(mut self, plane: PlaneState) -> Self {
        self.overlay = plane;
        self
    }

    /// Same request with channel 1 fed by the IPU.
    #[must_use]
    pub const fn with_alternate_source(mut self, enabled: bool) -> Self {
        self.alternate_source = enabled;
        self
    }

    /// Same request with a new palette.
    #[must_use]
    pub const fn with_palette(mut self, lut: &'a [LutEntry]) -> Self {
        self.palette = Some(lut);
        self
    }

    /// Same request asking for a presentation event.
    #[must_use]
    pub const fn with_event(mut self) -> Self {
        self.event = true;
        self
    }

    /// Plane proposed for `role`.
    pub const fn plane(&self, role: PlaneRole) -> &PlaneState {
        match role {
            PlaneRole::Primary => &self.primary,
            PlaneRole::Overlay => &self.overlay,
        }
    }
}

/// Configuration as last settled on the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Configuration {
    /// Requested mode
    pub mode: Option<DisplayMode>,
    /// Mode as programmed, when active
    pub crtc: Option<CrtcMode>,
    /// Whether the controller scans out
    pub active: bool,
    /// Plane per channel
    pub planes: [PlaneState; 2],
    /// Channel 1 fed by the IPU
    pub alternate_source: bool,
    /// Derived engine flags
    pub private: EngineState,
}

impl Configuration {
    /// Nothing configured.
    pub const fn off() -> Self {
        Self {
            mode: None,
            crtc: None,
            active: false,
            planes: [PlaneState::disabled(), PlaneState::disabled()],
            alternate_source: false,
            private: EngineState {
                vblank_suppressed: true,
                palette_in_use: false,
                doublescan_in_use: false,
            },
        }
    }

    /// Plane on `role`'s channel.
    pub fn plane(&self, role: PlaneRole) -> &PlaneState {
        match role {
            PlaneRole::Primary => &self.planes[0],
            PlaneRole::Overlay => &self.planes[1],
        }
    }

    /// Whether `fb` is referenced by any plane.
    pub fn references(&self, fb: &Framebuffer) -> bool {
        self.planes
            .iter()
            .any(|p| p.fb.is_some_and(|bound| bound.id() == fb.id()))
    }

    /// Request that reproduces this configuration.
    pub const fn to_request(&self) -> CommitRequest<'static> {
        CommitRequest {
            mode: self.mode,
            active: self.active,
            primary: self.planes[0],
            overlay: self.planes[1],
            alternate_source: self.alternate_source,
            palette: None,
            event: false,
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::off()
    }
}

/// Accepted commit, ready to be applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitHandle {
    pub(crate) next: Pending<Configuration>,
    pub(crate) checked: [Option<CheckedPlane>; 2],
    pub(crate) timings: Option<Timings>,
    pub(crate) palette: Option<[u16; PALETTE_ENTRIES]>,
    pub(crate) modeset: bool,
    pub(crate) event: bool,
}

impl CommitHandle {
    /// Whether applying this commit resets the timing generator.
    pub const fn mode_changed(&self) -> bool {
        self.modeset
    }

    /// Whether completion is synthesized instead of awaited.
    pub const fn no_vblank(&self) -> bool {
        self.next.value.private.vblank_suppressed
    }

    /// Engine flags this commit settles.
    pub const fn private_state(&self) -> &EngineState {
        &self.next.value.private
    }

    /// Configuration this commit settles.
    pub const fn configuration(&self) -> &Configuration {
        &self.next.value
    }

    /// Validated figures for `role`, if the plane is on.
    pub fn checked_plane(&self, role: PlaneRole) -> Option<&CheckedPlane> {
        self.checked.get(role.index()).and_then(Option::as_ref)
    }
}

/// Frame in which a commit became visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameEvent {
    /// Frame counter at delivery
    pub sequence: u32,
    /// Delivered without waiting for a frame
    pub synthesized: bool,
}

/// Outcome of an applied commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SettledCommit {
    /// A modeset was performed
    pub modeset: bool,
    /// Completion was synthesized
    pub no_vblank: bool,
    /// Presentation event, if requested
    pub event: Option<FrameEvent>,
    /// Configuration now on the hardware
    pub configuration: Configuration,
}

/// Controller facts validation depends on
pub(crate) struct Limits<'c, F, L> {
    pub caps: &'c ControllerCaps,
    pub bus: &'c BusConfig,
    pub round_rate: F,
    pub is_live: L,
}

/// Validate `req` against the settled configuration.
pub(crate) fn validate<F, L>(
    req: &CommitRequest<'_>,
    settled: &Versioned<Configuration>,
    limits: &Limits<'_, F, L>,
) -> Result<CommitHandle, ValidationError>
where
    F: Fn(u32) -> Option<u32>,
    L: Fn(&Framebuffer) -> bool,
{
    let caps = limits.caps;
    let old = settled.get();

    let palette = req.palette.map(palette::quantize).transpose()?;

    for role in PlaneRole::ALL {
        if let Some(fb) = req.plane(role).fb {
            if !(limits.is_live)(&fb) {
                return Err(ValidationError::UnknownFramebuffer { plane: role });
            }
        }
    }

    if req.alternate_source && !caps.has_osd {
        return Err(ValidationError::OverlayUnavailable);
    }
    if req.overlay.is_enabled() && req.alternate_source {
        return Err(ValidationError::OverlayConflict);
    }

    let mode = req.mode.or(old.mode);
    let (crtc, timings) = if req.active {
        let mode = mode.ok_or(ValidationError::NoMode)?;
        mode.check()?;
        if mode.hdisplay > caps.max_width || mode.vdisplay > caps.max_height {
            return Err(ValidationError::ResolutionTooLarge {
                hdisplay: mode.hdisplay,
                vdisplay: mode.vdisplay,
                max_width: caps.max_width,
                max_height: caps.max_height,
            });
        }
        let crtc = mode.crtc_mode(limits.bus)?;
        if (limits.round_rate)(mode.clock_khz.saturating_mul(1000)).is_none() {
            return Err(ValidationError::ClockUnachievable {
                khz: mode.clock_khz,
            });
        }
        (Some(crtc), Some(Timings::from_mode(&crtc)))
    } else {
        if req.primary.is_enabled() || req.overlay.is_enabled() || req.alternate_source {
            return Err(ValidationError::PlanesWithoutScanout);
        }
        (None, None)
    };

    let checked = [
        plane::check(PlaneRole::Primary, &req.primary, caps, mode.as_ref())?,
        plane::check(PlaneRole::Overlay, &req.overlay, caps, mode.as_ref())?,
    ];

    let modeset = req.mode.is_some_and(|m| old.mode != Some(m))
        || req.active != old.active
        || req.alternate_source != old.alternate_source
        || PlaneRole::ALL
            .into_iter()
            .any(|role| old.plane(role).needs_modeset(req.plane(role)));

    let mut next = settled.duplicate();
    next.value = Configuration {
        mode,
        crtc,
        active: req.active,
        planes: [req.primary, req.overlay],
        alternate_source: req.alternate_source,
        private: EngineState {
            vblank_suppressed: !req.primary.is_enabled()
                && !req.overlay.is_enabled()
                && !req.alternate_source,
            palette_in_use: checked[0].is_some_and(|p| p.uses_palette()),
            doublescan_in_use: checked.iter().flatten().any(CheckedPlane::is_doublescan),
        },
    };

    Ok(CommitHandle {
        next,
        checked,
        timings,
        palette,
        modeset,
        event: req.event,
    })
}
