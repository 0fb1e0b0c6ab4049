//! Error taxonomy
//!
//! - [`ValidationError`]: the proposed configuration is illegal. Raised
//!   before any hardware access; the settled configuration stays intact.
//! - [`HardwareTimeoutError`]: a bounded register poll expired. The commit
//!   is aborted with the hardware in its last-known state.
//! - [`ResourceExhaustionError`]: descriptor memory ran out while creating
//!   a framebuffer. Nothing is retained.

use platform::PollTimeout;

use crate::format::PixelFormat;
use crate::plane::PlaneRole;

/// Proposed configuration rejected during validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)] // variant fields are named after the figures they carry
pub enum ValidationError {
    /// Active area exceeds the controller's maximum
    #[error("{hdisplay}x{vdisplay} exceeds controller maximum {max_width}x{max_height}")]
    ResolutionTooLarge {
        hdisplay: u32,
        vdisplay: u32,
        max_width: u32,
        max_height: u32,
    },

    /// Sync/total figures violate `display <= sync_start < sync_end <= total`
    #[error("mode timings are inconsistent")]
    InvalidTimings,

    /// The clock tree cannot produce the pixel clock
    #[error("pixel clock {khz} kHz is not achievable")]
    ClockUnachievable { khz: u32 },

    /// The panel bus format has no controller mode
    #[error("panel bus format is not supported")]
    UnsupportedBusFormat,

    /// A palette was supplied with the wrong number of entries
    #[error("palette has {len} entries, hardware expects 256")]
    PaletteSize { len: usize },

    /// The framebuffer format cannot be scanned out by this plane
    #[error("{plane} plane cannot scan out {format}")]
    UnsupportedFormat {
        plane: PlaneRole,
        format: PixelFormat,
    },

    /// Source and destination widths differ (no horizontal scaling)
    #[error("{plane} plane source width {src} does not match output width {dst}")]
    WidthMismatch {
        plane: PlaneRole,
        src: u32,
        dst: u32,
    },

    /// Output height is neither the source height nor twice it
    #[error("{plane} plane source height {src} cannot produce output height {dst}")]
    HeightMismatch {
        plane: PlaneRole,
        src: u32,
        dst: u32,
    },

    /// Source rectangle has a fractional component
    #[error("{plane} plane source rectangle is not pixel aligned")]
    FractionalSource { plane: PlaneRole },

    /// Source rectangle reaches outside its framebuffer
    #[error("{plane} plane source rectangle exceeds the framebuffer")]
    SourceOutsideFramebuffer { plane: PlaneRole },

    /// Destination rectangle is empty or outside the addressable area
    #[error("{plane} plane destination is out of range")]
    PositionOutOfRange { plane: PlaneRole },

    /// Without an OSD unit the single plane must cover the whole screen
    #[error("{plane} plane must cover the full screen on this controller")]
    MustCoverScreen { plane: PlaneRole },

    /// The framebuffer handle is not (or no longer) registered
    #[error("{plane} plane references an unknown framebuffer")]
    UnknownFramebuffer { plane: PlaneRole },

    /// The controller has no overlay plane
    #[error("controller has no overlay plane")]
    OverlayUnavailable,

    /// Overlay and alternate source share a fetch channel
    #[error("overlay plane and alternate source cannot both be enabled")]
    OverlayConflict,

    /// Planes cannot scan out while the controller is inactive
    #[error("planes enabled on an inactive controller")]
    PlanesWithoutScanout,

    /// Activation requested but no mode was ever supplied
    #[error("no display mode")]
    NoMode,
}

/// A bounded hardware poll ran past its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("register {register:#x} did not settle within {waited_us} us")]
pub struct HardwareTimeoutError {
    /// Register that was polled
    pub register: u32,
    /// Deadline in microseconds
    pub waited_us: u32,
}

impl From<PollTimeout> for HardwareTimeoutError {
    fn from(err: PollTimeout) -> Self {
        Self {
            register: err.reg,
            waited_us: err.timeout_us,
        }
    }
}

/// Descriptor memory could not satisfy an allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("needed {requested} descriptors, largest free run is {available}")]
pub struct ResourceExhaustionError {
    /// Descriptor slots requested
    pub requested: u32,
    /// Largest contiguous free run
    pub available: u32,
}

/// Framebuffer registry failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FramebufferError {
    /// Descriptor memory exhausted
    #[error(transparent)]
    Exhausted(#[from] ResourceExhaustionError),
    /// Width, height or pitch cannot describe a scan-out buffer
    #[error("framebuffer geometry is invalid")]
    InvalidGeometry,
    /// Handle does not name a live framebuffer
    #[error("unknown framebuffer")]
    Unknown,
    /// Framebuffer is part of the settled configuration
    #[error("framebuffer is being scanned out")]
    InUse,
}

/// Failure while applying an accepted commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(missing_docs)]
pub enum CommitError {
    /// Hardware never reached the awaited state
    #[error(transparent)]
    Timeout(#[from] HardwareTimeoutError),
    /// The clock tree refused the rate
    #[error("clock tree rejected {hz} Hz")]
    Clock { hz: u32 },
    /// The panel refused to power up or down
    #[error("panel power transition failed")]
    Panel,
    /// Another commit settled, or a referenced framebuffer was destroyed,
    /// after this one was proposed
    #[error("commit superseded before it was applied")]
    Superseded,
}

/// Any failure of a propose-and-apply sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Rejected before touching the hardware
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Failed while being applied
    #[error(transparent)]
    Commit(#[from] CommitError),
}

/// Serial LCD command transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror_no_std::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlcdError {
    /// The serial engine stayed busy
    #[error(transparent)]
    Timeout(#[from] HardwareTimeoutError),
    /// The bus has no read-back path
    #[error("serial LCD bus cannot receive")]
    ReceiveUnsupported,
    /// Nothing to send
    #[error("empty serial LCD transfer")]
    Empty,
}
