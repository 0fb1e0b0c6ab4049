//! Atomic commit engine for JZ47xx-family LCD controllers
//!
//! The controller fetches pixels through chains of DMA descriptors on up to
//! two channels (primary plane and overlay) and drives either a parallel
//! panel from its own timing generator or a serial ("smart") panel fed by a
//! slave DMA channel. This crate turns whole-display configuration requests
//! into descriptor chains and register writes, applied all-or-nothing.
//!
//! # Commit flow
//!
//! ```text
//! CommitRequest ──propose──► CommitHandle ──await_settled──► SettledCommit
//!                (validate,                 (disable, bus setup, planes,
//!                 no hardware)               timings + clock, enable, wait)
//! ```
//!
//! [`DisplayEngine::propose`] checks a request against the settled
//! configuration and the controller's capabilities without touching the
//! hardware. [`DisplayEngine::await_settled`] applies an accepted request
//! and resolves once it is on screen.
//!
//! # Collaborators
//!
//! The engine is generic over the [`platform`] traits:
//!
//! - [`platform::RegisterMap`] - the controller's register block
//! - [`platform::PixelClock`] - pixel clock and its parent PLL
//! - [`platform::Panel`] - bus description and panel power
//! - [`descriptor::DescriptorMemory`] - device-visible descriptor storage
//!
//! Serial panels additionally need a [`platform::SlaveDma`] channel handed
//! to [`DisplayEngine::run_serial_refresh`].
//!
//! # Features
//!
//! - `std`: host builds (log through `tracing`; mocks from [`platform`] become available)
//! - `defmt`: log through defmt and derive `defmt::Format` on public types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod log;

pub mod caps;
pub mod clock_sync;
pub mod commit;
pub mod descriptor;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod format;
pub mod frame;
pub mod framebuffer;
pub mod mode;
pub mod palette;
pub mod plane;
pub mod refresh;
pub mod regs;
pub mod slcd;
pub mod state;
pub mod timing;

pub use caps::{ControllerCaps, SocModel};
pub use clock_sync::ClockSyncPhase;
pub use commit::{CommitHandle, CommitRequest, Configuration, FrameEvent, SettledCommit};
pub use descriptor::{DescriptorMemory, HwDescriptor, StaticDescriptorMemory};
pub use engine::{DisplayEngine, EngineConfig};
pub use error::{
    CommitError, Error, FramebufferError, HardwareTimeoutError, SlcdError, ValidationError,
};
pub use format::PixelFormat;
pub use framebuffer::{Framebuffer, FramebufferDesc, FramebufferId};
pub use mode::{DisplayMode, ModeFlags};
pub use palette::LutEntry;
pub use plane::{DestRect, PlaneRole, PlaneState, SourceRect};
pub use slcd::SlcdHost;
