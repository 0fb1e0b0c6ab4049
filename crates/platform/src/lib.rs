//! Hardware Abstraction Layer (HAL) for the LCD controller engine
//!
//! This crate provides trait-based abstractions for the collaborators the
//! display engine drives, enabling development and testing without physical
//! hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Caller (commit requests, IRQ dispatch, clock notifications)
//!         ↓
//! Display engine (lcdc crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (MMIO register block, clock tree, slave DMA, panel)
//! ```
//!
//! # Abstraction Levels
//!
//! - [`RegisterMap`] - register read/write/update and bounded polling
//! - [`PixelClock`] - pixel clock divider and parent PLL
//! - [`Panel`] - bus format and power sequencing of the attached panel
//! - [`SlaveDma`] - memory-to-device pushes for command-mode panels
//!
//! # Features
//!
//! - `std`: Enable the [`mocks`] module outside of this crate's own tests
//! - `defmt`: Enable defmt::Format derives
//!
//! # Example
//!
//! ```no_run
//! use platform::RegisterMap;
//!
//! async fn wait_stopped<R: RegisterMap>(regs: &R) -> bool {
//!     regs.poll_until(0x34, 1, 1, 1_000, 0).await.is_ok()
//! }
//! ```

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
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)]
// prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod clock;
pub mod dma;
pub mod mocks;
pub mod panel;
pub mod regmap;

pub use clock::{PixelClock, RateChangeEvent};
pub use dma::{DeviceAddr, SlaveDma};
pub use panel::{BusConfig, BusFlags, BusFormat, ConnectorKind, Panel};
pub use regmap::{MmioRegisters, PollTimeout, RegisterMap};
