//! Logging shim
//!
//! Target builds log through `defmt` (feature `defmt`); host builds log
//! through `tracing` (feature `std`). With neither, arguments are still
//! type-checked and then dropped. Format strings must stay within the
//! subset all three understand: plain `{}` and `{:x}`/`{:#x}` hints.

#![allow(unused_macros)]

macro_rules! emit {
    ($level:ident, $($arg:tt)*) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($($arg)*);
        #[cfg(all(not(feature = "defmt"), feature = "std"))]
        ::tracing::$level!($($arg)*);
        #[cfg(not(any(feature = "defmt", feature = "std")))]
        let _ = ::core::format_args!($($arg)*);
    }};
}

macro_rules! trace {
    ($($arg:tt)*) => { $crate::log::emit!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { $crate::log::emit!(debug, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { $crate::log::emit!(info, $($arg)*) };
}

/// `warn` would clash with the built-in lint attribute of the same name.
macro_rules! warning {
    ($($arg:tt)*) => { $crate::log::emit!(warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { $crate::log::emit!(error, $($arg)*) };
}

pub(crate) use {debug, emit, error, info, trace, warning};
