//! Diagnostic verbosity
//!
//! A process-wide level gating debug prints at detector and dispatch
//! decision points. Off (0) by default; the CLI raises it per `-v` flag.

use std::sync::atomic::{AtomicI32, Ordering};

static VERBOSITY: AtomicI32 = AtomicI32::new(0);

/// Set the global diagnostic level. 0 = silent, 1 = per-call decisions,
/// 2 = per-candidate detail.
pub fn set_verbosity(level: i32) {
    VERBOSITY.store(level, Ordering::Relaxed);
}

pub fn verbosity() -> i32 {
    VERBOSITY.load(Ordering::Relaxed)
}

/// Print to stderr when the global level is at least `$level`.
macro_rules! zx_debug {
    ($level:expr, $($arg:tt)*) => {
        if $crate::verbosity::verbosity() >= $level {
            eprintln!($($arg)*);
        }
    };
}

pub(crate) use zx_debug;
