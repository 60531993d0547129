//! CLI styling utilities for terminal output.
//!
//! Provides semantic colors and output helpers. Everything here writes to
//! stderr or to human-readable views; result JSON is never styled.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod colors;
pub mod output;

pub use output::*;

/// Global flag to track if colors are disabled.
static NO_COLOR: AtomicBool = AtomicBool::new(false);

/// Sets the global no-color flag.
pub fn set_no_color(value: bool) {
    NO_COLOR.store(value, Ordering::SeqCst);
}

/// Checks if colors are disabled.
pub fn no_color() -> bool {
    NO_COLOR.load(Ordering::SeqCst)
}
