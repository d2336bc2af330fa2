//! Utilities
//!
//! Helpers usable from async-signal context.

pub mod signal_safe;
