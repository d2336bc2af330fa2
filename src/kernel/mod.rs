//! Thin wrappers around Linux kernel primitives.
//!
//! All `unsafe` code is concentrated here with explicit SAFETY comments.
//! Dependency direction: cgroup -> clone -> signal

pub mod cgroup;
pub mod clone;
pub mod signal;
