//! Shared utilities
//!
//! Small building blocks used across the benchmark: the cancellation token
//! that coordinates shutdown, and formatting helpers for the end-of-run
//! summary.

pub mod cancel;
pub mod time;
