//! mmapbench - Memory-mapped IO micro-benchmark
//!
//! mmapbench drives concurrent random page-granularity reads or writes against
//! a huge memory mapping backed by a file or block device, and reports a
//! per-second throughput time series together with kernel-side cost counters
//! (TLB shootdowns, device IO bytes).
//!
//! # Architecture
//!
//! - **Mapped region**: one PROT_READ|PROT_WRITE, MAP_SHARED mapping shared
//!   by all workers
//! - **Workers**: tight loops issuing one page-aligned access per iteration,
//!   uniform random offsets, per-worker RNG
//! - **Stats**: cache-line aligned per-worker counters, drained exactly once
//!   per sample tick
//! - **Sampler**: 1-second cadence CSV reporter on stdout, cooperative
//!   shutdown via a cancellation token
//! - **Kernel counters**: /proc/interrupts and /proc/diskstats readers for
//!   shootdown and IO-byte deltas

pub mod config;
pub mod cpuload;
pub mod distribution;
pub mod kernel;
pub mod output;
pub mod region;
pub mod sampler;
pub mod stats;
pub mod util;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use util::cancel::CancelToken;

/// Result type used throughout mmapbench
pub type Result<T> = anyhow::Result<T>;
