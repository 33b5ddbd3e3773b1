//! The sampling and reporting loop
//!
//! Runs on the main thread, once per process. Each tick it sleeps for the
//! configured interval, drains every worker's operation counter, and emits
//! one CSV row on the output stream. When the elapsed wall clock reaches the
//! run duration it raises the cancellation token and returns; the caller
//! joins the workers afterwards.
//!
//! Draining on a wall-clock cadence rather than after a fixed operation
//! count yields a time series suitable for plotting throughput over time and
//! spotting warm-up or cool-down transients.
//!
//! Kernel counters ride along optionally: when present, the sampler takes a
//! baseline snapshot before the first tick, logs per-tick deltas at `debug`
//! and the cumulative delta at `info`, and hands the cumulative delta back
//! in [`RunTotals`]. The CSV stream itself never changes shape.
//!
//! # Example
//!
//! ```
//! use mmapbench::config::WorkloadMode;
//! use mmapbench::sampler::Sampler;
//! use mmapbench::stats::CounterSet;
//! use mmapbench::util::cancel::CancelToken;
//! use std::time::Duration;
//!
//! let counters = CounterSet::new(2);
//! let cancel = CancelToken::new();
//! let sampler = Sampler::new(
//!     WorkloadMode::Write,
//!     2,
//!     Duration::from_millis(10),
//!     Duration::from_millis(30),
//! );
//!
//! let mut out = Vec::new();
//! let totals = sampler.run(&mut out, &counters, None, &cancel)?;
//! assert!(cancel.is_cancelled());
//! assert_eq!(totals.samples as usize, out.split(|&b| b == b'\n').count() - 2);
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::WorkloadMode;
use crate::kernel::{KernelCounters, KernelSnapshot};
use crate::region::PAGE_SIZE;
use crate::stats::CounterSet;
use crate::util::cancel::CancelToken;
use crate::Result;
use anyhow::Context;
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

/// One emitted row of the throughput time series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRecord {
    /// Workload mode of the run
    pub mode: WorkloadMode,
    /// Worker thread count
    pub threads: usize,
    /// Wall-clock seconds since run start, at drain time
    pub elapsed_secs: f64,
    /// Operations drained for this interval
    pub ops: u64,
}

impl SampleRecord {
    /// The CSV header, emitted once before the first row
    pub fn csv_header() -> &'static str {
        "system,workload,pageSize,thread,time,throughput"
    }

    /// This record as one CSV row
    pub fn to_csv(&self) -> String {
        format!(
            "mmap,{},{},{},{:.3},{}",
            self.mode.code(),
            PAGE_SIZE,
            self.threads,
            self.elapsed_secs,
            self.ops
        )
    }
}

/// Totals accumulated over one sampling run
#[derive(Debug, Clone, Copy)]
pub struct RunTotals {
    /// Number of sample rows emitted
    pub samples: u64,
    /// Sum of all drained operation counts
    pub ops: u64,
    /// Wall-clock time from run start to the final drain
    pub elapsed: Duration,
    /// Cumulative kernel counter delta over the run, when counters were read
    pub kernel_delta: Option<KernelSnapshot>,
}

/// The tick loop configuration
#[derive(Debug, Clone)]
pub struct Sampler {
    mode: WorkloadMode,
    threads: usize,
    interval: Duration,
    run_duration: Duration,
}

impl Sampler {
    /// Create a sampler for a run of `run_duration`, ticking every `interval`
    pub fn new(
        mode: WorkloadMode,
        threads: usize,
        interval: Duration,
        run_duration: Duration,
    ) -> Self {
        Self {
            mode,
            threads,
            interval,
            run_duration,
        }
    }

    /// Run the loop to completion
    ///
    /// Emits the header and one row per tick on `out`, flushing after each
    /// line so a consumer tailing the stream sees rows as they happen. When
    /// the elapsed time reaches the run duration, raises `cancel` exactly
    /// once and returns the run totals. The caller joins the workers.
    ///
    /// `kernel` failures are fatal mid-run for the same reason they are
    /// fatal at setup: a silently zeroed cost counter would corrupt the
    /// measurement without any visible sign.
    pub fn run<W: Write>(
        &self,
        out: &mut W,
        counters: &CounterSet,
        kernel: Option<&KernelCounters>,
        cancel: &CancelToken,
    ) -> Result<RunTotals> {
        writeln!(out, "{}", SampleRecord::csv_header()).context("Failed to write CSV header")?;
        out.flush().context("Failed to flush CSV header")?;

        let baseline = match kernel {
            Some(k) => Some(
                k.snapshot()
                    .context("Failed to read kernel counter baseline")?,
            ),
            None => None,
        };
        let mut previous = baseline;

        let start = Instant::now();
        let mut totals = RunTotals {
            samples: 0,
            ops: 0,
            elapsed: Duration::ZERO,
            kernel_delta: None,
        };

        loop {
            thread::sleep(self.interval);

            let ops = counters.drain_ops();
            let elapsed = start.elapsed();

            let record = SampleRecord {
                mode: self.mode,
                threads: self.threads,
                elapsed_secs: elapsed.as_secs_f64(),
                ops,
            };
            writeln!(out, "{}", record.to_csv()).context("Failed to write sample row")?;
            out.flush().context("Failed to flush sample row")?;

            totals.samples += 1;
            totals.ops += ops;
            totals.elapsed = elapsed;

            if let Some(kernel) = kernel {
                let snapshot = kernel.snapshot().context("Failed to read kernel counters")?;
                if let Some(prev) = previous {
                    let tick = snapshot.delta_since(&prev);
                    log::debug!(
                        "tick {}: +{} TLB shootdowns, +{} IO bytes",
                        totals.samples,
                        tick.tlb_shootdowns,
                        tick.io_bytes
                    );
                }
                previous = Some(snapshot);
            }

            if elapsed >= self.run_duration {
                cancel.cancel();
                break;
            }
        }

        if let (Some(first), Some(last)) = (baseline, previous) {
            let delta = last.delta_since(&first);
            log::info!(
                "kernel counters over the run: {} TLB shootdowns, {} IO bytes",
                delta.tlb_shootdowns,
                delta.io_bytes
            );
            totals.kernel_delta = Some(delta);
        }

        Ok(totals)
    }
}
