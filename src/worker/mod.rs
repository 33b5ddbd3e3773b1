//! Worker thread implementation
//!
//! A worker is the benchmark's execution unit: a tight synchronous loop that
//! performs one page-aligned memory access per iteration against the shared
//! mapping. Each worker owns its RNG and its counter pair; the region and
//! the cancellation token are shared. There is no retry and no error path in
//! the loop: the region is validated before spawn, and a fault surfacing
//! mid-access kills the process by design.
//!
//! # Architecture
//!
//! - **Region**: the shared mapping, accessed through volatile byte ops
//! - **UniformPageDistribution**: per-worker page index stream
//! - **WorkerCounters**: per-worker operation count, drained by the sampler
//! - **CancelToken**: polled once per iteration; observing it ends the loop
//!
//! # Example
//!
//! ```no_run
//! use mmapbench::config::WorkloadMode;
//! use mmapbench::region::Region;
//! use mmapbench::stats::CounterSet;
//! use mmapbench::util::cancel::CancelToken;
//! use mmapbench::worker::WorkerPool;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let region = Arc::new(Region::map(Path::new("/dev/nvme0n1"), 1 << 30, false)?);
//! let counters = CounterSet::new(4);
//! let cancel = CancelToken::new();
//!
//! let pool = WorkerPool::spawn(WorkloadMode::Write, &region, &counters, &cancel)?;
//! // ... sample for a while ...
//! cancel.cancel();
//! pool.join()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::WorkloadMode;
use crate::distribution::UniformPageDistribution;
use crate::region::{Region, PAGE_SIZE};
use crate::stats::{CounterSet, WorkerCounters};
use crate::util::cancel::CancelToken;
use crate::Result;
use anyhow::Context;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A single benchmark worker
pub struct Worker {
    mode: WorkloadMode,
    region: Arc<Region>,
    counters: Arc<WorkerCounters>,
    pages: UniformPageDistribution,
    cancel: CancelToken,
}

impl Worker {
    /// Create a worker with an entropy-seeded offset stream
    pub fn new(
        mode: WorkloadMode,
        region: Arc<Region>,
        counters: Arc<WorkerCounters>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            mode,
            region,
            counters,
            pages: UniformPageDistribution::new(),
            cancel,
        }
    }

    /// Create a worker with a deterministic offset stream
    ///
    /// Useful for reproducible tests.
    pub fn with_seed(
        mode: WorkloadMode,
        region: Arc<Region>,
        counters: Arc<WorkerCounters>,
        cancel: CancelToken,
        seed: u64,
    ) -> Self {
        Self {
            mode,
            region,
            counters,
            pages: UniformPageDistribution::with_seed(seed),
            cancel,
        }
    }

    /// Run the hot loop until the cancellation token is raised
    ///
    /// The token is polled before every access, so a worker ends within one
    /// iteration of the flag becoming visible.
    pub fn run(mut self) {
        let num_pages = self.region.page_count();
        match self.mode {
            WorkloadMode::Write => self.run_writes(num_pages),
            WorkloadMode::Read => self.run_reads(num_pages),
        }
    }

    /// Store the truncated operation count into one random page per iteration
    fn run_writes(&mut self, num_pages: u64) {
        while !self.cancel.is_cancelled() {
            let offset = self.pages.next_page(num_pages) * PAGE_SIZE;
            let count = self.counters.record_write();
            self.region.write_byte(offset, count as u8);
        }
    }

    /// Load a byte from one random page per iteration, feeding the sum
    fn run_reads(&mut self, num_pages: u64) {
        while !self.cancel.is_cancelled() {
            let offset = self.pages.next_page(num_pages) * PAGE_SIZE;
            let byte = self.region.read_byte(offset);
            self.counters.record_read(byte);
        }
    }
}

/// Handles to a set of spawned workers
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn one worker per counter slot in `counters`
    ///
    /// The counter set is the single source of the worker count: worker `i`
    /// is handed `counters.handle(i)`. All workers share `region` and poll
    /// the same `cancel` token.
    pub fn spawn(
        mode: WorkloadMode,
        region: &Arc<Region>,
        counters: &CounterSet,
        cancel: &CancelToken,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(counters.len());
        for id in 0..counters.len() {
            let worker = Worker::new(
                mode,
                Arc::clone(region),
                counters.handle(id),
                cancel.clone(),
            );
            let handle = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker.run())
                .with_context(|| format!("Failed to spawn worker {}", id))?;
            handles.push(handle);
        }
        Ok(Self { handles })
    }

    /// Number of spawned workers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// True when no workers were spawned
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Block until every worker has terminated
    pub fn join(self) -> Result<()> {
        for (id, handle) in self.handles.into_iter().enumerate() {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("worker {} panicked", id))?;
        }
        Ok(())
    }
}
