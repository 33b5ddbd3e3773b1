//! Per-worker operation counters
//!
//! Lock-free, cache-line aligned counters sized for one writer per counter.
//! Each worker owns one [`WorkerCounters`] pair (operation count plus the
//! read-byte sum that keeps read loads honest); the sampler drains the
//! operation counts once per tick with an atomic exchange-to-zero.
//!
//! Key properties:
//!
//! - **Single writer**: only the owning worker increments its counters, so
//!   relaxed atomics suffice for visibility to the sampler
//! - **Cache-line alignment**: prevents false sharing between adjacent
//!   workers' counters
//! - **Exact drains**: exchange-to-zero means no operation is lost or counted
//!   twice across consecutive ticks
//! - **Pre-allocated**: the whole [`CounterSet`] is built before any worker
//!   spawns; the drain is a plain iteration, no registration involved
//!
//! # Example
//!
//! ```
//! use mmapbench::stats::CounterSet;
//!
//! let set = CounterSet::new(2);
//! let c0 = set.handle(0);
//! let c1 = set.handle(1);
//!
//! c0.record_write();
//! c0.record_write();
//! c1.record_read(0x7f);
//!
//! assert_eq!(set.drain_ops(), 3);
//! assert_eq!(set.drain_ops(), 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache-line aligned atomic counter to prevent false sharing
///
/// On most modern CPUs, cache lines are 64 bytes. When multiple threads
/// update adjacent memory locations, the entire cache line bounces between
/// cores (false sharing). Aligning each counter to a cache-line boundary and
/// padding to 64 bytes gives each one its own line.
///
/// # Memory Layout
///
/// ```text
/// [value: 8 bytes][padding: 56 bytes] = 64 bytes total
/// ```
#[repr(align(64))]
#[derive(Debug)]
pub struct AlignedCounter {
    value: AtomicU64,
    _padding: [u8; 56],
}

impl AlignedCounter {
    /// Create a new counter with initial value 0
    pub fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
            _padding: [0; 56],
        }
    }

    /// Increment the counter by the specified amount
    ///
    /// Uses `Ordering::Relaxed`; no ordering between counters is needed.
    #[inline]
    pub fn add(&self, val: u64) {
        self.value.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment by one, returning the value the counter held before
    ///
    /// The prior value is what write-mode workers stamp into the page.
    #[inline]
    pub fn incr(&self) -> u64 {
        self.value.fetch_add(1, Ordering::Relaxed)
    }

    /// Get the current value of the counter
    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Atomically reset the counter to zero, returning the drained value
    ///
    /// This is the sampler's side of the drain contract: increments that
    /// land before the swap are returned here, increments that land after
    /// are reported by the next drain. Nothing is lost in between.
    #[inline]
    pub fn take(&self) -> u64 {
        self.value.swap(0, Ordering::Relaxed)
    }
}

impl Default for AlignedCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters owned by a single worker thread
///
/// `ops` counts memory accesses and is drained each tick. `sum` accumulates
/// the bytes loaded by read-mode workers; it is never reported, it exists so
/// every load feeds a live data dependency and cannot be elided.
#[derive(Debug, Default)]
pub struct WorkerCounters {
    ops: AlignedCounter,
    sum: AlignedCounter,
}

impl WorkerCounters {
    /// Create a zeroed counter pair
    pub fn new() -> Self {
        Self {
            ops: AlignedCounter::new(),
            sum: AlignedCounter::new(),
        }
    }

    /// Count one write access, returning the operation count it had before
    #[inline]
    pub fn record_write(&self) -> u64 {
        self.ops.incr()
    }

    /// Count one read access, folding the loaded byte into the running sum
    #[inline]
    pub fn record_read(&self, byte: u8) {
        self.sum.add(byte as u64);
        self.ops.incr();
    }

    /// Current (undrained) operation count
    pub fn ops(&self) -> u64 {
        self.ops.get()
    }

    /// Running sum of bytes loaded by read-mode accesses
    pub fn read_sum(&self) -> u64 {
        self.sum.get()
    }

    /// Drain the operation count, resetting it to zero
    #[inline]
    pub fn take_ops(&self) -> u64 {
        self.ops.take()
    }
}

/// Pre-allocated collection of per-worker counters
///
/// Built once, before any worker spawns, with one entry per worker identity.
/// Workers receive their own `Arc<WorkerCounters>` via [`CounterSet::handle`];
/// the sampler iterates the fixed vector on every drain. A worker that has
/// not performed any operation yet simply contributes zero.
#[derive(Debug)]
pub struct CounterSet {
    counters: Vec<Arc<WorkerCounters>>,
}

impl CounterSet {
    /// Create a set with `workers` zeroed counter pairs
    pub fn new(workers: usize) -> Self {
        Self {
            counters: (0..workers).map(|_| Arc::new(WorkerCounters::new())).collect(),
        }
    }

    /// Number of worker slots
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// True when the set holds no counters
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Counter handle for the worker at `index`
    ///
    /// Indexing past the pre-allocated set is a programming error and panics.
    pub fn handle(&self, index: usize) -> Arc<WorkerCounters> {
        Arc::clone(&self.counters[index])
    }

    /// Drain every worker's operation count, returning the interval total
    ///
    /// Called only by the sampler. Each counter is individually exchanged to
    /// zero; combined with single-writer increments this makes consecutive
    /// drains partition the operation stream exactly.
    pub fn drain_ops(&self) -> u64 {
        self.counters.iter().map(|c| c.take_ops()).sum()
    }

    /// Sum of all workers' read-byte accumulators
    pub fn read_sum(&self) -> u64 {
        self.counters.iter().map(|c| c.read_sum()).sum()
    }
}
