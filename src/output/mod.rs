//! End-of-run JSON summary
//!
//! With `--json-output <PATH>` the benchmark writes one JSON document after
//! the workers join: run identity (timestamp, hostname), the resolved
//! configuration, and the run totals including the kernel counter deltas the
//! CSV stream never carries. Without the flag nothing is written; the CSV
//! stream on stdout is always the primary artifact.

use crate::config::Config;
use crate::kernel::KernelSnapshot;
use crate::sampler::RunTotals;
use crate::util::time::ops_per_sec;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// The complete run summary document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run end time, RFC 3339
    pub timestamp: String,
    /// Host the run executed on
    pub hostname: String,
    /// Target file or block device
    pub target: String,
    /// Mapping size in GiB
    pub mapping_gib: u64,
    /// Workload mode name
    pub workload: String,
    /// Numeric mode code, as in the CSV rows
    pub workload_code: u8,
    /// Worker thread count
    pub threads: usize,
    /// Requested run duration in seconds
    pub requested_secs: u64,
    /// Wall-clock seconds from run start to the final drain
    pub actual_secs: f64,
    /// Number of sample rows emitted
    pub samples: u64,
    /// Total operations, including the post-final-tick remainder
    pub total_ops: u64,
    /// Average operations per second over the actual duration
    pub avg_ops_per_sec: f64,
    /// Kernel cost counters over the run, when they were read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel: Option<KernelDeltas>,
    /// Rounds completed by the background CPU loader
    pub cpu_loader_rounds: u64,
}

/// Cumulative kernel counter deltas over the run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KernelDeltas {
    pub tlb_shootdowns: u64,
    pub io_bytes: u64,
}

impl From<KernelSnapshot> for KernelDeltas {
    fn from(delta: KernelSnapshot) -> Self {
        Self {
            tlb_shootdowns: delta.tlb_shootdowns,
            io_bytes: delta.io_bytes,
        }
    }
}

impl RunSummary {
    /// Assemble the summary from the configuration and run totals
    ///
    /// `remainder_ops` is the final drain performed after the workers join,
    /// covering operations between the last tick and flag observation.
    pub fn new(
        config: &Config,
        totals: &RunTotals,
        remainder_ops: u64,
        cpu_loader_rounds: u64,
    ) -> Self {
        let total_ops = totals.ops + remainder_ops;
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            hostname: hostname::get()
                .map(|h| h.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "unknown".to_string()),
            target: config.target.display().to_string(),
            mapping_gib: config.size_gib,
            workload: config.mode.to_string(),
            workload_code: config.mode.code(),
            threads: config.threads,
            requested_secs: config.run_secs,
            actual_secs: totals.elapsed.as_secs_f64(),
            samples: totals.samples,
            total_ops,
            avg_ops_per_sec: ops_per_sec(total_ops, totals.elapsed),
            kernel: totals.kernel_delta.map(KernelDeltas::from),
            cpu_loader_rounds,
        }
    }

    /// Write the summary as pretty-printed JSON
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create JSON summary {}", path.display()))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("Failed to write JSON summary {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkloadMode;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn test_config() -> Config {
        Config {
            target: PathBuf::from("/dev/nvme0n1"),
            size_gib: 32,
            mode: WorkloadMode::Read,
            threads: 8,
            run_secs: 30,
            interval_secs: 1,
            device: "nvme".to_string(),
            sysfs_device: None,
            preallocate: false,
            json_output: None,
        }
    }

    fn test_totals() -> RunTotals {
        RunTotals {
            samples: 30,
            ops: 2_999_000,
            elapsed: Duration::from_secs(30),
            kernel_delta: Some(KernelSnapshot {
                tlb_shootdowns: 12345,
                io_bytes: 67890 * 512,
            }),
        }
    }

    #[test]
    fn test_summary_totals_include_remainder() {
        let summary = RunSummary::new(&test_config(), &test_totals(), 1000, 42);

        assert_eq!(summary.total_ops, 3_000_000);
        assert_eq!(summary.avg_ops_per_sec, 100_000.0);
        assert_eq!(summary.samples, 30);
        assert_eq!(summary.cpu_loader_rounds, 42);
        assert_eq!(summary.workload, "read");
        assert_eq!(summary.workload_code, 1);

        let kernel = summary.kernel.unwrap();
        assert_eq!(kernel.tlb_shootdowns, 12345);
        assert_eq!(kernel.io_bytes, 67890 * 512);
    }

    #[test]
    fn test_summary_without_kernel_counters() {
        let totals = RunTotals {
            kernel_delta: None,
            ..test_totals()
        };
        let summary = RunSummary::new(&test_config(), &totals, 0, 0);

        let json = serde_json::to_string(&summary).unwrap();
        // Absent counters are omitted, not serialized as null.
        assert!(!json.contains("kernel"));
    }

    #[test]
    fn test_summary_serde_round_trip() {
        let summary = RunSummary::new(&test_config(), &test_totals(), 500, 7);

        let json = serde_json::to_string_pretty(&summary).unwrap();
        let parsed: RunSummary = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.total_ops, summary.total_ops);
        assert_eq!(parsed.threads, summary.threads);
        assert_eq!(parsed.workload_code, summary.workload_code);
        assert_eq!(parsed.kernel.unwrap().tlb_shootdowns, 12345);
    }

    #[test]
    fn test_summary_write_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.json");

        let summary = RunSummary::new(&test_config(), &test_totals(), 0, 3);
        summary.write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: RunSummary = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.target, "/dev/nvme0n1");
        assert_eq!(parsed.mapping_gib, 32);
    }

    #[test]
    fn test_summary_write_failure_has_context() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir").join("summary.json");

        let summary = RunSummary::new(&test_config(), &test_totals(), 0, 0);
        let err = summary.write_to(&path).unwrap_err();
        assert!(err.to_string().contains("summary"));
    }
}
