//! CLI argument parsing using clap
//!
//! The surface is five positional arguments plus a handful of optional
//! flags. clap owns the missing-argument contract: fewer than five
//! positionals prints usage on stderr and exits non-zero before any file is
//! touched.

use crate::config::WorkloadMode;
use clap::Parser;
use std::path::PathBuf;

/// mmapbench - Memory-mapped IO micro-benchmark
///
/// Maps SIZE_GIB gibibytes of PATH and hammers it with THREADS worker
/// threads doing uniformly random page-aligned accesses for SECONDS
/// seconds, printing one CSV throughput row per sampling interval on
/// stdout. Diagnostics and kernel counter deltas go to stderr.
#[derive(Parser, Debug)]
#[command(name = "mmapbench")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Target file or block device to map
    #[arg(value_name = "PATH")]
    pub target: PathBuf,

    /// Size of the mapping in GiB
    #[arg(value_name = "SIZE_GIB")]
    pub size_gib: u64,

    /// Workload mode: 0 = random writes, 1 = random reads
    #[arg(value_name = "MODE", value_parser = parse_workload_mode)]
    pub mode: WorkloadMode,

    /// Number of worker threads
    #[arg(value_name = "THREADS")]
    pub threads: usize,

    /// Run duration in seconds
    #[arg(value_name = "SECONDS")]
    pub run_secs: u64,

    // === Sampling Options ===
    /// Sampling interval in seconds
    #[arg(long, default_value = "1")]
    pub interval: u64,

    // === Kernel Counter Options ===
    /// Device-name token summed in /proc/diskstats IO accounting
    #[arg(long, default_value = "nvme")]
    pub device: String,

    /// Read IO bytes from /sys/block/<DEV>/stat instead of /proc/diskstats
    #[arg(long, value_name = "DEV")]
    pub sysfs_device: Option<String>,

    // === Target Options ===
    /// Extend a regular-file target to the mapping size before mapping
    #[arg(long)]
    pub preallocate: bool,

    // === Output Options ===
    /// Write an end-of-run JSON summary to this path
    #[arg(long, value_name = "PATH")]
    pub json_output: Option<PathBuf>,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_workload_mode(arg: &str) -> std::result::Result<WorkloadMode, String> {
    arg.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_parse_full_positional_surface() {
        let cli =
            Cli::try_parse_from(["mmapbench", "/dev/nvme0n1", "64", "0", "8", "30"]).unwrap();

        assert_eq!(cli.target, PathBuf::from("/dev/nvme0n1"));
        assert_eq!(cli.size_gib, 64);
        assert_eq!(cli.mode, WorkloadMode::Write);
        assert_eq!(cli.threads, 8);
        assert_eq!(cli.run_secs, 30);

        // Flag defaults
        assert_eq!(cli.interval, 1);
        assert_eq!(cli.device, "nvme");
        assert_eq!(cli.sysfs_device, None);
        assert!(!cli.preallocate);
        assert_eq!(cli.json_output, None);
    }

    #[test]
    fn test_parse_mode_aliases() {
        let cli = Cli::try_parse_from(["mmapbench", "/tmp/f", "1", "1", "4", "3"]).unwrap();
        assert_eq!(cli.mode, WorkloadMode::Read);

        let cli = Cli::try_parse_from(["mmapbench", "/tmp/f", "1", "read", "4", "3"]).unwrap();
        assert_eq!(cli.mode, WorkloadMode::Read);

        let cli = Cli::try_parse_from(["mmapbench", "/tmp/f", "1", "write", "4", "3"]).unwrap();
        assert_eq!(cli.mode, WorkloadMode::Write);
    }

    #[test]
    fn test_parse_rejects_invalid_mode() {
        let err = Cli::try_parse_from(["mmapbench", "/tmp/f", "1", "7", "4", "3"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_missing_positionals_is_usage_error() {
        // Too few arguments: usage goes to the error stream, exit is non-zero,
        // and nothing is opened because parsing happens before any IO.
        let err = Cli::try_parse_from(["mmapbench", "/tmp/f", "1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.use_stderr());
        assert!(err.to_string().contains("Usage"));
    }

    #[test]
    fn test_no_arguments_is_usage_error() {
        let err = Cli::try_parse_from(["mmapbench"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert!(err.use_stderr());
    }

    #[test]
    fn test_parse_optional_flags() {
        let cli = Cli::try_parse_from([
            "mmapbench",
            "/data/bench.dat",
            "4",
            "1",
            "16",
            "60",
            "--interval",
            "5",
            "--device",
            "sda",
            "--preallocate",
            "--json-output",
            "/tmp/summary.json",
        ])
        .unwrap();

        assert_eq!(cli.interval, 5);
        assert_eq!(cli.device, "sda");
        assert!(cli.preallocate);
        assert_eq!(cli.json_output, Some(PathBuf::from("/tmp/summary.json")));
    }

    #[test]
    fn test_parse_sysfs_device() {
        let cli = Cli::try_parse_from([
            "mmapbench",
            "/dev/nvme1n1",
            "8",
            "0",
            "4",
            "10",
            "--sysfs-device",
            "nvme1n1",
        ])
        .unwrap();

        assert_eq!(cli.sysfs_device, Some("nvme1n1".to_string()));
    }
}
