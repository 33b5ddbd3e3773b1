//! Configuration module
//!
//! CLI argument parsing and the resolved run configuration.

pub mod cli;

use crate::Result;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// What each worker does on every iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadMode {
    /// Store the worker's truncated operation count into a random page
    Write,
    /// Load a byte from a random page and fold it into a running sum
    Read,
}

impl WorkloadMode {
    /// Numeric code used in the CSV rows (0 = write, 1 = read)
    pub fn code(&self) -> u8 {
        match self {
            WorkloadMode::Write => 0,
            WorkloadMode::Read => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadMode::Write => "write",
            WorkloadMode::Read => "read",
        }
    }
}

impl fmt::Display for WorkloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "0" | "write" => Ok(WorkloadMode::Write),
            "1" | "read" => Ok(WorkloadMode::Read),
            other => Err(format!(
                "invalid workload mode '{}' (expected 0/write or 1/read)",
                other
            )),
        }
    }
}

/// Resolved benchmark configuration
///
/// Built from the CLI surface; validated once before anything is opened.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target file or block device backing the mapping
    pub target: PathBuf,
    /// Mapping size in GiB
    pub size_gib: u64,
    /// Workload mode
    pub mode: WorkloadMode,
    /// Number of worker threads
    pub threads: usize,
    /// Run duration in seconds
    pub run_secs: u64,
    /// Sampling interval in seconds
    pub interval_secs: u64,
    /// Device-name token for /proc/diskstats IO accounting
    pub device: String,
    /// Single device read via /sys/block/<dev>/stat instead of diskstats
    pub sysfs_device: Option<String>,
    /// Extend a regular-file target to the mapping size before mapping
    pub preallocate: bool,
    /// Optional end-of-run JSON summary path
    pub json_output: Option<PathBuf>,
}

impl Config {
    /// Build a configuration from parsed CLI arguments
    pub fn from_cli(cli: cli::Cli) -> Self {
        Self {
            target: cli.target,
            size_gib: cli.size_gib,
            mode: cli.mode,
            threads: cli.threads,
            run_secs: cli.run_secs,
            interval_secs: cli.interval,
            device: cli.device,
            sysfs_device: cli.sysfs_device,
            preallocate: cli.preallocate,
            json_output: cli.json_output,
        }
    }

    /// Mapping length in bytes
    pub fn mapping_bytes(&self) -> u64 {
        self.size_gib << 30
    }

    /// Configured run duration
    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_secs)
    }

    /// Configured sampling interval
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Validate the configuration
    ///
    /// Runs before any file is opened; every failure here is a setup error.
    pub fn validate(&self) -> Result<()> {
        if self.size_gib == 0 {
            anyhow::bail!("SIZE_GIB must be at least 1");
        }
        if self.size_gib > (u64::MAX >> 30) {
            anyhow::bail!("SIZE_GIB {} is too large to express in bytes", self.size_gib);
        }
        if self.threads == 0 {
            anyhow::bail!("THREADS must be at least 1");
        }
        if self.run_secs == 0 {
            anyhow::bail!("SECONDS must be at least 1");
        }
        if self.interval_secs == 0 {
            anyhow::bail!("--interval must be at least 1");
        }
        if self.device.is_empty() {
            anyhow::bail!("--device must not be empty");
        }
        if let Some(dev) = &self.sysfs_device {
            if dev.is_empty() || dev.contains('/') {
                anyhow::bail!("--sysfs-device must be a bare device name, e.g. nvme0n1");
            }
        }
        Ok(())
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "target:    {}", self.target.display())?;
        writeln!(f, "mapping:   {} GiB", self.size_gib)?;
        writeln!(f, "workload:  random {}s", self.mode)?;
        writeln!(f, "threads:   {}", self.threads)?;
        writeln!(f, "duration:  {}s (sampling every {}s)", self.run_secs, self.interval_secs)?;
        match &self.sysfs_device {
            Some(dev) => write!(f, "io bytes:  /sys/block/{}/stat", dev),
            None => write!(f, "io bytes:  /proc/diskstats, devices matching '{}'", self.device),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            target: PathBuf::from("/dev/nvme0n1"),
            size_gib: 64,
            mode: WorkloadMode::Write,
            threads: 8,
            run_secs: 30,
            interval_secs: 1,
            device: "nvme".to_string(),
            sysfs_device: None,
            preallocate: false,
            json_output: None,
        }
    }

    #[test]
    fn test_workload_mode_from_str() {
        assert_eq!("0".parse::<WorkloadMode>().unwrap(), WorkloadMode::Write);
        assert_eq!("1".parse::<WorkloadMode>().unwrap(), WorkloadMode::Read);
        assert_eq!("write".parse::<WorkloadMode>().unwrap(), WorkloadMode::Write);
        assert_eq!("read".parse::<WorkloadMode>().unwrap(), WorkloadMode::Read);

        assert!("2".parse::<WorkloadMode>().is_err());
        assert!("".parse::<WorkloadMode>().is_err());
        assert!("readwrite".parse::<WorkloadMode>().is_err());
    }

    #[test]
    fn test_workload_mode_codes() {
        assert_eq!(WorkloadMode::Write.code(), 0);
        assert_eq!(WorkloadMode::Read.code(), 1);
    }

    #[test]
    fn test_mapping_bytes() {
        let mut config = base_config();
        config.size_gib = 1;
        assert_eq!(config.mapping_bytes(), 1 << 30);

        config.size_gib = 64;
        assert_eq!(config.mapping_bytes(), 64u64 << 30);
    }

    #[test]
    fn test_validate_accepts_base_config() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = base_config();
        config.size_gib = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.threads = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.run_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_mapping() {
        let mut config = base_config();
        config.size_gib = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_device_filters() {
        let mut config = base_config();
        config.device = String::new();
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.sysfs_device = Some("block/nvme0n1".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_mentions_key_fields() {
        let rendered = base_config().to_string();
        assert!(rendered.contains("/dev/nvme0n1"));
        assert!(rendered.contains("64 GiB"));
        assert!(rendered.contains("random write"));
        assert!(rendered.contains("diskstats"));
    }
}
