//! Kernel-side cost counters
//!
//! The benchmark correlates its throughput series with two cumulative
//! counters the kernel exposes as text:
//!
//! - **TLB shootdowns**: the `/proc/interrupts` row labelled `TLB:`, one
//!   numeric field per CPU, summed across CPUs.
//! - **Device IO bytes**: either `/proc/diskstats` (rows whose device name
//!   contains a filter token; the sectors-read field, third numeric column
//!   after the name) or a single device's `/sys/block/<dev>/stat` (third
//!   field). Sector counts convert to bytes at a fixed 512 bytes/sector
//!   regardless of the device's logical block size, matching the kernel's
//!   own accounting unit.
//!
//! Parsing is separated from file access: the `parse_*` functions take text,
//! the readers own paths and do the IO. Failure to *open* a source is fatal
//! to the run (a benchmark silently reporting zero kernel activity would be
//! worse than one that refuses to start); a source that opens but contains
//! no matching row legitimately reads as zero.

use crate::Result;
use anyhow::Context;
use std::fs;
use std::path::PathBuf;

/// Bytes per sector in kernel disk accounting
pub const SECTOR_SIZE: u64 = 512;

const PROC_INTERRUPTS: &str = "/proc/interrupts";
const PROC_DISKSTATS: &str = "/proc/diskstats";

/// Sum the per-CPU fields of the TLB-shootdown row
///
/// Takes the first line containing `TLB`, skips the label, and sums every
/// field that parses as an integer (the trailing description words do not).
/// Returns 0 when no such row exists, as on kernels that do not expose one.
pub fn parse_tlb_shootdowns(interrupts: &str) -> u64 {
    for line in interrupts.lines() {
        if line.contains("TLB") {
            return line
                .split_whitespace()
                .skip(1)
                .filter_map(|field| field.parse::<u64>().ok())
                .sum();
        }
    }
    0
}

/// Sum sectors read across matching `/proc/diskstats` rows
///
/// A row matches when its device-name field (third column) contains
/// `device`. The sectors-read count is the third field after the name:
/// `major minor name reads-completed reads-merged sectors-read ...`.
pub fn parse_diskstats_sectors(diskstats: &str, device: &str) -> u64 {
    let mut sectors = 0u64;
    for line in diskstats.lines() {
        let mut fields = line.split_whitespace();
        let name = match fields.nth(2) {
            Some(name) => name,
            None => continue,
        };
        if !name.contains(device) {
            continue;
        }
        if let Some(count) = fields.nth(2).and_then(|f| f.parse::<u64>().ok()) {
            sectors += count;
        }
    }
    sectors
}

/// Sectors read from a `/sys/block/<dev>/stat` file
///
/// The file is a single line; sectors read is the third field.
pub fn parse_block_stat_sectors(stat: &str) -> u64 {
    stat.split_whitespace()
        .nth(2)
        .and_then(|f| f.parse::<u64>().ok())
        .unwrap_or(0)
}

/// Reader for the cumulative TLB-shootdown interrupt count
#[derive(Debug, Clone)]
pub struct TlbShootdownReader {
    path: PathBuf,
}

impl TlbShootdownReader {
    /// Reader over the live `/proc/interrupts`
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(PROC_INTERRUPTS),
        }
    }

    /// Reader over an alternate interrupts table (tests, chroots)
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cumulative shootdown count, summed across CPUs
    pub fn read(&self) -> Result<u64> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(parse_tlb_shootdowns(&text))
    }
}

impl Default for TlbShootdownReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Reader for cumulative device IO bytes
///
/// Two sources: the aggregate `/proc/diskstats` filtered by a device-name
/// token, or one device's `/sys/block/<dev>/stat`.
#[derive(Debug, Clone)]
pub enum IoBytesReader {
    Diskstats { path: PathBuf, device: String },
    BlockStat { path: PathBuf },
}

impl IoBytesReader {
    /// Sum over `/proc/diskstats` rows whose name contains `device`
    pub fn diskstats(device: &str) -> Self {
        Self::diskstats_at(PROC_DISKSTATS, device)
    }

    /// Diskstats reader over an alternate table (tests)
    pub fn diskstats_at(path: impl Into<PathBuf>, device: &str) -> Self {
        Self::Diskstats {
            path: path.into(),
            device: device.to_string(),
        }
    }

    /// Single-device reader over `/sys/block/<device>/stat`
    pub fn sysfs(device: &str) -> Self {
        Self::BlockStat {
            path: PathBuf::from(format!("/sys/block/{}/stat", device)),
        }
    }

    /// Single-device reader over an alternate stat file (tests)
    pub fn sysfs_at(path: impl Into<PathBuf>) -> Self {
        Self::BlockStat { path: path.into() }
    }

    /// Cumulative bytes read by the selected device(s)
    pub fn read(&self) -> Result<u64> {
        let sectors = match self {
            IoBytesReader::Diskstats { path, device } => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                parse_diskstats_sectors(&text, device)
            }
            IoBytesReader::BlockStat { path } => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                parse_block_stat_sectors(&text)
            }
        };
        Ok(sectors * SECTOR_SIZE)
    }
}

/// One reading of both kernel counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelSnapshot {
    pub tlb_shootdowns: u64,
    pub io_bytes: u64,
}

impl KernelSnapshot {
    /// Per-counter difference against an earlier snapshot
    ///
    /// Saturating: the counters are monotonic in the kernel, but a counter
    /// reset (device removal, CPU hotplug) must not wrap the report.
    pub fn delta_since(&self, earlier: &KernelSnapshot) -> KernelSnapshot {
        KernelSnapshot {
            tlb_shootdowns: self.tlb_shootdowns.saturating_sub(earlier.tlb_shootdowns),
            io_bytes: self.io_bytes.saturating_sub(earlier.io_bytes),
        }
    }
}

/// Both counter readers bundled for the sampler
#[derive(Debug, Clone)]
pub struct KernelCounters {
    tlb: TlbShootdownReader,
    io: IoBytesReader,
}

impl KernelCounters {
    pub fn new(tlb: TlbShootdownReader, io: IoBytesReader) -> Self {
        Self { tlb, io }
    }

    /// Live readers: `/proc/interrupts` plus the configured IO source
    pub fn from_device(device: &str, sysfs_device: Option<&str>) -> Self {
        let io = match sysfs_device {
            Some(dev) => IoBytesReader::sysfs(dev),
            None => IoBytesReader::diskstats(device),
        };
        Self::new(TlbShootdownReader::new(), io)
    }

    /// Read both counters
    pub fn snapshot(&self) -> Result<KernelSnapshot> {
        Ok(KernelSnapshot {
            tlb_shootdowns: self.tlb.read()?,
            io_bytes: self.io.read()?,
        })
    }
}
