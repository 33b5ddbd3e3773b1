//! The shared mapped region
//!
//! One mapping backs the whole benchmark: `PROT_READ | PROT_WRITE`,
//! `MAP_SHARED`, established once before any worker starts and unmapped when
//! the region is dropped. The mapping length is the requested virtual size,
//! independent of how the accesses will land in it.
//!
//! The target may be a regular file or a block device. Regular files report
//! their size through metadata and can optionally be extended to the mapping
//! length; block devices report theirs through the `BLKGETSIZE64` ioctl and
//! are never resized. A backing smaller than the mapping is rejected up
//! front: touching pages past the end of the backing would kill the process
//! with SIGBUS mid-run.
//!
//! All access goes through volatile byte loads/stores, so the compiler
//! performs exactly the accesses the workers issue. Workers hit the region
//! concurrently with no synchronization; the resulting cache-line and TLB
//! traffic is the measured quantity, and the region's contents carry no
//! application-level meaning.

use crate::Result;
use anyhow::Context;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr;

/// Fixed benchmark page size in bytes
pub const PAGE_SIZE: u64 = 4096;

// ioctl request code for getting block device size
const BLKGETSIZE64: libc::c_ulong = 0x80081272;

/// What kind of object backs the mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    RegularFile,
    BlockDevice,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::RegularFile => write!(f, "regular file"),
            TargetKind::BlockDevice => write!(f, "block device"),
        }
    }
}

/// A shared read-write memory mapping over a file or block device
#[derive(Debug)]
pub struct Region {
    /// Mapped address
    addr: *mut u8,
    /// Mapped size in bytes
    len: usize,
    /// Backing object kind, for diagnostics
    kind: TargetKind,
    /// Keeps the descriptor open for the lifetime of the mapping
    _file: File,
}

// Safety: the mapping stays valid until drop, all access goes through
// volatile operations on in-bounds raw pointers, and unsynchronized
// concurrent mutation is the workload being measured, not a logic hazard.
unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Open `path` read-write and map `len` bytes of it, shared
    ///
    /// `preallocate` extends a regular-file target to `len` bytes before
    /// mapping. Block devices have hardware-determined sizes and cannot be
    /// extended; a too-small device is always an error.
    pub fn map(path: &Path, len: u64, preallocate: bool) -> Result<Self> {
        if len == 0 {
            anyhow::bail!("Cannot map a zero-length region");
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open target {}", path.display()))?;

        let (kind, backing) = backing_size(&file)
            .with_context(|| format!("Failed to determine size of {}", path.display()))?;

        if backing < len {
            match kind {
                TargetKind::RegularFile if preallocate => {
                    file.set_len(len).with_context(|| {
                        format!("Failed to extend {} to {} bytes", path.display(), len)
                    })?;
                }
                TargetKind::RegularFile => {
                    anyhow::bail!(
                        "target {} is {} bytes, smaller than the requested {} byte mapping \
                         (pass --preallocate to extend it)",
                        path.display(),
                        backing,
                        len
                    );
                }
                TargetKind::BlockDevice => {
                    anyhow::bail!(
                        "block device {} is {} bytes, smaller than the requested {} byte mapping",
                        path.display(),
                        backing,
                        len
                    );
                }
            }
        }

        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len as usize,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };

        if addr == libc::MAP_FAILED {
            let err = std::io::Error::last_os_error();
            return Err(err).context(format!(
                "mmap failed: {}, size={}",
                path.display(),
                len
            ));
        }

        Ok(Self {
            addr: addr as *mut u8,
            len: len as usize,
            kind,
            _file: file,
        })
    }

    /// Mapping length in bytes
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the mapping has zero length (never, by construction)
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of whole 4096-byte pages in the mapping
    pub fn page_count(&self) -> u64 {
        self.len as u64 / PAGE_SIZE
    }

    /// Kind of object backing the mapping
    pub fn target_kind(&self) -> TargetKind {
        self.kind
    }

    /// Store one byte at `offset`
    ///
    /// Volatile, so the store happens exactly as issued. `offset` must be
    /// inside the mapping; the hot loop guarantees it by construction.
    #[inline(always)]
    pub fn write_byte(&self, offset: u64, value: u8) {
        debug_assert!(offset < self.len as u64);
        unsafe { ptr::write_volatile(self.addr.add(offset as usize), value) }
    }

    /// Load one byte from `offset`
    #[inline(always)]
    pub fn read_byte(&self, offset: u64) -> u8 {
        debug_assert!(offset < self.len as u64);
        unsafe { ptr::read_volatile(self.addr.add(offset as usize)) }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        let result = unsafe { libc::munmap(self.addr as *mut libc::c_void, self.len) };
        if result < 0 {
            let err = std::io::Error::last_os_error();
            log::warn!("munmap of {} bytes failed: {}", self.len, err);
        }
    }
}

/// Backing kind and size for an open target
fn backing_size(file: &File) -> Result<(TargetKind, u64)> {
    let meta = file.metadata().context("fstat failed")?;

    if meta.file_type().is_block_device() {
        let mut size: u64 = 0;
        let result = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64, &mut size) };
        if result < 0 {
            let err = std::io::Error::last_os_error();
            return Err(err).context("BLKGETSIZE64 ioctl failed");
        }
        Ok((TargetKind::BlockDevice, size))
    } else {
        Ok((TargetKind::RegularFile, meta.len()))
    }
}
