//! Memory mapping utilities for process address space analysis
//!
//! Parses `/proc/<pid>/maps` into regions so a runtime address can be traced
//! back to the file it was loaded from and its offset inside that file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{Pid, TracerError};

/// One mapping of a file (or pseudo file such as `[vdso]`) in a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRegion {
    pub start: u64,
    pub end: u64,
    /// Offset of `start` within the mapped file
    pub offset: u64,
    pub path: PathBuf,
}

impl MemoryRegion {
    /// Check if an address falls within this region
    #[must_use]
    pub fn contains(&self, addr: u64) -> bool {
        addr >= self.start && addr < self.end
    }

    /// Offset of `addr` inside the mapped file
    #[must_use]
    pub fn file_offset(&self, addr: u64) -> u64 {
        addr - self.start + self.offset
    }

    /// True for regions backed by a file on disk (not `[heap]`, `[vdso]`, ...)
    #[must_use]
    pub fn is_file_backed(&self) -> bool {
        self.path.is_absolute()
    }

    /// Short name for display, e.g. `libc.so.6`
    #[must_use]
    pub fn object_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Parse the contents of a `/proc/<pid>/maps` file
///
/// Line format: `start-end perms offset dev inode pathname`. Anonymous
/// mappings (no pathname) and malformed lines are skipped.
#[must_use]
pub fn parse_memory_maps(maps: &str) -> Vec<MemoryRegion> {
    maps.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<MemoryRegion> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let _perms = fields.next()?;
    let offset = fields.next()?;
    let _dev = fields.next()?;
    let _inode = fields.next()?;
    // Pathnames may contain spaces; take the rest of the line
    let path = fields.collect::<Vec<_>>().join(" ");
    if path.is_empty() {
        return None;
    }

    let (start, end) = range.split_once('-')?;
    Some(MemoryRegion {
        start: u64::from_str_radix(start, 16).ok()?,
        end: u64::from_str_radix(end, 16).ok()?,
        offset: u64::from_str_radix(offset, 16).ok()?,
        path: PathBuf::from(path),
    })
}

/// Read and parse `/proc/<pid>/maps`
///
/// # Errors
/// Returns [`TracerError::MemoryMapsParseFailed`] if the file cannot be read
pub fn read_memory_maps(pid: Pid) -> Result<Vec<MemoryRegion>, TracerError> {
    let maps_path = format!("/proc/{}/maps", pid.0);
    let maps = fs::read_to_string(Path::new(&maps_path))
        .map_err(|_| TracerError::MemoryMapsParseFailed(pid))?;
    Ok(parse_memory_maps(&maps))
}
