//! JIT symbol maps (`/tmp/perf-<pid>.map`)
//!
//! Runtimes with a JIT (Node.js with `--perf-basic-prof`, the JVM with
//! perf-map-agent, ...) write one line per compiled function:
//! `<hex start> <hex size> <name>`. The file grows while the process runs, so
//! it is re-read periodically.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::domain::Pid;

/// Minimum time between two reloads of the perf map
pub const RELOAD_INTERVAL: Duration = Duration::from_secs(5);

/// A JIT-compiled function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JitSymbol {
    pub start: u64,
    pub end: u64,
    pub name: String,
}

/// Parse perf map contents, sorted by start address
#[must_use]
pub fn parse_perf_map(contents: &str) -> Vec<JitSymbol> {
    let mut symbols: Vec<JitSymbol> = contents
        .lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, ' ');
            let start = u64::from_str_radix(parts.next()?.trim_start_matches("0x"), 16).ok()?;
            let size = u64::from_str_radix(parts.next()?.trim_start_matches("0x"), 16).ok()?;
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(JitSymbol { start, end: start.saturating_add(size), name: name.to_string() })
        })
        .collect();
    symbols.sort_by_key(|s| s.start);
    symbols
}

/// JIT symbols of one process, reloaded on demand
#[derive(Debug)]
pub struct PerfMap {
    path: PathBuf,
    symbols: Vec<JitSymbol>,
    loaded_at: Option<Instant>,
}

impl PerfMap {
    /// Perf map of `pid` at the conventional location
    #[must_use]
    pub fn for_process(pid: Pid) -> Self {
        Self::from_path(format!("/tmp/perf-{}.map", pid.0))
    }

    /// Perf map at an explicit path. Nothing is read until [`PerfMap::reload`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), symbols: Vec::new(), loaded_at: None }
    }

    /// Re-read the file. A missing file leaves the map empty.
    pub fn reload(&mut self) {
        self.symbols = match fs::read_to_string(&self.path) {
            Ok(contents) => parse_perf_map(&contents),
            Err(e) => {
                debug!("No JIT symbols at {}: {e}", self.path.display());
                Vec::new()
            }
        };
        self.loaded_at = Some(Instant::now());
    }

    /// Reload if the last load is older than `interval`. Returns true if reloaded.
    pub fn reload_if_stale(&mut self, interval: Duration) -> bool {
        if self.loaded_at.is_some_and(|t| t.elapsed() < interval) {
            return false;
        }
        self.reload();
        true
    }

    /// Find the JIT function containing `addr`
    #[must_use]
    pub fn lookup(&self, addr: u64) -> Option<&JitSymbol> {
        let idx = self.symbols.partition_point(|s| s.start <= addr);
        let candidate = self.symbols.get(idx.checked_sub(1)?)?;
        (addr < candidate.end).then_some(candidate)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PERF_MAP: &str = "\
3fbd8a2000 40 LazyCompile:*handler /var/www/server.js
3fbd8a1000 250 LazyCompile:*app.get /var/www/app.js
garbage
3fbd8a3000 zz Broken
";

    #[test]
    fn test_parse_sorts_and_skips_bad_lines() {
        let symbols = parse_perf_map(PERF_MAP);

        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].name, "LazyCompile:*app.get /var/www/app.js");
        assert_eq!(symbols[0].end, 0x3f_bd8a_1250);
    }

    #[test]
    fn test_lookup_respects_symbol_bounds() {
        let mut map = PerfMap::from_path("/nonexistent");
        map.symbols = parse_perf_map(PERF_MAP);

        assert_eq!(map.lookup(0x3f_bd8a_1000).map(|s| s.start), Some(0x3f_bd8a_1000));
        assert_eq!(map.lookup(0x3f_bd8a_124f).map(|s| s.start), Some(0x3f_bd8a_1000));
        assert!(map.lookup(0x3f_bd8a_1250).is_none());
        assert!(map.lookup(0x3f_bd8a_0fff).is_none());
        assert_eq!(map.lookup(0x3f_bd8a_2010).map(|s| s.start), Some(0x3f_bd8a_2000));
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let mut map = PerfMap::from_path("/nonexistent/perf-1.map");
        map.reload();
        assert!(map.is_empty());
    }

    #[test]
    fn test_reload_is_throttled() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1000 10 first").unwrap();

        let mut map = PerfMap::from_path(file.path());
        assert!(map.reload_if_stale(RELOAD_INTERVAL));
        assert_eq!(map.len(), 1);

        writeln!(file, "2000 10 second").unwrap();
        assert!(!map.reload_if_stale(RELOAD_INTERVAL));
        assert_eq!(map.len(), 1);

        assert!(map.reload_if_stale(Duration::ZERO));
        assert_eq!(map.len(), 2);
    }
}
