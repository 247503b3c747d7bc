//! Wall-clock rendering of probe timestamps
//!
//! The probe stamps records with `bpf_ktime_get_ns`, i.e. `CLOCK_MONOTONIC`.
//! The boot instant is computed once as `now - CLOCK_MONOTONIC` and added to
//! every timestamp. Suspend time is not accounted for.

use anyhow::{bail, Result};
use chrono::{DateTime, Local, TimeDelta};
use std::time::Duration;

/// Converts monotonic nanoseconds to local wall-clock time
#[derive(Debug, Clone, Copy)]
pub struct BootClock {
    boot: DateTime<Local>,
}

impl BootClock {
    /// Capture the boot instant of the running system
    ///
    /// # Errors
    /// Returns an error if `CLOCK_MONOTONIC` cannot be read
    pub fn capture() -> Result<Self> {
        let uptime = TimeDelta::from_std(monotonic_now()?)?;
        Ok(Self { boot: Local::now() - uptime })
    }

    /// Clock with a known boot instant
    #[must_use]
    pub fn from_boot_time(boot: DateTime<Local>) -> Self {
        Self { boot }
    }

    #[must_use]
    pub fn wall_time(&self, timestamp_ns: u64) -> DateTime<Local> {
        let since_boot = TimeDelta::nanoseconds(i64::try_from(timestamp_ns).unwrap_or(i64::MAX));
        self.boot + since_boot
    }

    /// `HH:MM:SS.ffffff` in local time
    #[must_use]
    pub fn format(&self, timestamp_ns: u64) -> String {
        self.wall_time(timestamp_ns).format("%H:%M:%S%.6f").to_string()
    }
}

#[allow(unsafe_code)]
fn monotonic_now() -> Result<Duration> {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: clock_gettime writes into the timespec we own
    let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    if ret != 0 {
        bail!("clock_gettime(CLOCK_MONOTONIC) failed: {}", std::io::Error::last_os_error());
    }
    let secs = u64::try_from(ts.tv_sec)?;
    let nanos = u32::try_from(ts.tv_nsec)?;
    Ok(Duration::new(secs, nanos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> BootClock {
        BootClock::from_boot_time(Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().unwrap())
    }

    #[test]
    fn test_format_adds_offset_since_boot() {
        assert_eq!(noon().format(1_500_000_000), "12:00:01.500000");
        assert_eq!(noon().format(61_000_001_000), "12:01:01.000001");
    }

    #[test]
    fn test_capture_is_in_the_past() {
        let clock = BootClock::capture().unwrap();
        assert!(clock.wall_time(0) <= Local::now());
    }
}
