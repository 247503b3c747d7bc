//! Pre-flight checks for sysstack
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::domain::{Pid, TracerError};

/// Minimum kernel version: `BPF_MAP_TYPE_RINGBUF` landed in 5.8
const MIN_KERNEL_VERSION: (u32, u32) = (5, 8);

/// Run all pre-flight checks before eBPF loading
///
/// # Errors
/// Returns the first requirement that is not met
pub fn run_preflight_checks(pid: Pid) -> Result<()> {
    check_privileges()?;
    check_kernel_version()?;
    check_process_exists(pid)?;
    check_proc_access(pid)?;
    Ok(())
}

/// Check if running with sufficient privileges for eBPF
fn check_privileges() -> Result<()> {
    // SAFETY: geteuid has no preconditions
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    bail!(
        "Permission denied: sysstack requires root privileges to load eBPF programs.\n\n\
         Run with: sudo sysstack ..."
    );
}

/// Check if the kernel version is sufficient for the ring buffer map
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    // "Linux version 6.1.0-arch1-1 ..."
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");

    let Some(version) = parse_kernel_release(release) else {
        // Can't parse, let the loader report the real failure
        return Ok(());
    };

    if version < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {}.{} is too old.\n\n\
             sysstack requires Linux {}.{} or newer for eBPF ring buffer support.\n\
             Current kernel: {}",
            version.0,
            version.1,
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
            release
        );
    }

    Ok(())
}

/// `"5.15.0-generic"` → `(5, 15)`
fn parse_kernel_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor: String = parts.next()?.chars().take_while(char::is_ascii_digit).collect();
    Some((major, minor.parse().ok()?))
}

/// Check if the target process exists
///
/// # Errors
/// Returns [`TracerError::ProcessNotFound`] if `/proc/<pid>` is missing
pub fn check_process_exists(pid: Pid) -> Result<(), TracerError> {
    if !process_alive(pid) {
        return Err(TracerError::ProcessNotFound(pid));
    }
    Ok(())
}

/// Whether `/proc/<pid>` still exists
#[must_use]
pub fn process_alive(pid: Pid) -> bool {
    Path::new(&format!("/proc/{}", pid.0)).exists()
}

/// Check if we can read the process's memory maps
///
/// # Errors
/// Returns an error if `/proc/<pid>/maps` cannot be read
pub fn check_proc_access(pid: Pid) -> Result<()> {
    let maps_path = format!("/proc/{}/maps", pid.0);
    std::fs::read_to_string(&maps_path).with_context(|| {
        format!(
            "Cannot read {maps_path}\n\n\
             This usually means:\n\
             - The process doesn't exist (check: ps -p {})\n\
             - Permission denied (run with sudo)\n\
             - /proc is not mounted",
            pid.0
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kernel_release() {
        assert_eq!(parse_kernel_release("5.15.0-generic"), Some((5, 15)));
        assert_eq!(parse_kernel_release("6.1-rc3"), Some((6, 1)));
        assert_eq!(parse_kernel_release("4.19.0"), Some((4, 19)));
        assert_eq!(parse_kernel_release("unknown"), None);
    }

    #[test]
    fn test_process_not_found() {
        let err = check_process_exists(Pid(999_999_999)).unwrap_err();
        assert!(matches!(err, TracerError::ProcessNotFound(Pid(999_999_999))));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_preflight_reports_missing_process_as_typed_error() {
        let err = run_preflight_checks(Pid(999_999_999)).unwrap_err();
        // Without root the privilege check fails first
        if let Some(tracer) = err.downcast_ref::<TracerError>() {
            assert!(matches!(tracer, TracerError::ProcessNotFound(Pid(999_999_999))));
        } else {
            assert!(err.to_string().contains("Permission denied"), "unexpected error: {err}");
        }
    }

    #[test]
    fn test_own_process_is_accessible() {
        let me = Pid(std::process::id());
        assert!(process_alive(me));
        assert!(check_proc_access(me).is_ok());
    }
}
