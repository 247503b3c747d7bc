//! # eBPF Program Loading and Attachment
//!
//! ## Functions
//!
//! - [`load_ebpf_program()`] - Load eBPF bytecode from embedded binary
//! - [`bump_memlock_rlimit()`] - Lift the locked-memory limit for map allocation
//! - [`set_target_pid()`] - Write the traced process into `TARGET_PID`
//! - [`attach_sys_enter()`] - Attach the probe to `raw_syscalls/sys_enter`
//!
//! Dropping the returned [`Ebpf`] handle detaches the program and frees the
//! maps, so there is no explicit teardown.

use anyhow::Result;
use aya::{include_bytes_aligned, maps::Array, programs::TracePoint, Ebpf};
use log::{debug, info};
use sysstack_common::{NO_TARGET, TARGET_PID_SLOT};

use crate::domain::{Pid, TracerError};

/// Tracepoint the probe hooks
pub const SYS_ENTER_CATEGORY: &str = "raw_syscalls";
pub const SYS_ENTER_NAME: &str = "sys_enter";

/// Name of the program inside the eBPF object
const PROGRAM_NAME: &str = "sys_enter";

/// Load the eBPF program binary
///
/// Always uses the release build because debug builds pull in formatting code
/// that the BPF target cannot link. eBPF programs are small and compile fast
/// in release.
///
/// # Errors
/// Returns an error if the eBPF program binary cannot be loaded
pub fn load_ebpf_program() -> Result<Ebpf> {
    let bpf = Ebpf::load(include_bytes_aligned!(
        "../../../target/bpfel-unknown-none/release/sysstack"
    ))?;
    Ok(bpf)
}

/// Bump the memlock rlimit
///
/// Kernels before 5.11 charge map memory against `RLIMIT_MEMLOCK`; newer ones
/// use memcg and ignore it.
#[allow(unsafe_code)]
pub fn bump_memlock_rlimit() {
    let rlim = libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
    // SAFETY: setrlimit only reads the struct we pass
    let ret = unsafe { libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim) };
    if ret != 0 {
        debug!("Failed to remove limit on locked memory, ret is: {ret}");
    }
}

/// Reject pids the probe can never match
///
/// # Errors
/// Returns [`TracerError::InvalidTarget`] for pid 0, the "no target" value
pub fn validate_target(pid: Pid) -> Result<Pid, TracerError> {
    if pid.0 == NO_TARGET {
        return Err(TracerError::InvalidTarget(pid));
    }
    Ok(pid)
}

/// Write the traced process into `TARGET_PID[0]`
///
/// Must happen before the program is attached; the probe reads the slot on
/// every syscall and an unset slot matches nothing.
///
/// # Errors
/// Returns an error for pid 0 or if the map is missing or cannot be written
pub fn set_target_pid(bpf: &mut Ebpf, pid: Pid) -> Result<(), TracerError> {
    let pid = validate_target(pid)?;
    let mut target: Array<_, u32> =
        Array::try_from(bpf.map_mut("TARGET_PID").ok_or(TracerError::MapNotFound("TARGET_PID"))?)?;
    target.set(TARGET_PID_SLOT, pid.0, 0)?;
    info!("✓ Set target PID: {}", pid.0);
    Ok(())
}

/// Load the probe into the kernel and attach it to `raw_syscalls/sys_enter`
///
/// # Errors
/// Returns an error if the program is missing, rejected by the verifier, or
/// cannot be attached
pub fn attach_sys_enter(bpf: &mut Ebpf) -> Result<(), TracerError> {
    let program: &mut TracePoint = bpf
        .program_mut(PROGRAM_NAME)
        .ok_or(TracerError::ProgramNotFound(PROGRAM_NAME))?
        .try_into()?;
    program.load()?;
    program.attach(SYS_ENTER_CATEGORY, SYS_ENTER_NAME).map_err(|e| {
        TracerError::ProbeAttachFailed {
            program: PROGRAM_NAME.to_string(),
            category: SYS_ENTER_CATEGORY.to_string(),
            name: SYS_ENTER_NAME.to_string(),
            error: e.to_string(),
        }
    })?;
    info!("✓ Attached tracepoint: {SYS_ENTER_CATEGORY}/{SYS_ENTER_NAME}");
    Ok(())
}

/// Full loader sequence: memlock, load, target, attach
///
/// # Errors
/// Returns the first step that fails
pub fn load_and_attach(pid: Pid) -> Result<Ebpf> {
    let pid = validate_target(pid)?;
    bump_memlock_rlimit();

    let mut bpf = load_ebpf_program()?;
    set_target_pid(&mut bpf, pid)?;
    attach_sys_enter(&mut bpf)?;
    Ok(bpf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pid_zero_is_rejected() {
        let err = validate_target(Pid(0)).unwrap_err();
        assert!(matches!(err, TracerError::InvalidTarget(Pid(0))));
    }

    #[test]
    fn test_real_pid_is_accepted() {
        assert_eq!(validate_target(Pid(4242)).unwrap(), Pid(4242));
    }
}
