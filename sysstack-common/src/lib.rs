//! # Shared Data Structures (eBPF ↔ Userspace)
//!
//! Defines the record format, table sizes, and probe pipeline shared between
//! the kernel-side `sys_enter` probe and the userspace loader/consumer. All
//! types crossing the kernel boundary use `#[repr(C)]`.
//!
//! ## Key Types
//!
//! - [`SyscallEvent`] - 16-byte record passed through the `EVENTS` ring buffer
//! - [`SysEnterArgs`] - Tracepoint arguments from `raw_syscalls/sys_enter`
//! - [`pipeline::Probe`] - Filter → capture → reserve → populate → submit
//!
//! The pipeline is written against traits so the same code runs inside the
//! eBPF program (backed by maps) and in userspace tests (backed by the
//! in-memory model in `sysstack::model`).

#![cfg_attr(not(test), no_std)]

pub mod pipeline;

// ============================================================================
// Table Sizes
// ============================================================================

/// Maximum number of user-space frames stored per stack
///
/// Kernel stack maps are limited to 127 frames (`PERF_MAX_STACK_DEPTH`).
pub const MAX_STACK_DEPTH: usize = 127;

/// Number of entries in the `STACK_TRACES` map
///
/// A full map makes `bpf_get_stackid` fail; entries are never evicted.
pub const STACK_TABLE_CAPACITY: u32 = 1024;

/// Size of the `EVENTS` ring buffer in bytes (256 KiB, page-aligned power of two)
pub const EVENT_CHANNEL_BYTES: u32 = 256 * 1024;

/// Index of the single slot in the `TARGET_PID` array
pub const TARGET_PID_SLOT: u32 = 0;

/// Value of an unconfigured target slot. Never matches any task.
pub const NO_TARGET: u32 = 0;

// ============================================================================
// Probe Outcome Counters
// ============================================================================

/// `PROBE_OUTCOMES` index: record submitted to the ring buffer
pub const OUTCOME_EMITTED: u32 = 0;

/// `PROBE_OUTCOMES` index: target matched but no stack id was obtained
pub const OUTCOME_STACK_FAILED: u32 = 1;

/// `PROBE_OUTCOMES` index: stack captured but the ring buffer was full
pub const OUTCOME_CHANNEL_FULL: u32 = 2;

/// Number of slots in `PROBE_OUTCOMES`
pub const OUTCOME_SLOTS: u32 = 3;

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Record sent from the probe to userspace via ring buffer
///
/// **Memory Layout**: 16 bytes, no padding, native byte order.
///
/// | bytes  | field          |
/// |--------|----------------|
/// | 0..8   | `timestamp_ns` |
/// | 8..12  | `syscall_id`   |
/// | 12..16 | `stack_id`     |
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyscallEvent {
    /// Timestamp in nanoseconds (from `bpf_ktime_get_ns()`)
    ///
    /// Monotonic clock, relative to system boot. Records from different CPUs
    /// can arrive out of order; sort by this field when total order matters.
    pub timestamp_ns: u64,

    /// Raw syscall number for the running ABI (e.g. 1 = `write` on `x86_64`)
    pub syscall_id: u32,

    /// Key into the `STACK_TRACES` map. Always non-negative in emitted records.
    pub stack_id: i32,
}

const _: () = assert!(SyscallEvent::SIZE == 16);

impl SyscallEvent {
    /// Size of one record on the wire
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Encode in the wire layout
    #[must_use]
    pub fn to_ne_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..8].copy_from_slice(&self.timestamp_ns.to_ne_bytes());
        out[8..12].copy_from_slice(&self.syscall_id.to_ne_bytes());
        out[12..16].copy_from_slice(&self.stack_id.to_ne_bytes());
        out
    }

    /// Decode from the wire layout
    ///
    /// Returns `None` if fewer than [`SyscallEvent::SIZE`] bytes are given.
    /// Trailing bytes (ring buffer alignment) are ignored.
    #[must_use]
    pub fn from_ne_bytes(bytes: &[u8]) -> Option<Self> {
        let timestamp_ns = u64::from_ne_bytes(bytes.get(0..8)?.try_into().ok()?);
        let syscall_id = u32::from_ne_bytes(bytes.get(8..12)?.try_into().ok()?);
        let stack_id = i32::from_ne_bytes(bytes.get(12..16)?.try_into().ok()?);
        Some(Self { timestamp_ns, syscall_id, stack_id })
    }
}

/// Tracepoint arguments for `raw_syscalls/sys_enter`
///
/// Layout defined by the Linux kernel tracepoint ABI:
/// `/sys/kernel/debug/tracing/events/raw_syscalls/sys_enter/format`
#[repr(C)]
pub struct SysEnterArgs {
    /// Common tracepoint header
    pub common_type: u16,
    pub common_flags: u8,
    pub common_preempt_count: u8,
    pub common_pid: i32,

    /// Syscall number
    pub id: i64,

    /// Raw syscall arguments (unused by the probe)
    pub args: [u64; 6],
}

#[cfg(feature = "user")]
use aya::Pod;

// Pod trait ensures types can be safely transmitted as plain bytes
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for SyscallEvent {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_layout_has_no_padding() {
        assert_eq!(SyscallEvent::SIZE, 16);
        assert_eq!(core::mem::offset_of!(SyscallEvent, timestamp_ns), 0);
        assert_eq!(core::mem::offset_of!(SyscallEvent, syscall_id), 8);
        assert_eq!(core::mem::offset_of!(SyscallEvent, stack_id), 12);
    }

    #[test]
    fn test_event_bytes_follow_wire_layout() {
        let event = SyscallEvent { timestamp_ns: 0x0102_0304_0506_0708, syscall_id: 257, stack_id: 7 };
        let bytes = event.to_ne_bytes();

        assert_eq!(bytes[0..8], 0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(bytes[8..12], 257u32.to_ne_bytes());
        assert_eq!(bytes[12..16], 7i32.to_ne_bytes());
        assert_eq!(SyscallEvent::from_ne_bytes(&bytes), Some(event));
    }

    #[test]
    fn test_event_decode_rejects_short_record() {
        assert_eq!(SyscallEvent::from_ne_bytes(&[0u8; 15]), None);
    }

    #[test]
    fn test_event_decode_ignores_trailing_bytes() {
        let event = SyscallEvent { timestamp_ns: 99, syscall_id: 3, stack_id: 0 };
        let mut padded = [0xFFu8; 24];
        padded[..16].copy_from_slice(&event.to_ne_bytes());

        assert_eq!(SyscallEvent::from_ne_bytes(&padded), Some(event));
    }

    #[test]
    fn test_sys_enter_id_offset() {
        // The probe reads `id` straight out of the tracepoint context
        assert_eq!(core::mem::offset_of!(SysEnterArgs, id), 8);
    }
}
