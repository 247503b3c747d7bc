//! # eBPF Kernel-Side Instrumentation
//!
//! Tracepoint program that records the user-space stack of every syscall made
//! by one target process.
//!
//! ## Programs
//!
//! - **Tracepoint**: `sys_enter` - attached to `raw_syscalls/sys_enter`, fires
//!   for every syscall on every CPU
//!
//! ## Maps (Shared with Userspace)
//!
//! - `TARGET_PID` - Single slot holding the target TGID
//! - `STACK_TRACES` - User stacks by stack id (1024 entries, 127 frames each)
//! - `EVENTS` - Ring buffer (256KB) of 16-byte `SyscallEvent` records
//! - `PROBE_OUTCOMES` - Per-CPU counters for emitted and dropped records
//!
//! The filtering/capture/delivery logic lives in `sysstack_common::pipeline`;
//! this file binds each map to the trait the pipeline expects.
//!
//! ## Build
//!
//! Always compiled in release mode (debug includes incompatible formatting code):
//! ```bash
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{bpf_get_current_pid_tgid, bpf_ktime_get_ns},
    macros::{map, tracepoint},
    maps::{ring_buf::RingBufEntry, Array, PerCpuArray, RingBuf, StackTrace},
    programs::TracePointContext,
    EbpfContext,
};
use sysstack_common::{
    pipeline::{pass_outcome, Clock, EventChannel, Invocation, Probe, StackCapture, TargetFilter},
    SysEnterArgs, SyscallEvent, EVENT_CHANNEL_BYTES, NO_TARGET, OUTCOME_SLOTS,
    STACK_TABLE_CAPACITY, TARGET_PID_SLOT,
};

// ============================================================================
// Constants
// ============================================================================

/// Stack capture flags for `bpf_get_stackid`:
///
/// - BPF_F_USER_STACK (0x100): Capture user-space stack (not kernel)
///
/// No `BPF_F_REUSE_STACKID`: an id handed to userspace is never overwritten.
const STACK_FLAGS: u64 = 0x100;

// ============================================================================
// eBPF Maps - Shared data structures between kernel and userspace
// ============================================================================

/// Target process filter
///
/// - **Slot 0**: TGID of the process to trace, written once by userspace
///   before the program is attached. `0` means no target.
#[map]
static TARGET_PID: Array<u32> = Array::with_max_entries(1, 0);

/// Stack trace map for storing user stacks by ID
///
/// - **Max Entries**: 1024 stacks
/// - **Value**: 127 instruction pointers, zero-filled past the last frame
///
/// A full map causes `bpf_get_stackid` to fail (-ENOMEM). Nothing here
/// deletes entries, so the table fills up over a long session.
#[map]
static STACK_TRACES: StackTrace = StackTrace::with_max_entries(STACK_TABLE_CAPACITY, 0);

/// Ring buffer for sending events to userspace (lock-free, multi-producer)
///
/// - **Size**: 256KB
/// - **Overflow**: `reserve` fails and the record is dropped
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(EVENT_CHANNEL_BYTES, 0);

/// Per-CPU outcome counters, indexed by `OUTCOME_*`
///
/// Only passes that matched the target are counted.
#[map]
static PROBE_OUTCOMES: PerCpuArray<u64> = PerCpuArray::with_max_entries(OUTCOME_SLOTS, 0);

// ============================================================================
// Map Adapters
// ============================================================================

struct TargetPid;

impl TargetFilter for TargetPid {
    fn matches(&self, pid: u32) -> bool {
        match TARGET_PID.get(TARGET_PID_SLOT) {
            Some(&target) => target != NO_TARGET && target == pid,
            None => false,
        }
    }
}

struct UserStack<'a> {
    ctx: &'a TracePointContext,
}

impl StackCapture for UserStack<'_> {
    fn capture(&self) -> i64 {
        // Preserve the raw error code; the pipeline treats any negative id as a drop
        unsafe { STACK_TRACES.get_stackid(self.ctx, STACK_FLAGS).unwrap_or_else(|e| e) }
    }
}

struct EventRing;

impl EventChannel for EventRing {
    type Slot = RingBufEntry<SyscallEvent>;

    fn reserve(&self) -> Option<Self::Slot> {
        EVENTS.reserve::<SyscallEvent>(0)
    }

    fn populate(&self, slot: &mut Self::Slot, event: SyscallEvent) {
        slot.write(event);
    }

    fn submit(&self, slot: Self::Slot) {
        slot.submit(0);
    }
}

struct KernelClock;

impl Clock for KernelClock {
    fn now_ns(&self) -> u64 {
        unsafe { bpf_ktime_get_ns() }
    }
}

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: raw_syscalls/sys_enter tracepoint
/// Fires before the kernel services any syscall, in the calling task's context
#[tracepoint]
pub fn sys_enter(ctx: TracePointContext) -> u32 {
    let invocation = read_invocation(&ctx);
    let stacks = UserStack { ctx: &ctx };
    let probe = Probe::new(&TargetPid, &stacks, &EventRing, &KernelClock);

    if let Some(slot) = pass_outcome(&probe.run(invocation)) {
        count_outcome(slot);
    }

    // Drops are visible only through PROBE_OUTCOMES
    0
}

fn read_invocation(ctx: &TracePointContext) -> Invocation {
    let pid_tgid = unsafe { bpf_get_current_pid_tgid() };

    // Layout from /sys/kernel/debug/tracing/events/raw_syscalls/sys_enter/format
    let args: *const SysEnterArgs = ctx.as_ptr() as *const SysEnterArgs;
    let syscall_id = unsafe { (*args).id as u32 };

    Invocation { pid: (pid_tgid >> 32) as u32, syscall_id }
}

fn count_outcome(slot: u32) {
    if let Some(counter) = PROBE_OUTCOMES.get_ptr_mut(slot) {
        unsafe { *counter += 1 };
    }
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";
