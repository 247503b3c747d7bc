//! # In-Memory Model of the Probe's Tables
//!
//! Userspace implementations of the pipeline traits from
//! `sysstack_common::pipeline`, with the same capacities and failure modes as
//! the BPF maps. They let the exact probe pipeline run off-kernel:
//!
//! | BPF map          | Model                |
//! |------------------|----------------------|
//! | `TARGET_PID`     | [`FixedTarget`]      |
//! | `STACK_TRACES`   | [`MemoryStackTable`] |
//! | `EVENTS`         | [`MemoryRing`]       |
//! | `bpf_ktime_get_ns` | [`ManualClock`]    |
//!
//! All of them are `Sync`, so many threads can drive one set of tables the
//! way many CPUs drive the maps.

pub mod ring;
pub mod stack_table;

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use sysstack_common::pipeline::{Clock, TargetFilter};
use sysstack_common::NO_TARGET;

pub use ring::{MemoryRing, RingSlot};
pub use stack_table::{MemoryStackTable, StackFrames, UserStack};

/// Single-slot target filter
#[derive(Debug, Default)]
pub struct FixedTarget {
    pid: AtomicU32,
}

impl FixedTarget {
    #[must_use]
    pub fn new(pid: u32) -> Self {
        Self { pid: AtomicU32::new(pid) }
    }

    /// Overwrite the slot (the loader's one write)
    pub fn set(&self, pid: u32) {
        self.pid.store(pid, Ordering::Release);
    }

    #[must_use]
    pub fn get(&self) -> u32 {
        self.pid.load(Ordering::Acquire)
    }
}

impl TargetFilter for FixedTarget {
    fn matches(&self, pid: u32) -> bool {
        let target = self.get();
        target != NO_TARGET && target == pid
    }
}

/// Clock that advances by a fixed step on every read
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
    step: u64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: u64, step: u64) -> Self {
        Self { now: AtomicU64::new(start), step }
    }
}

impl Clock for ManualClock {
    fn now_ns(&self) -> u64 {
        self.now.fetch_add(self.step, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_target_never_matches() {
        let target = FixedTarget::default();
        assert!(!target.matches(0));
        assert!(!target.matches(1));

        target.set(4242);
        assert!(target.matches(4242));
        assert!(!target.matches(4243));
    }

    #[test]
    fn test_manual_clock_steps() {
        let clock = ManualClock::new(100, 10);
        assert_eq!(clock.now_ns(), 100);
        assert_eq!(clock.now_ns(), 110);
    }
}
