//! The probe pipeline driven against the in-memory tables

use sysstack::model::{FixedTarget, ManualClock, MemoryRing, MemoryStackTable, UserStack};
use sysstack_common::pipeline::{DropReason, Invocation, Probe};
use sysstack_common::{SyscallEvent, MAX_STACK_DEPTH};

const TARGET: u32 = 4242;

#[test]
fn test_target_syscall_emits_one_record() {
    let target = FixedTarget::new(TARGET);
    let table = MemoryStackTable::starting_at(1024, 7);
    let ring = MemoryRing::with_default_capacity();
    let clock = ManualClock::new(1_000, 1);
    let frames = [0xAA, 0xBB, 0xCC];
    let stack = UserStack { table: &table, frames: Some(&frames) };

    let probe = Probe::new(&target, &stack, &ring, &clock);
    probe.run(Invocation { pid: TARGET, syscall_id: 1 }).unwrap();

    let events = ring.drain_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].timestamp_ns > 0);
    assert_eq!(events[0].syscall_id, 1);
    assert_eq!(events[0].stack_id, 7);

    let entry = table.lookup(7).unwrap();
    assert_eq!(&entry[..3], &[0xAA, 0xBB, 0xCC]);
    assert!(entry[3..].iter().all(|&ip| ip == 0));
}

#[test]
fn test_other_process_leaves_everything_untouched() {
    let target = FixedTarget::new(TARGET);
    let table = MemoryStackTable::new();
    let ring = MemoryRing::with_default_capacity();
    let clock = ManualClock::new(1_000, 1);
    let stack = UserStack { table: &table, frames: Some(&[0xAA]) };

    let probe = Probe::new(&target, &stack, &ring, &clock);
    assert_eq!(probe.run(Invocation { pid: 9999, syscall_id: 1 }), Err(DropReason::FilterMiss));

    assert_eq!(ring.pending(), 0);
    assert_eq!(ring.occupied(), 0);
    assert!(table.is_empty());
    assert_eq!(target.get(), TARGET);
}

#[test]
fn test_stack_table_full_drops_the_syscall() {
    let target = FixedTarget::new(TARGET);
    let table = MemoryStackTable::with_capacity(0);
    let ring = MemoryRing::with_default_capacity();
    let clock = ManualClock::new(1_000, 1);
    let stack = UserStack { table: &table, frames: Some(&[0xAA]) };

    let probe = Probe::new(&target, &stack, &ring, &clock);
    assert_eq!(
        probe.run(Invocation { pid: TARGET, syscall_id: 1 }),
        Err(DropReason::StackCaptureFailure)
    );
    assert_eq!(ring.pending(), 0);
}

#[test]
fn test_full_ring_keeps_the_captured_stack() {
    let target = FixedTarget::new(TARGET);
    let table = MemoryStackTable::new();
    let ring = MemoryRing::new(SyscallEvent::SIZE);
    let clock = ManualClock::new(1_000, 1);
    let stack = UserStack { table: &table, frames: Some(&[0xAA]) };
    let probe = Probe::new(&target, &stack, &ring, &clock);

    probe.run(Invocation { pid: TARGET, syscall_id: 0 }).unwrap();
    assert_eq!(probe.run(Invocation { pid: TARGET, syscall_id: 1 }), Err(DropReason::ChannelFull));

    // The second pass captured before it failed to reserve
    assert_eq!(table.len(), 2);
    assert_eq!(ring.drain_events().len(), 1);

    probe.run(Invocation { pid: TARGET, syscall_id: 2 }).unwrap();
    assert_eq!(ring.drain_events()[0].syscall_id, 2);
}

#[test]
fn test_concurrent_producers_never_exceed_invocations() {
    const THREADS: u32 = 8;
    const CALLS: u32 = 200;

    let target = FixedTarget::new(TARGET);
    let table = MemoryStackTable::new();
    // Room for fewer records than invocations, so some passes must drop
    let ring = MemoryRing::new(SyscallEvent::SIZE * 500);
    let clock = ManualClock::new(1, 1);

    std::thread::scope(|scope| {
        for thread in 0..THREADS {
            let (target, table, ring, clock) = (&target, &table, &ring, &clock);
            scope.spawn(move || {
                let frames = [u64::from(thread) + 1, 0xBEEF];
                let stack = UserStack { table, frames: Some(&frames) };
                let probe = Probe::new(target, &stack, ring, clock);
                for call in 0..CALLS {
                    let pid = if call % 2 == 0 { TARGET } else { TARGET + 1 };
                    let _ = probe.run(Invocation { pid, syscall_id: call });
                }
            });
        }
    });

    let events = ring.drain_events();
    let target_invocations = (THREADS * CALLS / 2) as usize;
    assert!(events.len() <= target_invocations);
    assert!(events.len() <= 500);
    assert!(!events.is_empty());

    // Every emitted stack id resolves to a stored, distinct entry
    let mut ids: Vec<i32> = events.iter().map(|e| e.stack_id).collect();
    for &id in &ids {
        let entry = table.lookup(id).unwrap();
        assert_eq!(entry.len(), MAX_STACK_DEPTH);
        assert_eq!(entry[1], 0xBEEF);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), events.len());
    assert!(events.iter().all(|e| e.syscall_id % 2 == 0));
}

#[test]
fn test_record_round_trips_through_the_ring() {
    let ring = MemoryRing::with_default_capacity();
    let event = SyscallEvent { timestamp_ns: 0x0102_0304_0506_0708, syscall_id: 262, stack_id: 1023 };

    let mut slot = ring.reserve_bytes(SyscallEvent::SIZE).unwrap();
    slot.bytes_mut().copy_from_slice(&event.to_ne_bytes());
    ring.submit_bytes(slot);

    let bytes = ring.read().unwrap();
    assert_eq!(bytes, event.to_ne_bytes());
    assert_eq!(SyscallEvent::from_ne_bytes(&bytes), Some(event));
}

#[test]
fn test_capacity_law() {
    let capacity = 4 * SyscallEvent::SIZE;
    let ring = MemoryRing::new(capacity);

    for _ in 0..3 {
        let slot = ring.reserve_bytes(SyscallEvent::SIZE).unwrap();
        ring.submit_bytes(slot);
    }
    let size = 2 * SyscallEvent::SIZE;
    assert!(size > capacity - ring.occupied());
    assert!(ring.reserve_bytes(size).is_none());

    ring.read().unwrap();
    assert!(ring.reserve_bytes(size).is_some());
}
