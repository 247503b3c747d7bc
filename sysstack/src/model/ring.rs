//! In-memory event channel with ring buffer semantics
//!
//! Space is accounted in bytes against two monotonically increasing positions,
//! like the kernel ring buffer: producers advance `producer_pos` when they
//! reserve, the consumer advances `consumer_pos` when it reads. A reservation
//! succeeds only if `producer_pos + size - consumer_pos <= capacity`.
//!
//! Submitted records go through a `crossbeam-channel` queue, so the consumer
//! sees them in submission order, whatever order they were reserved in.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use sysstack_common::pipeline::EventChannel;
use sysstack_common::{SyscallEvent, EVENT_CHANNEL_BYTES};

/// Exclusive claim on a region of a [`MemoryRing`]
#[derive(Debug)]
pub struct RingSlot {
    offset: usize,
    data: Vec<u8>,
}

impl RingSlot {
    /// Producer position at which the region was claimed
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Writable view of the claimed bytes
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Bounded multi-producer, single-consumer byte channel
pub struct MemoryRing {
    capacity: usize,
    producer_pos: AtomicUsize,
    consumer_pos: AtomicUsize,
    committed_tx: Sender<Vec<u8>>,
    committed_rx: Receiver<Vec<u8>>,
}

impl MemoryRing {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (committed_tx, committed_rx) = unbounded();
        Self {
            capacity,
            producer_pos: AtomicUsize::new(0),
            consumer_pos: AtomicUsize::new(0),
            committed_tx,
            committed_rx,
        }
    }

    /// Ring sized like the probe's `EVENTS` map
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(EVENT_CHANNEL_BYTES as usize)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes reserved and not yet released by the consumer
    #[must_use]
    pub fn occupied(&self) -> usize {
        let consumed = self.consumer_pos.load(Ordering::Acquire);
        self.producer_pos.load(Ordering::Acquire) - consumed
    }

    /// Claim `size` contiguous bytes, or `None` if they are not free
    ///
    /// Never waits for the consumer. Concurrent producers each get a distinct
    /// region.
    pub fn reserve_bytes(&self, size: usize) -> Option<RingSlot> {
        self.producer_pos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |produced| {
                // `produced` may be stale relative to `consumed`; the exchange then
                // fails and this closure runs again with a fresh value
                let consumed = self.consumer_pos.load(Ordering::Acquire);
                let end = produced.checked_add(size)?;
                (end.saturating_sub(consumed) <= self.capacity).then_some(end)
            })
            .ok()
            .map(|offset| RingSlot { offset, data: vec![0; size] })
    }

    /// Publish a claimed region to the consumer
    pub fn submit_bytes(&self, slot: RingSlot) {
        // The receiver lives as long as self, so the send cannot fail
        let _ = self.committed_tx.send(slot.data);
    }

    /// Read the oldest submitted record and release its bytes
    pub fn read(&self) -> Option<Vec<u8>> {
        let record = self.committed_rx.try_recv().ok()?;
        self.consumer_pos.fetch_add(record.len(), Ordering::AcqRel);
        Some(record)
    }

    /// Read and decode every submitted record
    pub fn drain_events(&self) -> Vec<SyscallEvent> {
        std::iter::from_fn(|| self.read()).filter_map(|r| SyscallEvent::from_ne_bytes(&r)).collect()
    }

    /// Number of submitted records not yet read
    #[must_use]
    pub fn pending(&self) -> usize {
        self.committed_rx.len()
    }
}

impl EventChannel for MemoryRing {
    type Slot = RingSlot;

    fn reserve(&self) -> Option<RingSlot> {
        self.reserve_bytes(SyscallEvent::SIZE)
    }

    fn populate(&self, slot: &mut RingSlot, event: SyscallEvent) {
        slot.bytes_mut().copy_from_slice(&event.to_ne_bytes());
    }

    fn submit(&self, slot: RingSlot) {
        self.submit_bytes(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_refused_when_full() {
        let ring = MemoryRing::new(64);

        let a = ring.reserve_bytes(40).unwrap();
        assert_eq!(a.offset(), 0);
        assert!(ring.reserve_bytes(32).is_none());
        let b = ring.reserve_bytes(24).unwrap();
        assert_eq!(b.offset(), 40);
        assert_eq!(ring.occupied(), 64);
        assert!(ring.reserve_bytes(1).is_none());
    }

    #[test]
    fn test_unsubmitted_reservation_is_invisible() {
        let ring = MemoryRing::new(64);
        let _slot = ring.reserve_bytes(16).unwrap();

        assert_eq!(ring.pending(), 0);
        assert!(ring.read().is_none());
    }

    #[test]
    fn test_visibility_follows_submission_order() {
        let ring = MemoryRing::new(64);
        let mut first = ring.reserve_bytes(1).unwrap();
        let mut second = ring.reserve_bytes(1).unwrap();
        first.bytes_mut()[0] = 1;
        second.bytes_mut()[0] = 2;

        ring.submit_bytes(second);
        ring.submit_bytes(first);

        assert_eq!(ring.read(), Some(vec![2]));
        assert_eq!(ring.read(), Some(vec![1]));
        assert_eq!(ring.read(), None);
    }

    #[test]
    fn test_read_releases_space() {
        let ring = MemoryRing::new(32);
        let slot = ring.reserve_bytes(32).unwrap();
        ring.submit_bytes(slot);
        assert_eq!(ring.occupied(), 32);

        ring.read().unwrap();
        assert_eq!(ring.occupied(), 0);
        assert!(ring.reserve_bytes(32).is_some());
    }

    #[test]
    fn test_reserve_races_with_consumer() {
        const RECORD: usize = 16;
        let ring = MemoryRing::new(4 * RECORD);
        let done = std::sync::atomic::AtomicBool::new(false);

        std::thread::scope(|scope| {
            let consumer = scope.spawn(|| {
                let mut read = 0;
                while !done.load(Ordering::Acquire) || ring.pending() > 0 {
                    while ring.read().is_some() {
                        read += 1;
                    }
                }
                read
            });
            let producers: Vec<_> = (0..4)
                .map(|_| {
                    scope.spawn(|| {
                        let mut submitted = 0;
                        for _ in 0..20_000 {
                            if let Some(slot) = ring.reserve_bytes(RECORD) {
                                ring.submit_bytes(slot);
                                submitted += 1;
                            }
                        }
                        submitted
                    })
                })
                .collect();

            let submitted: usize = producers.into_iter().map(|p| p.join().unwrap()).sum();
            done.store(true, Ordering::Release);
            assert_eq!(consumer.join().unwrap(), submitted);
        });
        assert_eq!(ring.occupied(), 0);
    }

    #[test]
    fn test_oversized_reservation_never_fits() {
        let ring = MemoryRing::new(16);
        assert!(ring.reserve_bytes(17).is_none());
        assert!(ring.reserve_bytes(usize::MAX).is_none());
    }
}
