use aya::maps::{ring_buf::RingBufItem, MapData, RingBuf};
use std::borrow::Borrow;
use std::ops::Deref;

use crate::model::MemoryRing;

/// Where the consumer reads raw `EVENTS` records from
///
/// Implemented for the kernel ring buffer and for [`MemoryRing`], so draining
/// is the same code against both.
pub trait RecordSource {
    type Record<'a>: Deref<Target = [u8]>
    where
        Self: 'a;

    /// Oldest unread record, releasing its space once the returned value drops
    fn next_record(&mut self) -> Option<Self::Record<'_>>;
}

impl<T: Borrow<MapData>> RecordSource for RingBuf<T> {
    type Record<'a> = RingBufItem<'a> where Self: 'a;

    fn next_record(&mut self) -> Option<Self::Record<'_>> {
        self.next()
    }
}

impl RecordSource for MemoryRing {
    type Record<'a> = Vec<u8>;

    fn next_record(&mut self) -> Option<Vec<u8>> {
        self.read()
    }
}
