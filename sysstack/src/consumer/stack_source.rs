use aya::maps::{MapData, StackTraceMap};
use std::borrow::Borrow;

use crate::domain::{StackId, TracerError};
use crate::model::MemoryStackTable;

/// Where the consumer reads stored stacks from
///
/// Implemented for the kernel's `STACK_TRACES` map and for the in-memory
/// table, so the consumer runs unchanged against both.
pub trait StackSource {
    /// Instruction pointers stored under `id`, innermost first
    ///
    /// # Errors
    /// Returns an error if the id is negative or has no entry
    fn frames(&self, id: StackId) -> Result<Vec<u64>, TracerError>;
}

impl<T: Borrow<MapData>> StackSource for StackTraceMap<T> {
    fn frames(&self, id: StackId) -> Result<Vec<u64>, TracerError> {
        let key = id.as_map_key().ok_or(TracerError::InvalidStackId(id))?;
        let trace = self.get(&key, 0)?;
        Ok(trace.frames().iter().map(|frame| frame.ip).collect())
    }
}

impl StackSource for MemoryStackTable {
    fn frames(&self, id: StackId) -> Result<Vec<u64>, TracerError> {
        self.lookup(id.0).map(|entry| entry.to_vec()).ok_or(TracerError::InvalidStackId(id))
    }
}
