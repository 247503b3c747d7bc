//! In-memory stack table
//!
//! Fixed number of entries, each written once. Ids are handed out by an
//! atomic counter so concurrent captures never share an entry. A full table
//! refuses new captures; nothing is evicted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;
use sysstack_common::pipeline::StackCapture;
use sysstack_common::{MAX_STACK_DEPTH, STACK_TABLE_CAPACITY};

/// `-ENOMEM`, returned by `bpf_get_stackid` when the map is full
pub const ENOMEM: i64 = -12;

/// `-EFAULT`, returned by `bpf_get_stackid` when there is no user stack
pub const EFAULT: i64 = -14;

/// One stored stack: frames first, zero-filled after
pub type StackFrames = [u64; MAX_STACK_DEPTH];

pub struct MemoryStackTable {
    entries: Box<[OnceLock<StackFrames>]>,
    next_id: AtomicUsize,
}

impl MemoryStackTable {
    /// Table sized like the probe's `STACK_TRACES` map
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(STACK_TABLE_CAPACITY as usize)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::starting_at(capacity, 0)
    }

    /// Table whose first capture gets id `first_id`
    ///
    /// Ids below `first_id` stay empty. Useful to pin ids in tests.
    #[must_use]
    pub fn starting_at(capacity: usize, first_id: usize) -> Self {
        Self {
            entries: (0..capacity).map(|_| OnceLock::new()).collect(),
            next_id: AtomicUsize::new(first_id),
        }
    }

    /// Store `frames` in a fresh entry and return its id, or `ENOMEM` if full
    ///
    /// Frames past [`MAX_STACK_DEPTH`] are cut off.
    pub fn store(&self, frames: &[u64]) -> i64 {
        let capacity = self.entries.len();
        let Ok(id) = self
            .next_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < capacity).then_some(n + 1))
        else {
            return ENOMEM;
        };

        let mut entry = [0u64; MAX_STACK_DEPTH];
        let depth = frames.len().min(MAX_STACK_DEPTH);
        entry[..depth].copy_from_slice(&frames[..depth]);
        // The id was claimed exclusively above, so the entry is still empty
        let _ = self.entries[id].set(entry);

        i64::try_from(id).unwrap_or(ENOMEM)
    }

    /// Frames stored under `id`
    #[must_use]
    pub fn lookup(&self, id: i32) -> Option<&StackFrames> {
        let idx = usize::try_from(id).ok()?;
        self.entries.get(idx)?.get()
    }

    /// Number of stored stacks
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.get().is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}

impl Default for MemoryStackTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The calling thread's user stack, as one probe invocation sees it
///
/// `frames: None` models a kernel thread, which has no user-space context.
pub struct UserStack<'a> {
    pub table: &'a MemoryStackTable,
    pub frames: Option<&'a [u64]>,
}

impl StackCapture for UserStack<'_> {
    fn capture(&self) -> i64 {
        match self.frames {
            Some(frames) => self.table.store(frames),
            None => EFAULT,
        }
    }
}
