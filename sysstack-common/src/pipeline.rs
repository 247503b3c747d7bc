//! # Probe Pipeline
//!
//! One pass of the `sys_enter` probe, written as a typestate machine:
//!
//! ```text
//! enter ──miss──▶ DROPPED
//!   │ match
//!   ▼
//! Capturing ──no stack id──▶ DROPPED
//!   │
//!   ▼
//! Reserving ──ring full──▶ DROPPED
//!   │
//!   ▼
//! Populating ──▶ Submitting ──▶ DONE
//! ```
//!
//! Each state is its own type and each transition is a method on [`Probe`]
//! that consumes the previous state, so a pass cannot skip or repeat a stage.
//! [`Probe::run`] chains the transitions with `?`; the first failure ends the
//! pass with its [`DropReason`].
//!
//! The tables are reached through the [`TargetFilter`], [`StackCapture`],
//! [`EventChannel`] and [`Clock`] traits. Inside the kernel they are backed by
//! BPF maps and helpers; in userspace by the in-memory model.
//!
//! Nothing here loops, allocates, or blocks.

use crate::SyscallEvent;

/// Single-slot table holding the process id of interest
pub trait TargetFilter {
    /// True if `pid` (a TGID) is the configured target
    fn matches(&self, pid: u32) -> bool;
}

/// Stack table that stores the calling thread's user-space stack
pub trait StackCapture {
    /// Capture the current user stack into a free entry.
    ///
    /// Returns the entry id, or a negative value (errno style, as returned by
    /// `bpf_get_stackid`) if the table is full or there is no user context.
    fn capture(&self) -> i64;
}

/// Bounded multi-producer channel with reserve/populate/submit semantics
pub trait EventChannel {
    /// Exclusive claim on [`SyscallEvent::SIZE`] bytes of the channel
    type Slot;

    /// Claim space for one record. `None` if free space is insufficient.
    fn reserve(&self) -> Option<Self::Slot>;

    /// Write the record into a claimed slot
    fn populate(&self, slot: &mut Self::Slot, event: SyscallEvent);

    /// Publish the slot to the consumer
    fn submit(&self, slot: Self::Slot);
}

/// Monotonic nanosecond clock
pub trait Clock {
    fn now_ns(&self) -> u64;
}

/// Why a pass ended without emitting a record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// The task is not the target. Expected for almost every syscall.
    FilterMiss,
    /// Stack table full, or no user-space context (kernel thread)
    StackCaptureFailure,
    /// Not enough free space in the channel
    ChannelFull,
}

impl DropReason {
    /// `PROBE_OUTCOMES` slot for this reason
    ///
    /// Filter misses are not counted: a non-target pass touches nothing.
    #[must_use]
    pub const fn outcome_slot(self) -> Option<u32> {
        match self {
            Self::FilterMiss => None,
            Self::StackCaptureFailure => Some(crate::OUTCOME_STACK_FAILED),
            Self::ChannelFull => Some(crate::OUTCOME_CHANNEL_FULL),
        }
    }
}

/// `PROBE_OUTCOMES` slot a finished pass is counted in
///
/// A pass is counted at most once. Nothing else records a drop.
#[must_use]
pub const fn pass_outcome(result: &Result<(), DropReason>) -> Option<u32> {
    match result {
        Ok(()) => Some(crate::OUTCOME_EMITTED),
        Err(reason) => reason.outcome_slot(),
    }
}

/// What the kernel hook knows when it fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Invocation {
    /// Process id (TGID) of the calling task
    pub pid: u32,
    /// Raw syscall number
    pub syscall_id: u32,
}

/// Target matched; a stack is to be captured
#[derive(Debug)]
pub struct Capturing {
    syscall_id: u32,
}

/// Stack captured; channel space is to be reserved
#[derive(Debug)]
pub struct Reserving {
    syscall_id: u32,
    stack_id: i32,
}

/// Channel space claimed; the record is to be written
#[derive(Debug)]
pub struct Populating<S> {
    slot: S,
    syscall_id: u32,
    stack_id: i32,
}

/// Record written; the slot is to be published
#[derive(Debug)]
pub struct Submitting<S> {
    slot: S,
}

/// The probe orchestrator, borrowing the tables it sequences
pub struct Probe<'a, F, S, C, K> {
    filter: &'a F,
    stacks: &'a S,
    channel: &'a C,
    clock: &'a K,
}

impl<'a, F, S, C, K> Probe<'a, F, S, C, K>
where
    F: TargetFilter,
    S: StackCapture,
    C: EventChannel,
    K: Clock,
{
    pub fn new(filter: &'a F, stacks: &'a S, channel: &'a C, clock: &'a K) -> Self {
        Self { filter, stacks, channel, clock }
    }

    /// Run one full pass. `Ok(())` means a record was submitted.
    ///
    /// # Errors
    /// Returns the [`DropReason`] of the stage that ended the pass.
    pub fn run(&self, invocation: Invocation) -> Result<(), DropReason> {
        let capturing = self.enter(invocation)?;
        let reserving = self.capture(capturing)?;
        let populating = self.reserve(reserving)?;
        let submitting = self.populate(populating);
        self.submit(submitting);
        Ok(())
    }

    /// ENTRY → CAPTURING, or DROPPED on a filter miss
    ///
    /// # Errors
    /// [`DropReason::FilterMiss`] if the task is not the target.
    pub fn enter(&self, invocation: Invocation) -> Result<Capturing, DropReason> {
        if self.filter.matches(invocation.pid) {
            Ok(Capturing { syscall_id: invocation.syscall_id })
        } else {
            Err(DropReason::FilterMiss)
        }
    }

    /// CAPTURING → RESERVING, or DROPPED if no stack id was obtained
    ///
    /// # Errors
    /// [`DropReason::StackCaptureFailure`] on a negative (or out of range) id.
    pub fn capture(&self, state: Capturing) -> Result<Reserving, DropReason> {
        let stack_id = i32::try_from(self.stacks.capture())
            .ok()
            .filter(|id| *id >= 0)
            .ok_or(DropReason::StackCaptureFailure)?;
        Ok(Reserving { syscall_id: state.syscall_id, stack_id })
    }

    /// RESERVING → POPULATING, or DROPPED if the channel is full
    ///
    /// The captured stack entry stays in the table either way.
    ///
    /// # Errors
    /// [`DropReason::ChannelFull`] if the reservation is refused.
    pub fn reserve(&self, state: Reserving) -> Result<Populating<C::Slot>, DropReason> {
        let slot = self.channel.reserve().ok_or(DropReason::ChannelFull)?;
        Ok(Populating { slot, syscall_id: state.syscall_id, stack_id: state.stack_id })
    }

    /// POPULATING → SUBMITTING. Timestamps the record as it is written.
    pub fn populate(&self, state: Populating<C::Slot>) -> Submitting<C::Slot> {
        let Populating { mut slot, syscall_id, stack_id } = state;
        let event = SyscallEvent { timestamp_ns: self.clock.now_ns(), syscall_id, stack_id };
        self.channel.populate(&mut slot, event);
        Submitting { slot }
    }

    /// SUBMITTING → DONE
    pub fn submit(&self, state: Submitting<C::Slot>) {
        self.channel.submit(state.slot);
    }
}
