//! Domain types providing compile-time safety and self-documentation
//!
//! Newtype wrappers keep process ids, stack ids and syscall numbers from being
//! mixed up on their way between the maps and the renderer.

use std::fmt;

use crate::syscalls::syscall_name;

/// Process ID (TGID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Stack trace ID from eBPF
///
/// Key into the `STACK_TRACES` map. Negative values mean no stack was
/// captured; the probe never emits those, but the type still guards lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackId(pub i32);

impl StackId {
    /// Returns true if this stack ID is valid (non-negative)
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Convert to u32 for eBPF map lookup, `None` if invalid
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn as_map_key(self) -> Option<u32> {
        self.is_valid().then_some(self.0 as u32)
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw syscall number as seen at `sys_enter`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyscallId(pub u32);

impl SyscallId {
    /// Human-readable name, `syscall_<id>` for numbers not in the table
    #[must_use]
    pub fn name(self) -> String {
        syscall_name(self.0).map_or_else(|| format!("syscall_{}", self.0), str::to_string)
    }
}

impl fmt::Display for SyscallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_id_map_key() {
        assert_eq!(StackId(7).as_map_key(), Some(7));
        assert_eq!(StackId(0).as_map_key(), Some(0));
        assert_eq!(StackId(-14).as_map_key(), None);
    }

    #[test]
    #[cfg(target_arch = "x86_64")]
    fn test_syscall_id_display() {
        assert_eq!(SyscallId(1).to_string(), "write");
        assert_eq!(SyscallId(9999).to_string(), "syscall_9999");
    }

    #[test]
    fn test_pid_display() {
        assert_eq!(Pid(4242).to_string(), "PID:4242");
    }
}
