//! Kernel side management: loading the probe and reading its counters

pub mod diagnostics;
pub mod loader;

pub use diagnostics::ProbeOutcomes;
pub use loader::{
    attach_sys_enter, bump_memlock_rlimit, load_and_attach, load_ebpf_program, set_target_pid,
    validate_target,
};
