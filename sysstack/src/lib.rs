//! # sysstack - Per-Syscall User Stack Tracer
//!
//! sysstack attaches an eBPF probe to the `raw_syscalls/sys_enter` tracepoint
//! and, for every system call made by one target process, captures the
//! user-space call stack that led to it. Userspace symbolizes the stacks and
//! prints them as they arrive.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Target Process                            │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ every syscall
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 sys_enter probe (Kernel)                        │
//! │  TARGET_PID ─▶ STACK_TRACES ─▶ EVENTS (ring buffer)             │
//! │  filter        capture          reserve / populate / submit     │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ 16-byte SyscallEvent records
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    sysstack (This Crate)                        │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    Probe     │   │   Consumer   │──▶│    Export    │         │
//! │  │   (loader)   │   │ (ring drain) │   │ (JSON lines) │         │
//! │  └──────────────┘   └──────┬───────┘   └──────────────┘         │
//! │                            ▼                                    │
//! │                     ┌──────────────┐                            │
//! │                     │ Symbolizer   │                            │
//! │                     │ (DWARF, JIT) │                            │
//! │                     └──────────────┘                            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`probe`]: load the eBPF object, set the target, attach, read counters
//! - [`consumer`]: decode records, look up stacks, render and print them
//! - [`symbolization`]: `/proc/<pid>/maps`, ELF/DWARF and JIT perf maps
//! - [`model`]: in-memory versions of the probe's maps, for running the
//!   probe pipeline off-kernel
//! - [`export`]: JSON-lines output
//! - [`cli`], [`preflight`], [`process_lookup`]: command-line front end
//! - [`signals`]: SIGINT and SIGTERM handling for the drain loop
//! - [`domain`]: newtypes and error enums
//!
//! ## Typical Usage
//!
//! ```bash
//! sudo sysstack --pid <PID>
//! sudo sysstack node --duration 10 --export syscalls.jsonl
//! ```

pub mod cli;
pub mod consumer;
pub mod domain;
pub mod export;
pub mod model;
pub mod preflight;
pub mod probe;
pub mod process_lookup;
pub mod signals;
pub mod symbolization;
pub mod syscalls;
