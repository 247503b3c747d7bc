//! Structured error types for sysstack
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::{Pid, StackId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TracerError {
    #[error("Process {0} not found")]
    ProcessNotFound(Pid),

    #[error("Invalid target {0}: pid 0 never matches any task")]
    InvalidTarget(Pid),

    #[error("{0} map not found in eBPF object")]
    MapNotFound(&'static str),

    #[error("{0} program not found in eBPF object")]
    ProgramNotFound(&'static str),

    #[error("Failed to attach {program} to {category}/{name}: {error}")]
    ProbeAttachFailed { program: String, category: String, name: String, error: String },

    #[error("Failed to read /proc/{0}/maps")]
    MemoryMapsParseFailed(Pid),

    #[error("Invalid stack trace ID: {0}")]
    InvalidStackId(StackId),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Ebpf(#[from] aya::EbpfError),

    #[error(transparent)]
    Map(#[from] aya::maps::MapError),

    #[error(transparent)]
    Program(#[from] aya::programs::ProgramError),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write export file: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
