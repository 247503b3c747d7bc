// Elapsed-time conversion loses precision for display purposes
#![allow(clippy::cast_precision_loss)]

use std::fmt::Write as _;
use std::time::Duration;

use super::event_processor::{ConsumerStats, RenderedEvent};
use crate::probe::ProbeOutcomes;

/// Header line plus one indented line per frame
#[must_use]
pub fn format_event(event: &RenderedEvent) -> String {
    let mut out = format!(
        "{} {} (id={}, stack={})",
        event.time, event.syscall, event.syscall_id, event.stack_id
    );
    for (i, frame) in event.frames.iter().enumerate() {
        let _ = write!(out, "\n    [{i:>2}] {frame}");
    }
    out
}

/// Print a rendered event to stdout
pub fn display_event(event: &RenderedEvent) {
    println!("{}\n", format_event(event));
}

/// Print the end-of-run summary to stderr
pub fn display_summary(
    exit_reason: &str,
    elapsed: Duration,
    stats: &ConsumerStats,
    outcomes: Option<&ProbeOutcomes>,
) {
    eprintln!(
        "\n{}: {:.1}s, {} syscalls ({} frames, {} stack lookups failed, {} short records)",
        exit_reason,
        elapsed.as_secs_f64(),
        stats.records,
        stats.frames,
        stats.stack_lookups_failed,
        stats.short_records,
    );
    if let Some(outcomes) = outcomes {
        eprintln!("{outcomes}");
    }
}
