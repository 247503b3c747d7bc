//! # Event Processing
//!
//! Turns raw `EVENTS` records into rendered stack traces.
//!
//! ## Per-Record Flow
//!
//! 1. Decode the 16-byte [`SyscallEvent`]; short records are logged and skipped
//! 2. Fetch the frames stored under `stack_id`; a failed lookup skips the record
//! 3. Symbolize every frame up to the first zero address
//! 4. Print (unless quiet) and append to the export file (if any)

use log::{debug, warn};
use serde::Serialize;
use std::io::Write;
use sysstack_common::SyscallEvent;

use super::boot_clock::BootClock;
use super::event_display::display_event;
use super::record_source::RecordSource;
use super::stack_source::StackSource;
use crate::domain::{ExportError, StackId, SyscallId};
use crate::export::JsonLinesExporter;
use crate::symbolization::Symbolizer;

/// One syscall with its symbolized user stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedEvent {
    /// Nanoseconds since boot, as stamped by the probe
    pub timestamp_ns: u64,
    /// Local wall-clock time, `HH:MM:SS.ffffff`
    pub time: String,
    pub syscall: String,
    pub syscall_id: u32,
    pub stack_id: i32,
    /// Innermost frame first
    pub frames: Vec<String>,
}

/// Consumer-side counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerStats {
    pub records: u64,
    pub frames: u64,
    pub short_records: u64,
    pub stack_lookups_failed: u64,
}

/// Encapsulates event processing logic and state
pub struct EventProcessor<W: Write> {
    quiet: bool,
    pub stats: ConsumerStats,

    symbolizer: Symbolizer,
    clock: BootClock,
    exporter: Option<JsonLinesExporter<W>>,
}

impl<W: Write> EventProcessor<W> {
    #[must_use]
    pub fn new(
        symbolizer: Symbolizer,
        clock: BootClock,
        exporter: Option<JsonLinesExporter<W>>,
        quiet: bool,
    ) -> Self {
        Self { quiet, stats: ConsumerStats::default(), symbolizer, clock, exporter }
    }

    /// Process one ring buffer record
    ///
    /// Returns the rendered event, or `None` if the record was skipped.
    ///
    /// # Errors
    /// Returns an error if the event cannot be written to the export file
    pub fn process_record<S: StackSource>(
        &mut self,
        bytes: &[u8],
        stacks: &S,
    ) -> Result<Option<RenderedEvent>, ExportError> {
        let Some(event) = SyscallEvent::from_ne_bytes(bytes) else {
            warn!("Received incomplete event ({} bytes)", bytes.len());
            self.stats.short_records += 1;
            return Ok(None);
        };
        self.stats.records += 1;

        let stack_id = StackId(event.stack_id);
        let frames = match stacks.frames(stack_id) {
            Ok(frames) => frames,
            Err(e) => {
                debug!("Skipping syscall {}: {e}", event.syscall_id);
                self.stats.stack_lookups_failed += 1;
                return Ok(None);
            }
        };

        let rendered = self.render(&event, &frames);
        self.stats.frames += rendered.frames.len() as u64;

        if !self.quiet {
            display_event(&rendered);
        }
        if let Some(exporter) = self.exporter.as_mut() {
            exporter.write_event(&rendered)?;
        }
        Ok(Some(rendered))
    }

    /// Process up to `max_records` records from `source`, returning how many were read
    ///
    /// Each record's space is released as soon as it has been processed.
    ///
    /// # Errors
    /// Returns an error if an event cannot be written to the export file
    pub fn drain<R: RecordSource, S: StackSource>(
        &mut self,
        source: &mut R,
        stacks: &S,
        max_records: usize,
    ) -> Result<usize, ExportError> {
        let mut read = 0;
        while read < max_records {
            let Some(record) = source.next_record() else {
                break;
            };
            self.process_record(&record, stacks)?;
            read += 1;
        }
        Ok(read)
    }

    /// Pick up newly JIT-compiled functions
    pub fn refresh_symbols(&mut self) {
        self.symbolizer.refresh_jit();
    }

    /// Flush and close the export file, returning the number of events written
    ///
    /// # Errors
    /// Returns an error if the final flush fails
    pub fn finish_export(&mut self) -> Result<Option<usize>, ExportError> {
        self.exporter.take().map(JsonLinesExporter::finish).transpose()
    }

    fn render(&self, event: &SyscallEvent, frames: &[u64]) -> RenderedEvent {
        let syscall = SyscallId(event.syscall_id);
        RenderedEvent {
            timestamp_ns: event.timestamp_ns,
            time: self.clock.format(event.timestamp_ns),
            syscall: syscall.name(),
            syscall_id: event.syscall_id,
            stack_id: event.stack_id,
            frames: self
                .symbolizer
                .resolve_stack(frames)
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemoryRing, MemoryStackTable};
    use crate::symbolization::PerfMap;
    use chrono::{Local, TimeZone};

    fn processor() -> EventProcessor<Vec<u8>> {
        let symbolizer = Symbolizer::new(Vec::new(), PerfMap::from_path("/nonexistent"));
        let boot = Local.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).single().unwrap();
        EventProcessor::new(
            symbolizer,
            BootClock::from_boot_time(boot),
            Some(JsonLinesExporter::new(Vec::new())),
            true,
        )
    }

    fn record(stack_id: i32) -> [u8; SyscallEvent::SIZE] {
        SyscallEvent { timestamp_ns: 2_000_000_000, syscall_id: 39, stack_id }.to_ne_bytes()
    }

    #[test]
    fn test_renders_frames_up_to_first_zero() {
        let table = MemoryStackTable::new();
        let id = table.store(&[0xAA, 0xBB]);
        let mut processor = processor();

        let rendered =
            processor.process_record(&record(i32::try_from(id).unwrap()), &table).unwrap().unwrap();

        assert_eq!(rendered.time, "12:00:02.000000");
        assert_eq!(rendered.syscall_id, 39);
        assert_eq!(rendered.frames, vec!["0xaa [unknown]", "0xbb [unknown]"]);
        assert_eq!(processor.stats.frames, 2);
        assert_eq!(processor.finish_export().unwrap(), Some(1));
    }

    #[test]
    fn test_short_record_is_skipped() {
        let table = MemoryStackTable::new();
        let mut processor = processor();

        assert!(processor.process_record(&[0u8; 8], &table).unwrap().is_none());
        assert_eq!(processor.stats.short_records, 1);
        assert_eq!(processor.stats.records, 0);
    }

    #[test]
    fn test_missing_stack_is_skipped() {
        let table = MemoryStackTable::new();
        let mut processor = processor();

        assert!(processor.process_record(&record(3), &table).unwrap().is_none());
        assert_eq!(processor.stats.records, 1);
        assert_eq!(processor.stats.stack_lookups_failed, 1);
        assert_eq!(processor.finish_export().unwrap(), Some(0));
    }

    #[test]
    fn test_drain_reads_what_is_left_in_the_ring() {
        let table = MemoryStackTable::new();
        let id = i32::try_from(table.store(&[0xAA])).unwrap();
        let mut ring = MemoryRing::new(4 * SyscallEvent::SIZE);
        for _ in 0..3 {
            let mut slot = ring.reserve_bytes(SyscallEvent::SIZE).unwrap();
            slot.bytes_mut().copy_from_slice(&record(id));
            ring.submit_bytes(slot);
        }
        let mut processor = processor();

        assert_eq!(processor.drain(&mut ring, &table, 2).unwrap(), 2);
        assert_eq!(ring.pending(), 1);
        assert_eq!(processor.drain(&mut ring, &table, usize::MAX).unwrap(), 1);
        assert_eq!(ring.occupied(), 0);
        assert_eq!(processor.drain(&mut ring, &table, usize::MAX).unwrap(), 0);
        assert_eq!(processor.finish_export().unwrap(), Some(3));
    }
}
