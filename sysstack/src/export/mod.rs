//! Trace export
//!
//! Writes every rendered syscall as one JSON object per line, so partial
//! files from an interrupted run stay readable.

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::ExportError;

/// JSON-lines writer
pub struct JsonLinesExporter<W: Write> {
    writer: W,
    written: usize,
}

impl JsonLinesExporter<BufWriter<File>> {
    /// Create (or truncate) the export file
    ///
    /// # Errors
    /// Returns an error if the file cannot be created
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path)
            .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonLinesExporter<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Append one event
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails
    pub fn write_event<T: Serialize>(&mut self, event: &T) -> Result<(), ExportError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of events written so far
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the number of events written
    ///
    /// # Errors
    /// Returns an error if the flush fails
    pub fn finish(mut self) -> Result<usize, ExportError> {
        self.writer.flush()?;
        Ok(self.written)
    }

    /// Flush and hand back the underlying writer
    ///
    /// # Errors
    /// Returns an error if the flush fails
    pub fn into_inner(mut self) -> Result<W, ExportError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::RenderedEvent;

    fn event(syscall: &str) -> RenderedEvent {
        RenderedEvent {
            timestamp_ns: 1_000,
            time: "12:00:00.000001".to_string(),
            syscall: syscall.to_string(),
            syscall_id: 0,
            stack_id: 0,
            frames: vec!["main (app.rs:3)".to_string()],
        }
    }

    #[test]
    fn test_one_object_per_line() {
        let mut exporter = JsonLinesExporter::new(Vec::new());
        exporter.write_event(&event("read")).unwrap();
        exporter.write_event(&event("write")).unwrap();
        assert_eq!(exporter.written(), 2);

        let output = String::from_utf8(exporter.into_inner().unwrap()).unwrap();
        let lines: Vec<serde_json::Value> =
            output.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["syscall"], "write");
        assert_eq!(lines[0]["frames"][0], "main (app.rs:3)");
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let result = JsonLinesExporter::create(Path::new("/nonexistent/dir/out.jsonl"));
        assert!(matches!(result, Err(ExportError::WriteFailed(_))));
    }
}
