//! Append-only usage log
//!
//! One pipe-delimited row per usage record, flushed after every write so a
//! hard kill loses at most the record currently being written.

use crate::models::UsageRecord;
use chrono::SecondsFormat;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Field names of the log header, in column order.
pub const FIELDS: [&str; 3] = ["timestamp", "percent_cpu_usage", "used_memory"];

const DELIMITER: char = '|';

/// Append-only log file for usage records.
#[derive(Debug)]
pub struct UsageLog {
    writer: Option<BufWriter<File>>,
}

impl UsageLog {
    /// Create the log at `path`, truncating any existing file, and write the
    /// header line.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", FIELDS.join(&DELIMITER.to_string()))?;
        writer.flush()?;
        Ok(Self {
            writer: Some(writer),
        })
    }

    /// Append one record and flush it to the file before returning.
    pub fn append(&mut self, record: &UsageRecord) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "usage log is closed"))?;
        writeln!(
            writer,
            "{}{DELIMITER}{}{DELIMITER}{}",
            record.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
            record.percent_cpu_usage,
            record.used_memory,
        )?;
        writer.flush()
    }

    /// Flush and release the file handle. Safe to call more than once.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}
