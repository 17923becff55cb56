//! Run report output as JSON or JSON Lines.

use serde::Serialize;
use std::io::{self, Write};

use crate::report::{BatchReport, FileRecord};

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A single JSON document with summary and file list
    Json,
    /// One record per line, summary last
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: crate::report::BatchSummary,
    files: &'a [FileRecord],
}

#[derive(Serialize)]
struct SummaryLine {
    summary: crate::report::BatchSummary,
}

/// Writes file records and run summaries.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    records_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new report writer.
    ///
    /// `pretty` only affects the JSON format; JSON Lines is always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            records_written: 0,
        }
    }

    fn write_value<T: Serialize>(&mut self, value: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Write a whole run report.
    pub fn write_report(&mut self, report: &BatchReport) -> io::Result<()> {
        let summary = report.summary();
        match self.format {
            OutputFormat::Json => {
                self.write_value(&ReportDocument {
                    summary,
                    files: &report.records,
                })?;
            }
            OutputFormat::JsonLines => {
                for record in &report.records {
                    self.write_value(record)?;
                }
                self.write_value(&SummaryLine { summary })?;
            }
        }
        self.records_written += report.records.len();
        Ok(())
    }

    /// Write a single record (single-file mode).
    pub fn write_record(&mut self, record: &FileRecord) -> io::Result<()> {
        self.write_value(record)?;
        self.records_written += 1;
        Ok(())
    }

    /// Number of file records written so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
