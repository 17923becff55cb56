//! Per-file outcomes and the aggregated run report.
//!
//! Tree mode never fails as a whole because a file failed: every outcome is
//! turned into a [`FileRecord`] and collected into a [`BatchReport`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::PipelineError;
use crate::normalize::PixelLayout;

/// Statistics for one successful conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertStats {
    /// Size of the source file in bytes
    pub input_bytes: u64,
    /// Size of the written JPEG in bytes
    pub output_bytes: u64,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Detected source format ("png", "jpeg", ...)
    pub format: String,
    /// Layout handed to the encoder
    pub layout: PixelLayout,
    /// Whether the pixels went through the generic RGBA8 conversion
    pub converted: bool,
}

/// Outcome of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Failed,
}

/// One line of the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute, normalized source path
    pub input: PathBuf,

    /// Absolute, normalized destination path
    pub output: PathBuf,

    pub status: FileStatus,

    /// Pipeline stage that failed ("io", "decode", "encode")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub input_bytes: u64,

    #[serde(default)]
    pub output_bytes: u64,

    /// Wall time spent on this file
    pub elapsed_ms: u64,
}

impl FileRecord {
    /// Build a record from the result of converting `input` into `output`.
    pub fn from_result(
        input: PathBuf,
        output: PathBuf,
        result: &Result<ConvertStats, PipelineError>,
        elapsed: Duration,
    ) -> Self {
        let elapsed_ms = elapsed.as_millis() as u64;
        match result {
            Ok(stats) => Self {
                input,
                output,
                status: FileStatus::Ok,
                stage: None,
                error: None,
                input_bytes: stats.input_bytes,
                output_bytes: stats.output_bytes,
                elapsed_ms,
            },
            Err(e) => Self {
                input,
                output,
                status: FileStatus::Failed,
                stage: Some(e.stage().to_string()),
                error: Some(e.to_string()),
                input_bytes: 0,
                output_bytes: 0,
                elapsed_ms,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == FileStatus::Ok
    }
}

/// Everything a tree-mode run did.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Converted or failed files, sorted by input path
    pub records: Vec<FileRecord>,

    /// Candidates skipped because the run had already handled them
    pub skipped: u64,

    /// Wall time for the whole walk
    pub elapsed: Duration,
}

/// Aggregate counters, suitable for serialization next to the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub elapsed_ms: u64,
}

impl BatchReport {
    pub fn succeeded(&self) -> u64 {
        self.records.iter().filter(|r| r.is_ok()).count() as u64
    }

    pub fn failed(&self) -> u64 {
        self.records.len() as u64 - self.succeeded()
    }

    /// Records of files that failed.
    pub fn failures(&self) -> impl Iterator<Item = &FileRecord> {
        self.records.iter().filter(|r| !r.is_ok())
    }

    pub fn summary(&self) -> BatchSummary {
        let ok = self.records.iter().filter(|r| r.is_ok());
        BatchSummary {
            succeeded: self.succeeded(),
            failed: self.failed(),
            skipped: self.skipped,
            input_bytes: ok.clone().map(|r| r.input_bytes).sum(),
            output_bytes: ok.map(|r| r.output_bytes).sum(),
            elapsed_ms: self.elapsed.as_millis() as u64,
        }
    }
}
