//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

use crate::quality::Quality;

/// Extensions selected when neither the config nor the command line names any.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// Pattern that accepts every path.
pub const MATCH_ALL: &str = ".*";

/// Processing settings for tree mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of files converted concurrently (1 = strictly sequential)
    pub parallel_workers: usize,

    /// Extensions selected for conversion (leading dot optional)
    pub extensions: Vec<String>,

    /// Regular expression a path must match to be converted
    pub path_pattern: String,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 1,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            path_pattern: MATCH_ALL.to_string(),
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Encoder quality, 84..=110
    pub quality: Quality,
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum input file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 20000,
        }
    }
}

/// Run report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format ("json" or "jsonl")
    pub report_format: String,

    /// Pretty-print JSON reports
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            report_format: "jsonl".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
