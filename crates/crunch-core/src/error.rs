//! Error types for the Crunch compression pipeline.
//!
//! Errors are organized by stage so that a per-file failure in tree mode can
//! be reported with its path and the stage that rejected it.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Crunch operations.
#[derive(Error, Debug)]
pub enum CrunchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Quality outside the accepted encoder domain
    #[error("Invalid quality {value} (must be >= {min} and <= {max})")]
    InvalidQuality { value: i64, min: u8, max: u8 },

    /// Quality text that is not an integer at all
    #[error("Invalid quality {0:?} (expected an integer)")]
    QualityNotInteger(String),

    /// Path-inclusion pattern failed to compile
    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-file pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Open, read, write or mkdir failure
    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image container is corrupt or undecodable
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// No registered decoder recognizes the file
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// File exceeds size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Image dimensions exceed limit
    #[error("Image too large: {path} ({width}x{height} > {max_dim})")]
    ImageTooLarge {
        path: PathBuf,
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// The encoder rejected valid input
    #[error("Encode failed for {path}: {message}")]
    Encode { path: PathBuf, message: String },
}

impl PipelineError {
    /// Short stage label used in reports and log lines.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Io { .. } => "io",
            PipelineError::Decode { .. }
            | PipelineError::UnsupportedFormat { .. }
            | PipelineError::FileTooLarge { .. }
            | PipelineError::ImageTooLarge { .. } => "decode",
            PipelineError::Encode { .. } => "encode",
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Opaque failure signalled by an [`Encoder`](crate::encode::Encoder) backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct EncoderFailure(pub String);

/// Convenience type alias for Crunch results.
pub type Result<T> = std::result::Result<T, CrunchError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
