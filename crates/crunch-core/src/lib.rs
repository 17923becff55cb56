//! Crunch Core - perceptual JPEG compression orchestration.
//!
//! Crunch converts images into JPEG through an opaque encoder backend, either
//! one file at a time or over a whole directory tree.
//!
//! # Architecture
//!
//! ```text
//! walk → filter → derive output → dedup → read → decode → normalize → encode → write → report
//! ```
//!
//! The normalizer hands the encoder Gray8, RGB8 or RGBA8 bytes, borrowing the
//! decoded pixels whenever their layout already fits. Tree mode records every
//! per-file failure in a [`BatchReport`] and keeps walking.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crunch_core::{Config, Crunch, Quality};
//!
//! #[tokio::main]
//! async fn main() -> crunch_core::Result<()> {
//!     let crunch = Crunch::new(Config::load()?);
//!     let report = crunch
//!         .convert_tree("./photos", "./compressed", &[".png", ".jpg"], ".*", Quality::new(90)?)
//!         .await?;
//!     println!("{} converted, {} failed", report.succeeded(), report.failed());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod encode;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod quality;
pub mod report;

// Re-exports for convenient access
pub use config::Config;
pub use encode::{BaselineJpegEncoder, Encoder};
pub use error::{ConfigError, CrunchError, EncoderFailure, PipelineError, PipelineResult, Result};
pub use normalize::{classify, normalize, NativeBuffer, NativePath, PixelLayout, SourceImage};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{BatchJob, CandidateFilter, Converter, SeenSet};
pub use quality::Quality;
pub use report::{BatchReport, BatchSummary, ConvertStats, FileRecord, FileStatus};

use std::path::Path;
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crunch compressor - the main entry point.
pub struct Crunch {
    config: Config,
    converter: Arc<Converter>,
}

impl Crunch {
    /// Create a compressor using the baseline JPEG backend.
    pub fn new(config: Config) -> Self {
        let converter = Arc::new(Converter::new(&config));
        Self { config, converter }
    }

    /// Create a compressor around a specific encoder backend.
    pub fn with_encoder(config: Config, encoder: Arc<dyn Encoder>) -> Self {
        let converter = Arc::new(Converter::with_encoder(&config, encoder));
        Self { config, converter }
    }

    /// Get a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared converter, for callers building their own [`BatchJob`].
    pub fn converter(&self) -> Arc<Converter> {
        Arc::clone(&self.converter)
    }

    /// Convert a single file. The first error is returned as fatal.
    pub async fn convert_file(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        quality: Quality,
    ) -> Result<ConvertStats> {
        tracing::debug!("Encoder backend: {}", self.converter.encoder_name());
        let stats = self
            .converter
            .convert(input.as_ref(), output.as_ref(), quality)
            .await?;
        Ok(stats)
    }

    /// Convert every candidate under `input_root` into `output_root`.
    ///
    /// Only an invalid pattern fails the call; per-file errors end up in the
    /// report. Uses a fresh [`SeenSet`] and the configured worker count.
    pub async fn convert_tree<S: AsRef<str>>(
        &self,
        input_root: impl AsRef<Path>,
        output_root: impl AsRef<Path>,
        extensions: &[S],
        pattern: &str,
        quality: Quality,
    ) -> Result<BatchReport> {
        let filter = CandidateFilter::new(extensions, pattern)?;
        let job = BatchJob::new(
            input_root.as_ref(),
            output_root.as_ref(),
            filter,
            quality,
        )
        .with_parallel_workers(self.config.processing.parallel_workers);
        Ok(job.run(self.converter(), Arc::new(SeenSet::new())).await)
    }
}
