//! Pipeline orchestration: single-file conversion and tree-mode batches.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::Config;
use crate::encode::{BaselineJpegEncoder, Encoder};
use crate::error::{PipelineError, PipelineResult};
use crate::normalize::normalize;
use crate::quality::Quality;
use crate::report::{BatchReport, ConvertStats, FileRecord};

use super::decode::{format_to_string, ImageDecoder};
use super::discovery::{walk_files, CandidateFilter};
use super::paths::{derive_output_path, normalize_path};
use super::seen::SeenSet;
use super::validate::Validator;

/// Converts one image file into a JPEG.
pub struct Converter {
    decoder: ImageDecoder,
    validator: Validator,
    encoder: Arc<dyn Encoder>,
}

impl Converter {
    /// Create a converter using the baseline JPEG backend.
    pub fn new(config: &Config) -> Self {
        Self::with_encoder(config, Arc::new(BaselineJpegEncoder))
    }

    /// Create a converter around a specific encoder backend.
    pub fn with_encoder(config: &Config, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            decoder: ImageDecoder::new(),
            validator: Validator::new(config.limits.clone()),
            encoder,
        }
    }

    /// Name of the encoder backend in use.
    pub fn encoder_name(&self) -> &'static str {
        self.encoder.name()
    }

    /// Convert `input` into `output` on the blocking thread pool.
    pub async fn convert(
        self: &Arc<Self>,
        input: &Path,
        output: &Path,
        quality: Quality,
    ) -> PipelineResult<ConvertStats> {
        let this = Arc::clone(self);
        let input_owned = input.to_path_buf();
        let output_owned = output.to_path_buf();

        tokio::task::spawn_blocking(move || this.convert_blocking(&input_owned, &output_owned, quality))
            .await
            .unwrap_or_else(|e| {
                Err(PipelineError::Encode {
                    path: output.to_path_buf(),
                    message: format!("Task join error: {}", e),
                })
            })
    }

    /// Read, decode, normalize, encode and write one file.
    ///
    /// The input is fully read before the output is written, so `input` and
    /// `output` may be the same file. Existing outputs are overwritten.
    pub fn convert_blocking(
        &self,
        input: &Path,
        output: &Path,
        quality: Quality,
    ) -> PipelineResult<ConvertStats> {
        let start = Instant::now();
        tracing::debug!("Converting: {:?} -> {:?}", input, output);

        let size = std::fs::metadata(input)
            .map_err(|e| PipelineError::io(input, e))?
            .len();
        self.validator.check_file_size(input, size)?;
        let bytes = std::fs::read(input).map_err(|e| PipelineError::io(input, e))?;

        let (width, height) = self.decoder.dimensions(&bytes, input)?;
        self.validator.check_dimensions(input, width, height)?;

        let decoded = self.decoder.decode_bytes(&bytes, input)?;
        tracing::trace!("  Decode: {:?}", start.elapsed());

        let buffer = normalize(&decoded.image);
        let layout = buffer.layout();
        let converted = !buffer.is_borrowed();
        tracing::trace!("  Normalize: {:?} (converted: {})", layout, converted);

        let jpeg = self
            .encoder
            .encode(&buffer, quality)
            .map_err(|e| PipelineError::Encode {
                path: output.to_path_buf(),
                message: e.to_string(),
            })?;
        tracing::trace!("  Encode: {:?}", start.elapsed());

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
        std::fs::write(output, &jpeg).map_err(|e| PipelineError::io(output, e))?;

        tracing::debug!(
            "Converted {:?} in {:?} ({}x{}, {} -> {} bytes)",
            input,
            start.elapsed(),
            decoded.width,
            decoded.height,
            bytes.len(),
            jpeg.len()
        );

        Ok(ConvertStats {
            input_bytes: bytes.len() as u64,
            output_bytes: jpeg.len() as u64,
            width: decoded.width,
            height: decoded.height,
            format: format_to_string(decoded.format),
            layout,
            converted,
        })
    }
}

/// One tree-mode run over an input root.
pub struct BatchJob {
    input_root: PathBuf,
    output_root: PathBuf,
    filter: CandidateFilter,
    quality: Quality,
    parallel_workers: usize,
}

impl BatchJob {
    pub fn new(
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        filter: CandidateFilter,
        quality: Quality,
    ) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            filter,
            quality,
            parallel_workers: 1,
        }
    }

    /// Convert up to `workers` files at once (minimum 1).
    pub fn with_parallel_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = workers.max(1);
        self
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Run the batch, sharing `seen` with anything else using the same ledger.
    pub async fn run(&self, converter: Arc<Converter>, seen: Arc<SeenSet>) -> BatchReport {
        self.run_with_progress(converter, seen, |_| {}).await
    }

    /// Run the batch, calling `on_record` as each file finishes.
    ///
    /// Per-file failures are recorded, never returned. Candidates whose input
    /// or output is already in `seen` are skipped. The output path is marked
    /// before a file is converted and the input path after; with one worker
    /// each candidate is checked only once the previous file is marked.
    pub async fn run_with_progress<F>(
        &self,
        converter: Arc<Converter>,
        seen: Arc<SeenSet>,
        mut on_record: F,
    ) -> BatchReport
    where
        F: FnMut(&FileRecord),
    {
        let start = Instant::now();
        let permits = Arc::new(Semaphore::new(self.parallel_workers));
        let mut tasks: JoinSet<FileRecord> = JoinSet::new();
        let mut report = BatchReport::default();

        tracing::debug!(
            "Walking {:?} -> {:?} with {} worker(s)",
            self.input_root,
            self.output_root,
            self.parallel_workers
        );

        for path in walk_files(&self.input_root) {
            if !self.filter.accepts(&path) {
                continue;
            }

            let output = derive_output_path(&self.input_root, &self.output_root, &path);
            let input = normalize_path(&path);

            // Wait for a worker first so every finished file is marked
            // before this candidate is checked.
            let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
                break;
            };
            while let Some(joined) = tasks.try_join_next() {
                Self::collect(joined, &mut report, &mut on_record);
            }

            if !seen.claim(&input, &output) {
                tracing::debug!("Already handled this run, skipping: {:?}", input);
                report.skipped += 1;
                continue;
            }

            let converter = Arc::clone(&converter);
            let seen = Arc::clone(&seen);
            let quality = self.quality;
            tasks.spawn(async move {
                let _permit = permit;
                let started = Instant::now();
                let result = converter.convert(&input, &output, quality).await;
                seen.mark(&input);
                FileRecord::from_result(input, output, &result, started.elapsed())
            });
        }

        while let Some(joined) = tasks.join_next().await {
            Self::collect(joined, &mut report, &mut on_record);
        }

        report.records.sort_by(|a, b| a.input.cmp(&b.input));
        report.elapsed = start.elapsed();
        report
    }

    fn collect<F>(
        joined: Result<FileRecord, tokio::task::JoinError>,
        report: &mut BatchReport,
        on_record: &mut F,
    ) where
        F: FnMut(&FileRecord),
    {
        match joined {
            Ok(record) => {
                if record.is_ok() {
                    tracing::info!(
                        "{} ok, {}ms",
                        record.input.display(),
                        record.elapsed_ms
                    );
                } else {
                    tracing::error!(
                        "{} failed: {}",
                        record.input.display(),
                        record.error.as_deref().unwrap_or("unknown error")
                    );
                }
                on_record(&record);
                report.records.push(record);
            }
            Err(e) => tracing::error!("Conversion task aborted: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EncoderFailure;
    use crate::normalize::NativeBuffer;
    use image::{DynamicImage, ImageFormat};

    struct FailingEncoder;

    impl Encoder for FailingEncoder {
        fn encode(&self, _: &NativeBuffer<'_>, _: Quality) -> Result<Vec<u8>, EncoderFailure> {
            Err(EncoderFailure("pathological input".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn write_png(path: &Path) {
        let img = DynamicImage::new_rgb8(16, 16);
        img.save_with_format(path, ImageFormat::Png).unwrap();
    }

    #[test]
    fn test_convert_blocking_writes_jpeg_and_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        let output = dir.path().join("nested/deeper/a.jpg");
        write_png(&input);

        let converter = Converter::new(&Config::default());
        let stats = converter
            .convert_blocking(&input, &output, Quality::DEFAULT)
            .unwrap();

        let written = std::fs::read(&output).unwrap();
        assert_eq!(&written[..2], &[0xFF, 0xD8]);
        assert_eq!(stats.output_bytes, written.len() as u64);
        assert_eq!(stats.format, "png");
        assert!(!stats.converted);
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter = Converter::new(&Config::default());
        let err = converter
            .convert_blocking(
                &dir.path().join("absent.png"),
                &dir.path().join("out.jpg"),
                Quality::DEFAULT,
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[test]
    fn test_encoder_failure_is_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        write_png(&input);

        let converter = Converter::with_encoder(&Config::default(), Arc::new(FailingEncoder));
        let err = converter
            .convert_blocking(&input, &dir.path().join("a.jpg"), Quality::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Encode { .. }));
        assert!(err.to_string().contains("pathological input"));
        assert!(!dir.path().join("a.jpg").exists());
    }

    #[test]
    fn test_dimension_limit_applies() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.png");
        write_png(&input);

        let mut config = Config::default();
        config.limits.max_image_dimension = 8;
        let err = Converter::new(&config)
            .convert_blocking(&input, &dir.path().join("a.jpg"), Quality::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, PipelineError::ImageTooLarge { .. }));
    }

    #[test]
    fn test_file_size_limit_applies_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("huge.png");
        std::fs::write(&input, vec![0u8; 1024 * 1024 + 1]).unwrap();

        let mut config = Config::default();
        config.limits.max_file_size_mb = 1;
        let err = Converter::new(&config)
            .convert_blocking(&input, &dir.path().join("huge.jpg"), Quality::DEFAULT)
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileTooLarge { max_mb: 1, .. }));
    }

    #[test]
    fn test_dimension_limit_uses_header_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("partial.bmp");
        let mut bytes = std::io::Cursor::new(Vec::new());
        DynamicImage::new_rgb8(64, 64)
            .write_to(&mut bytes, ImageFormat::Bmp)
            .unwrap();
        let mut bytes = bytes.into_inner();
        bytes.truncate(54 + 100);
        std::fs::write(&input, &bytes).unwrap();

        let mut config = Config::default();
        config.limits.max_image_dimension = 32;
        let err = Converter::new(&config)
            .convert_blocking(&input, &dir.path().join("partial.jpg"), Quality::DEFAULT)
            .unwrap_err();
        // The truncated pixel data would fail to decode; the limit fires first.
        assert!(matches!(err, PipelineError::ImageTooLarge { width: 64, .. }));
    }

    #[tokio::test]
    async fn test_convert_async_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.jpg");
        DynamicImage::new_luma8(12, 12)
            .save_with_format(&path, ImageFormat::Jpeg)
            .unwrap();

        let converter = Arc::new(Converter::new(&Config::default()));
        let stats = converter
            .convert(&path, &path, Quality::new(95).unwrap())
            .await
            .unwrap();
        assert_eq!(stats.format, "jpeg");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), stats.output_bytes);
    }

    #[tokio::test]
    async fn test_batch_records_encoder_failures_and_continues() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_png(&input.path().join("a.png"));
        write_png(&input.path().join("b.png"));

        let converter = Arc::new(Converter::with_encoder(
            &Config::default(),
            Arc::new(FailingEncoder),
        ));
        let filter = CandidateFilter::new(&[".png"], "").unwrap();
        let job = BatchJob::new(input.path(), output.path(), filter, Quality::DEFAULT);

        let mut seen_records = 0;
        let report = job
            .run_with_progress(converter, Arc::new(SeenSet::new()), |_| seen_records += 1)
            .await;

        assert_eq!(seen_records, 2);
        assert_eq!(report.failed(), 2);
        assert!(report
            .failures()
            .all(|r| r.stage.as_deref() == Some("encode")));
    }

    #[tokio::test]
    async fn test_shared_seen_set_skips_second_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_png(&input.path().join("a.png"));

        let converter = Arc::new(Converter::new(&Config::default()));
        let seen = Arc::new(SeenSet::new());
        let job = BatchJob::new(
            input.path(),
            output.path(),
            CandidateFilter::new(&[".png"], "").unwrap(),
            Quality::DEFAULT,
        );

        let first = job.run(Arc::clone(&converter), Arc::clone(&seen)).await;
        assert_eq!(first.succeeded(), 1);

        let second = job.run(converter, seen).await;
        assert_eq!(second.records.len(), 0);
        assert_eq!(second.skipped, 1);
    }
}
