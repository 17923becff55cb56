//! End-to-end tree-mode behaviour against a real filesystem.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crunch_core::{
    BaselineJpegEncoder, Config, Crunch, Encoder, EncoderFailure, NativeBuffer, Quality,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

/// Baseline backend that counts how often it is invoked.
#[derive(Default)]
struct CountingEncoder {
    calls: AtomicUsize,
}

impl Encoder for CountingEncoder {
    fn encode(&self, buffer: &NativeBuffer<'_>, quality: Quality) -> Result<Vec<u8>, EncoderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        BaselineJpegEncoder.encode(buffer, quality)
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

fn write_image(path: &Path, format: ImageFormat) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(24, 16, |x, y| Rgb([(x * 10) as u8, (y * 15) as u8, 128]));
    DynamicImage::ImageRgb8(img)
        .save_with_format(path, format)
        .unwrap();
}

/// Relative path -> bytes for every file under `root`.
fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, std::fs::read(e.path()).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn test_tree_mirrors_selected_files() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_image(&input.path().join("a.png"), ImageFormat::Png);
    std::fs::write(input.path().join("b.txt"), "not an image").unwrap();
    write_image(&input.path().join("sub/c.jpg"), ImageFormat::Jpeg);

    let crunch = Crunch::new(Config::default());
    let report = crunch
        .convert_tree(input.path(), output.path(), &[".png", ".jpg"], ".*", Quality::DEFAULT)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 0);

    let outputs: Vec<PathBuf> = snapshot(output.path()).into_keys().collect();
    assert_eq!(outputs, vec![PathBuf::from("a.jpg"), PathBuf::from("sub/c.jpg")]);
}

#[tokio::test]
async fn test_pattern_restricts_candidates() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_image(&input.path().join("001.png"), ImageFormat::Png);
    write_image(&input.path().join("cover.png"), ImageFormat::Png);

    let crunch = Crunch::new(Config::default());
    let report = crunch
        .convert_tree(input.path(), output.path(), &[".png"], r"/\d+\.png$", Quality::DEFAULT)
        .await
        .unwrap();

    assert_eq!(report.records.len(), 1);
    assert!(output.path().join("001.jpg").exists());
    assert!(!output.path().join("cover.jpg").exists());
}

#[tokio::test]
async fn test_in_place_conversion_runs_once() {
    let dir = tempfile::tempdir().unwrap();
    write_image(&dir.path().join("x.jpg"), ImageFormat::Jpeg);

    let encoder = Arc::new(CountingEncoder::default());
    let crunch = Crunch::with_encoder(Config::default(), encoder.clone());
    let report = crunch
        .convert_tree(dir.path(), dir.path(), &[".jpg"], "", Quality::DEFAULT)
        .await
        .unwrap();

    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.succeeded(), 1);
    assert_eq!(snapshot(dir.path()).len(), 1);
}

#[tokio::test]
async fn test_in_place_sibling_sharing_output_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write_image(&dir.path().join("a.jpg"), ImageFormat::Jpeg);
    write_image(&dir.path().join("a.png"), ImageFormat::Png);

    let encoder = Arc::new(CountingEncoder::default());
    let crunch = Crunch::with_encoder(Config::default(), encoder.clone());
    let report = crunch
        .convert_tree(dir.path(), dir.path(), &[".jpg", ".png"], "", Quality::DEFAULT)
        .await
        .unwrap();

    // a.jpg claims a.jpg first; a.png would clobber it and is skipped
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.skipped, 1);
    assert!(report.records[0].input.ends_with("a.jpg"));
}

/// Input root D holds D/out/x.jpg and D/x.jpg; output root is D/out.
///
/// D/out/x.jpg is walked first and converted into D/out/out/x.jpg. D/x.jpg
/// would then overwrite D/out/x.jpg, a file already handled as an input, so
/// it must be skipped whatever the worker count.
async fn run_nested_output_root(workers: usize) {
    let root = tempfile::tempdir().unwrap();
    let d = root.path();
    write_image(&d.join("out/x.jpg"), ImageFormat::Jpeg);
    write_image(&d.join("x.jpg"), ImageFormat::Jpeg);
    let original = std::fs::read(d.join("out/x.jpg")).unwrap();

    let mut config = Config::default();
    config.processing.parallel_workers = workers;
    let encoder = Arc::new(CountingEncoder::default());
    let crunch = Crunch::with_encoder(config, encoder.clone());
    let report = crunch
        .convert_tree(d, d.join("out"), &[".jpg"], "", Quality::DEFAULT)
        .await
        .unwrap();

    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1, "workers={workers}");
    assert_eq!(report.skipped, 1, "workers={workers}");
    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].input.ends_with("out/x.jpg"));
    assert!(report.records[0].output.ends_with("out/out/x.jpg"));
    assert!(d.join("out/out/x.jpg").exists());
    assert_eq!(std::fs::read(d.join("out/x.jpg")).unwrap(), original);
}

#[tokio::test]
async fn test_nested_output_root_sequential() {
    run_nested_output_root(1).await;
}

#[tokio::test]
async fn test_nested_output_root_parallel() {
    run_nested_output_root(4).await;
}

#[tokio::test]
async fn test_parallel_colliding_outputs_convert_once() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_image(&input.path().join("a.bmp"), ImageFormat::Bmp);
    write_image(&input.path().join("a.jpg"), ImageFormat::Jpeg);
    write_image(&input.path().join("a.png"), ImageFormat::Png);

    let mut config = Config::default();
    config.processing.parallel_workers = 4;
    let encoder = Arc::new(CountingEncoder::default());
    let crunch = Crunch::with_encoder(config, encoder.clone());
    let report = crunch
        .convert_tree(input.path(), output.path(), &[".bmp", ".jpg", ".png"], "", Quality::DEFAULT)
        .await
        .unwrap();

    // a.bmp is first in walk order and owns a.jpg
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.records.len(), 1);
    assert!(report.records[0].input.ends_with("a.bmp"));
    assert_eq!(snapshot(output.path()).len(), 1);
}

#[tokio::test]
async fn test_dotfile_is_converted() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_image(&input.path().join(".png"), ImageFormat::Png);

    let crunch = Crunch::new(Config::default());
    let report = crunch
        .convert_tree(input.path(), output.path(), &[".png"], "", Quality::DEFAULT)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 1);
    assert!(output.path().join(".jpg").exists());
}

#[tokio::test]
async fn test_corrupt_file_does_not_abort_batch() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    std::fs::write(input.path().join("broken.png"), b"\x89PNG\r\n\x1a\ngarbage").unwrap();
    write_image(&input.path().join("good.png"), ImageFormat::Png);

    let crunch = Crunch::new(Config::default());
    let report = crunch
        .convert_tree(input.path(), output.path(), &[".png"], "", Quality::DEFAULT)
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    let failure = report.failures().next().unwrap();
    assert!(failure.input.ends_with("broken.png"));
    assert_eq!(failure.stage.as_deref(), Some("decode"));

    let good = std::fs::metadata(output.path().join("good.jpg")).unwrap();
    assert!(good.len() > 0);
    assert!(!output.path().join("broken.jpg").exists());
}

#[tokio::test]
async fn test_repeated_runs_are_byte_identical() {
    let input = tempfile::tempdir().unwrap();
    write_image(&input.path().join("one.png"), ImageFormat::Png);
    write_image(&input.path().join("nested/two.bmp"), ImageFormat::Bmp);
    write_image(&input.path().join("nested/three.jpeg"), ImageFormat::Jpeg);

    let quality = Quality::new(92).unwrap();
    let extensions = [".png", ".bmp", ".jpeg"];
    let crunch = Crunch::new(Config::default());

    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    for out in [first.path(), second.path()] {
        let report = crunch
            .convert_tree(input.path(), out, &extensions, "", quality)
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 3);
    }

    let a = snapshot(first.path());
    assert!(a.contains_key(Path::new("nested/three.jpeg")));
    assert_eq!(a, snapshot(second.path()));
}

#[tokio::test]
async fn test_parallel_workers_match_sequential_output() {
    let input = tempfile::tempdir().unwrap();
    for i in 0..6 {
        write_image(&input.path().join(format!("dir{}/img{i}.png", i % 2)), ImageFormat::Png);
    }

    let sequential = tempfile::tempdir().unwrap();
    let parallel = tempfile::tempdir().unwrap();

    let crunch = Crunch::new(Config::default());
    crunch
        .convert_tree(input.path(), sequential.path(), &[".png"], "", Quality::DEFAULT)
        .await
        .unwrap();

    let mut config = Config::default();
    config.processing.parallel_workers = 4;
    let report = Crunch::new(config)
        .convert_tree(input.path(), parallel.path(), &[".png"], "", Quality::DEFAULT)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 6);
    let inputs: Vec<_> = report.records.iter().map(|r| r.input.clone()).collect();
    let mut sorted = inputs.clone();
    sorted.sort();
    assert_eq!(inputs, sorted);
    assert_eq!(snapshot(sequential.path()), snapshot(parallel.path()));
}
