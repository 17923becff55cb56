//! The `crunch convert` command.

mod batch;
mod setup;
pub mod types;

pub use types::ReportFormat;

use clap::Args;
use crunch_core::{CandidateFilter, Config, Crunch, FileRecord, OutputFormat, Quality};
use std::path::PathBuf;
use std::time::Instant;

use batch::{convert_tree, write_single_record};
use setup::setup_converter;

/// Arguments for the `convert` command.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input image file, or directory to convert recursively
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output JPEG file, or output directory in tree mode
    #[arg(required = true)]
    pub output: PathBuf,

    /// Extensions to convert in tree mode (default: .jpg .jpeg .png)
    pub extensions: Vec<String>,

    /// Encoder quality (84-110; the baseline backend encodes 101-110 at 100)
    #[arg(short, long, allow_negative_numbers = true)]
    pub quality: Option<i64>,

    /// Regular expression a path must match in tree mode
    #[arg(short, long)]
    pub regexp: Option<String>,

    /// Number of files converted concurrently in tree mode
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Write a per-file report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format (defaults to the configured format)
    #[arg(long, value_enum)]
    pub report_format: Option<ReportFormat>,
}

/// Manual Default impl for constructing ConvertArgs outside of clap.
impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            extensions: Vec::new(),
            quality: None,
            regexp: None,
            parallel: None,
            report: None,
            report_format: None,
        }
    }
}

/// Where and how to write the run report.
pub(crate) struct ReportTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub pretty: bool,
}

/// Everything a conversion run needs, assembled by setup_converter().
pub(crate) struct ConvertContext {
    pub crunch: Crunch,
    pub input: PathBuf,
    pub output: PathBuf,
    pub quality: Quality,
    pub filter: CandidateFilter,
    pub parallel_workers: usize,
    pub report: Option<ReportTarget>,
}

/// Execute the convert command.
///
/// Single-file mode fails on the first error. Tree mode succeeds as long as
/// the walk ran, whatever happened to individual files.
pub async fn execute(args: ConvertArgs, config: Config) -> anyhow::Result<()> {
    let ctx = setup_converter(&args, config)?;

    if ctx.input.is_dir() {
        convert_tree(ctx).await
    } else {
        convert_single(ctx).await
    }
}

// ── Single-file conversion ─────────────────────────────────────────────────

async fn convert_single(ctx: ConvertContext) -> anyhow::Result<()> {
    let start = Instant::now();
    let result = ctx
        .crunch
        .convert_file(&ctx.input, &ctx.output, ctx.quality)
        .await;
    let elapsed = start.elapsed();

    let stats = result?;
    println!("{} ok, {:?}", ctx.input.display(), elapsed);

    if let Some(target) = &ctx.report {
        let record = FileRecord::from_result(
            ctx.input.clone(),
            ctx.output.clone(),
            &Ok(stats),
            elapsed,
        );
        write_single_record(target, &record)?;
    }

    Ok(())
}
