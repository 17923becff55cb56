//! Tree-mode conversion with progress display, run report and summary.

use std::fs::File;
use std::io::BufWriter;
use std::sync::Arc;
use std::time::Duration;

use crunch_core::{BatchJob, BatchReport, BatchSummary, FileRecord, OutputWriter, SeenSet};
use indicatif::{ProgressBar, ProgressStyle};

use super::{ConvertContext, ReportTarget};

/// Convert every selected file under the input directory.
///
/// Per-file failures are logged and counted; they never fail the command.
pub async fn convert_tree(ctx: ConvertContext) -> anyhow::Result<()> {
    let job = BatchJob::new(&ctx.input, &ctx.output, ctx.filter, ctx.quality)
        .with_parallel_workers(ctx.parallel_workers);

    tracing::info!(
        "Converting {:?} -> {:?} at quality {}",
        job.input_root(),
        job.output_root(),
        ctx.quality
    );

    let progress = create_progress_spinner();
    let report = job
        .run_with_progress(ctx.crunch.converter(), Arc::new(SeenSet::new()), |record| {
            progress.inc(1);
            if record.is_ok() {
                progress.suspend(|| {
                    println!(
                        "{} ok, {:?}",
                        record.input.display(),
                        Duration::from_millis(record.elapsed_ms)
                    )
                });
            }
            if let Some(name) = record.input.file_name() {
                progress.set_message(name.to_string_lossy().into_owned());
            }
        })
        .await;
    progress.finish_and_clear();

    if let Some(target) = &ctx.report {
        write_report(target, &report)?;
    }

    for failure in report.failures() {
        tracing::warn!(
            "Failed: {} ({})",
            failure.input.display(),
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }

    print_summary(&report.summary());
    Ok(())
}

/// Write a whole run report to its target.
fn write_report(target: &ReportTarget, report: &BatchReport) -> anyhow::Result<()> {
    let file = File::create(&target.path)?;
    let mut writer = OutputWriter::new(BufWriter::new(file), target.format, target.pretty);
    writer.write_report(report)?;
    writer.flush()?;
    tracing::info!("Report written to {:?}", target.path);
    Ok(())
}

/// Write the record of a single-file conversion to its target.
pub fn write_single_record(target: &ReportTarget, record: &FileRecord) -> anyhow::Result<()> {
    let file = File::create(&target.path)?;
    let mut writer = OutputWriter::new(BufWriter::new(file), target.format, target.pretty);
    writer.write_record(record)?;
    writer.flush()?;
    tracing::info!("Report written to {:?}", target.path);
    Ok(())
}

/// Spinner for tree mode; the walk is lazy so there is no known total.
fn create_progress_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] {pos} file(s) {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message("walking...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Output size as a percentage of input size.
fn size_ratio(summary: &BatchSummary) -> f64 {
    if summary.input_bytes == 0 {
        0.0
    } else {
        summary.output_bytes as f64 / summary.input_bytes as f64 * 100.0
    }
}

/// Print a formatted summary table after tree mode.
fn print_summary(summary: &BatchSummary) {
    let total = summary.succeeded + summary.failed + summary.skipped;
    let secs = summary.elapsed_ms as f64 / 1000.0;
    let rate = if secs > 0.0 {
        summary.succeeded as f64 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Succeeded:    {:>8}", summary.succeeded);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    if summary.skipped > 0 {
        eprintln!("    Skipped:      {:>8}", summary.skipped);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", total);
    eprintln!("    Size:         {:>7.1}%", size_ratio(summary));
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", rate);
    eprintln!("  ====================================");
}
