//! Converter setup: quality validation, config overrides, path expansion.

use crunch_core::{CandidateFilter, Config, Crunch, OutputFormat, Quality};
use std::path::{Path, PathBuf};

use super::{ConvertArgs, ConvertContext, ReportTarget};

/// Expand a leading `~` in a path argument.
fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

/// Validate arguments, apply overrides and assemble the conversion context.
///
/// Quality is checked first, before touching the filesystem.
pub fn setup_converter(args: &ConvertArgs, mut config: Config) -> anyhow::Result<ConvertContext> {
    let quality = match args.quality {
        Some(value) => Quality::new(value)?,
        None => config.encode.quality,
    };
    config.encode.quality = quality;

    let input = expand(&args.input);
    let output = expand(&args.output);
    if !input.exists() {
        anyhow::bail!(
            "Input path does not exist: {:?}\n\n  Hint: Check the file path and try again.",
            input
        );
    }

    if let Some(parallel) = args.parallel {
        if parallel == 0 {
            anyhow::bail!("--parallel must be at least 1");
        }
        config.processing.parallel_workers = parallel;
    }
    if !args.extensions.is_empty() {
        config.processing.extensions = args.extensions.clone();
    }
    if let Some(regexp) = &args.regexp {
        config.processing.path_pattern = regexp.clone();
    }

    let filter = CandidateFilter::new(
        &config.processing.extensions,
        &config.processing.path_pattern,
    )?;

    let report = match &args.report {
        Some(path) => {
            let format = match args.report_format {
                Some(format) => format.into(),
                None => OutputFormat::parse(&config.output.report_format)
                    .unwrap_or(OutputFormat::JsonLines),
            };
            Some(ReportTarget {
                path: expand(path),
                format,
                pretty: config.output.pretty,
            })
        }
        None => None,
    };

    tracing::debug!(
        "quality={} workers={} extensions={:?} pattern={:?}",
        quality,
        config.processing.parallel_workers,
        filter.extensions(),
        config.processing.path_pattern
    );

    let parallel_workers = config.processing.parallel_workers;
    Ok(ConvertContext {
        crunch: Crunch::new(config),
        input,
        output,
        quality,
        filter,
        parallel_workers,
        report,
    })
}
