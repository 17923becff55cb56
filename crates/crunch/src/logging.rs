//! Tracing subscriber setup.
//!
//! Everything goes to stderr; stdout carries the per-file `ok` lines.

use crunch_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `--verbose` raises anything quieter than debug to debug.
fn effective_level(configured: &str, verbose: bool) -> &str {
    match (verbose, configured) {
        (true, "trace") | (false, _) => configured,
        (true, _) => "debug",
    }
}

/// Build the filter. `RUST_LOG` wins over the configured level.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber from the `[logging]` section and CLI flags.
pub fn init_from_config(config: &Config, verbose: bool, json_logs: bool) {
    let filter = build_filter(effective_level(&config.logging.level, verbose));
    let json = json_logs || config.logging.format == "json";

    let installed = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if let Err(e) = installed {
        eprintln!("Warning: logging already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_quiet_levels() {
        assert_eq!(effective_level("info", true), "debug");
        assert_eq!(effective_level("warn", true), "debug");
        assert_eq!(effective_level("trace", true), "trace");
    }

    #[test]
    fn configured_level_kept_without_verbose() {
        assert_eq!(effective_level("warn", false), "warn");
        assert_eq!(effective_level("trace", false), "trace");
    }
}
