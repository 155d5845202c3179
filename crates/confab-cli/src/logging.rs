use anyhow::{Context, Result};
use std::path::Path;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber.
///
/// - File: `<logs_dir>/confab.log.<date>`, rotated daily, filtered by
///   `RUST_LOG` (default INFO)
/// - Stderr: warnings and errors only, everything from DEBUG up with
///   `verbose`
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// whole run.
pub fn init(logs_dir: &Path, verbose: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(logs_dir, "confab.log"));
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    subscriber(file_writer, std::io::stderr, env_filter, verbose)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Tracing initialized");
    Ok(guard)
}

/// Each layer carries its own filter, so `RUST_LOG` never hides what
/// `verbose` asks stderr to show.
fn subscriber<F, E>(
    file_writer: F,
    stderr_writer: E,
    env_filter: EnvFilter,
    verbose: bool,
) -> impl Subscriber + Send + Sync + 'static
where
    F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(env_filter);

    let stderr_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let stderr_layer = fmt::layer()
        .with_writer(stderr_writer)
        .with_target(false)
        .compact()
        .with_filter(stderr_level);

    tracing_subscriber::registry().with(file_layer).with(stderr_layer)
}
