//! ---
//! lgate_section: "04-configuration"
//! lgate_subsection: "module"
//! lgate_type: "source"
//! lgate_scope: "code"
//! lgate_description: "Tracing subscriber bootstrap for gated applications."
//! lgate_version: "v0.0.0-prealpha"
//! lgate_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Filter override checked before `RUST_LOG`.
pub const LOG_ENV: &str = "LGATE_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

// Dropping a guard stops its writer thread; both live for the process.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static CONSOLE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Available console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Install the process-wide subscriber described by `config`.
///
/// The console layer writes to stderr so stdout stays free for command
/// output. A second call leaves the first subscriber in place.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(console_guard);

    let file_sink = if config.file {
        Some(file_layer(service_name, config)?)
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(resolve_filter(
            std::env::var(LOG_ENV).ok(),
            std::env::var("RUST_LOG").ok(),
        ))
        .with(console_layer(config.format, console_writer))
        .with(file_sink)
        .try_init()
        .is_ok();

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        file = config.file,
        installed,
        "tracing initialised"
    );
    Ok(())
}

fn console_layer<S>(format: LogFormat, writer: NonBlocking) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    let layer = fmt::layer().with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::StructuredJson => layer.with_target(false).json().with_writer(writer).boxed(),
        LogFormat::Pretty => layer.with_target(true).with_writer(writer).boxed(),
    }
}

fn file_layer<S>(service_name: &str, config: &LoggingConfig) -> Result<BoxedLayer<S>>
where
    S: tracing::Subscriber + for<'span> LookupSpan<'span>,
{
    std::fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "unable to create log directory {}",
            config.directory.display()
        )
    })?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    let appender = daily(&config.directory, format!("{prefix}-{service_name}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    Ok(fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(writer)
        .boxed())
}

/// Pick the first usable directive: `LGATE_LOG`, then `RUST_LOG`, then `info`.
fn resolve_filter(lgate_log: Option<String>, rust_log: Option<String>) -> EnvFilter {
    for (source, directive) in [(LOG_ENV, lgate_log), ("RUST_LOG", rust_log)] {
        let Some(directive) = directive.filter(|value| !value.trim().is_empty()) else {
            continue;
        };
        match EnvFilter::try_new(&directive) {
            Ok(filter) => return filter,
            Err(err) => eprintln!("invalid {source} directive ({err}); ignoring it"),
        }
    }
    EnvFilter::new(DEFAULT_DIRECTIVE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lgate_log_wins_over_rust_log() {
        let filter = resolve_filter(Some("debug".into()), Some("error".into()));
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn invalid_directives_fall_through() {
        let filter = resolve_filter(Some("lgate=bogus".into()), Some("warn".into()));
        assert_eq!(filter.to_string(), "warn");
        let filter = resolve_filter(None, Some("  ".into()));
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn init_creates_log_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: Some("unit".into()),
            file: true,
        };
        init_tracing("lgate-test", &config).expect("tracing init");
        assert!(config.directory.is_dir());
    }
}
