//! Tracing setup for embedders that want this crate's logs routed to a
//! rolling file in addition to stdout: daily rolling file appender,
//! age-based retention sweep, and an `EnvFilter` that defaults to `info`
//! for this crate's targets and `warn` for noisy dependencies.
//!
//! Embedders that already run their own `tracing_subscriber::registry()`
//! don't need this module at all — it's a convenience entry point, not a
//! requirement. Most of the crate just calls `tracing::{info,warn,error,debug}!`
//! directly.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_RETENTION_DAYS: u64 = 7;
const LOG_FILE_PREFIX: &str = "formflow";

pub struct LoggingSettings<'a> {
    pub level: Option<&'a str>,
    /// A filesystem path, or `None` to fall back to a per-user data
    /// directory (`~/.local/share/formflow/logs` and platform
    /// equivalents). A leading `~/` is expanded against the home
    /// directory either way.
    pub directory: Option<&'a str>,
    pub retention_days: Option<u64>,
}

/// Per-user default when no explicit log directory is configured.
fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("formflow")
        .join("logs")
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Initialize a stdout + rolling-file tracing subscriber for this crate.
/// Safe to call at most once per process; subsequent calls return an error
/// rather than panicking.
pub fn init(settings: LoggingSettings<'_>) -> Result<PathBuf> {
    let log_dir = match settings.directory {
        Some(path) => expand_tilde(path),
        None => default_log_dir(),
    };
    std::fs::create_dir_all(&log_dir)?;
    let retention_days = settings.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS).max(1);
    if let Err(e) = cleanup_old_logs(&log_dir, retention_days) {
        eprintln!("formflow: failed to clean up old logs: {e}");
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    LOG_GUARD
        .set(guard)
        .map_err(|_| anyhow!("logging already initialized"))?;

    let time_format = ChronoUtc::new("%Y-%m-%dT%H:%M:%S".to_string());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_timer(time_format.clone());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_timer(time_format);

    let default_filter = || {
        let level = settings.level.unwrap_or("info");
        EnvFilter::new(format!("formflow={level},tokio=warn,hyper=warn"))
    };

    let filter = if let Some(level) = settings.level {
        EnvFilter::try_new(format!("formflow={level}")).unwrap_or_else(|_| default_filter())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter())
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();

    Ok(log_dir)
}

fn cleanup_old_logs(log_dir: &PathBuf, retention_days: u64) -> Result<()> {
    let now = SystemTime::now();
    let max_age = Duration::from_secs(60 * 60 * 24 * retention_days);
    for entry in std::fs::read_dir(log_dir)? {
        let entry = match entry {
            Ok(v) => v,
            Err(_) => continue,
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !file_name.starts_with(LOG_FILE_PREFIX) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age >= max_age {
            let _ = std::fs::remove_file(&path);
        }
    }
    Ok(())
}
