use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, bail};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

pub const LOG_FILE_PREFIX: &str = "clarity.log";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Keeps the non-blocking file writer alive; drop it last in `main`.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    if config.filter.trim().is_empty() {
        bail!("logging.filter cannot be empty");
    }
    if config.dir.as_os_str().is_empty() {
        bail!("logging.dir cannot be empty");
    }

    let log_dir = absolute_log_dir(&config.dir)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let purge = purge_expired_logs(&log_dir, config.retention_days, SystemTime::now());
    let (file_writer, worker_guard) =
        tracing_appender::non_blocking(rolling_appender(&log_dir, &config.rotation));

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(file_writer)
        .with_filter(parse_filter(&config.filter)?);

    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        retention_days = config.retention_days,
        purged_files = purge.removed,
        "logging_initialized"
    );
    for warning in purge.warnings {
        tracing::warn!(target: "logging", warning = %warning, "log_purge_warning");
    }

    Ok(LoggingGuard {
        _worker_guard: worker_guard,
        run_id,
    })
}

fn parse_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter).with_context(|| format!("failed to parse logging.filter '{filter}'"))
}

fn rolling_appender(log_dir: &Path, rotation: &LoggingRotation) -> RollingFileAppender {
    match rotation {
        LoggingRotation::Daily => rolling::daily(log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(log_dir, LOG_FILE_PREFIX),
    }
}

fn absolute_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve relative logging.dir")?;
    Ok(cwd.join(dir))
}

#[derive(Debug, Default)]
struct PurgeReport {
    removed: usize,
    warnings: Vec<String>,
}

/// Removes `clarity.log*` files last modified before `now - retention_days`.
/// Problems are collected as warnings; they never abort startup.
fn purge_expired_logs(log_dir: &Path, retention_days: usize, now: SystemTime) -> PurgeReport {
    let retention = Duration::from_secs((retention_days as u64).saturating_mul(SECONDS_PER_DAY));
    let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut report = PurgeReport::default();

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            report
                .warnings
                .push(format!("cannot scan {}: {err}", log_dir.display()));
            return report;
        }
    };

    let candidates = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(err) => {
                report.warnings.push(format!("cannot read directory entry: {err}"));
                None
            }
        })
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().starts_with(LOG_FILE_PREFIX))
        })
        .collect::<Vec<PathBuf>>();

    for path in candidates {
        match last_modified_file(&path) {
            Ok(Some(modified)) if modified <= cutoff => match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(err) => report
                    .warnings
                    .push(format!("cannot remove {}: {err}", path.display())),
            },
            Ok(_) => {}
            Err(err) => report
                .warnings
                .push(format!("cannot stat {}: {err}", path.display())),
        }
    }

    report
}

/// Modification time of a regular file; `None` for directories and links.
fn last_modified_file(path: &Path) -> std::io::Result<Option<SystemTime>> {
    let metadata = fs::symlink_metadata(path)?;
    if !metadata.is_file() {
        return Ok(None);
    }
    metadata.modified().map(Some)
}
