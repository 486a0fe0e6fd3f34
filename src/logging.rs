use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing::Span;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::{
    config::{LoggingConfig, LoggingRotation},
    types::StackEnvironment,
};

const LOG_FILE_SUFFIX: &str = "compose.log";

/// Keeps the file writer alive and carries the run's root span.
pub struct ComposeRunLogging {
    _worker_guard: WorkerGuard,
    run_id: String,
    span: Span,
}

impl ComposeRunLogging {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Root span for one compose run. Everything logged inside it carries
    /// the run id and stack coordinates.
    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Log files are per stack so several stacks can share one directory.
pub fn log_file_prefix(stack_name: &str) -> String {
    format!("{}.{}", stack_name, LOG_FILE_SUFFIX)
}

pub fn init_tracing(
    logging_config: &LoggingConfig,
    environment: &StackEnvironment,
) -> Result<ComposeRunLogging> {
    if logging_config.filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    if logging_config.dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }

    let log_dir = &logging_config.dir;
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;

    let prefix = log_file_prefix(&environment.stack_name);
    let retention = RetentionSweep::run(
        log_dir,
        &prefix,
        logging_config.retention_days,
        SystemTime::now(),
    );
    let appender = build_rolling_appender(log_dir, &prefix, &logging_config.rotation);
    let (non_blocking_writer, worker_guard) = tracing_appender::non_blocking(appender);
    let env_filter = build_env_filter(&logging_config.filter)?;

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_current_span(true)
        .with_span_list(true)
        .with_ansi(false)
        .with_writer(non_blocking_writer)
        .with_filter(env_filter);

    let stderr_layer = logging_config.stderr_warn_enabled.then(|| {
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
    let span = tracing::info_span!(
        target: "logging",
        "compose_run",
        run_id = %run_id,
        stack = %environment.stack_name,
        account = %environment.account,
        region = %environment.region,
    );
    span.in_scope(|| {
        tracing::info!(
            target: "logging",
            dir = %log_dir.display(),
            file_prefix = %prefix,
            filter = %logging_config.filter,
            rotation = ?logging_config.rotation,
            retention_days = logging_config.retention_days,
            removed_files = retention.removed.len(),
            "logging_initialized"
        );
        for warning in &retention.warnings {
            tracing::warn!(target: "logging", warning = %warning, "logging_retention_warning");
        }
    });

    Ok(ComposeRunLogging {
        _worker_guard: worker_guard,
        run_id,
        span,
    })
}

fn build_env_filter(filter: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", filter))
}

fn build_rolling_appender(
    log_dir: &Path,
    prefix: &str,
    rotation: &LoggingRotation,
) -> RollingFileAppender {
    match rotation {
        LoggingRotation::Daily => rolling::daily(log_dir, prefix),
        LoggingRotation::Hourly => rolling::hourly(log_dir, prefix),
    }
}

/// Outcome of removing a stack's log files older than the retention window.
/// Runs before the subscriber exists, so problems are collected as warnings.
#[derive(Debug, Default)]
struct RetentionSweep {
    removed: Vec<PathBuf>,
    warnings: Vec<String>,
}

impl RetentionSweep {
    fn run(log_dir: &Path, prefix: &str, retention_days: usize, now: SystemTime) -> Self {
        let mut sweep = Self::default();
        let retention = Duration::from_secs(retention_days.saturating_mul(24 * 60 * 60) as u64);
        let cutoff = now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

        let entries = match fs::read_dir(log_dir) {
            Ok(entries) => entries,
            Err(err) => {
                sweep.warnings.push(format!(
                    "failed to scan logging directory {}: {}",
                    log_dir.display(),
                    err
                ));
                return sweep;
            }
        };

        for entry in entries {
            match entry {
                Ok(entry) if entry.file_name().to_string_lossy().starts_with(prefix) => {
                    sweep.consider(&entry.path(), cutoff);
                }
                Ok(_) => {}
                Err(err) => sweep
                    .warnings
                    .push(format!("failed to iterate logging directory: {}", err)),
            }
        }
        sweep
    }

    fn consider(&mut self, path: &Path, cutoff: SystemTime) {
        let modified = match fs::metadata(path) {
            Ok(metadata) if !metadata.is_file() => return,
            Ok(metadata) => metadata.modified(),
            Err(err) => Err(err),
        };
        match modified {
            Ok(modified) if modified > cutoff => {}
            Ok(_) => match fs::remove_file(path) {
                Ok(()) => self.removed.push(path.to_path_buf()),
                Err(err) => self.warnings.push(format!(
                    "failed to remove expired log file {}: {}",
                    path.display(),
                    err
                )),
            },
            Err(err) => self
                .warnings
                .push(format!("failed to stat {}: {}", path.display(), err)),
        }
    }
}
