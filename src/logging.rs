//! Structured logging and stage timing for the assembler
//!
//! Logging goes through `tracing`. [`LoggingSystem::init`] installs a global
//! subscriber writing either pretty or JSON records to stderr or to a file
//! in the configured directory.

use crate::error::{AssemblyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(AssemblyError::config(format!("Unknown log level '{}'", other))),
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
            LogLevel::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
            LogLevel::Info => tracing_subscriber::filter::LevelFilter::INFO,
            LogLevel::Warn => tracing_subscriber::filter::LevelFilter::WARN,
            LogLevel::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Base log level
    pub level: LogLevel,
    /// Emit JSON records instead of the pretty format
    pub json_format: bool,
    /// Log file directory (None for stderr only)
    pub log_dir: Option<PathBuf>,
    /// Log file name inside `log_dir`
    pub log_file_pattern: String,
    /// Per-module levels, e.g. `readscan::graph = "debug"`
    pub module_levels: HashMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json_format: false,
            log_dir: None,
            log_file_pattern: "readscan.log".to_string(),
            module_levels: HashMap::new(),
        }
    }
}

/// Handle on the installed subscriber; dropping it flushes pending records
pub struct LoggingSystem {
    config: LoggingConfig,
    _guards: Vec<WorkerGuard>,
}

impl LoggingSystem {
    /// Install the global subscriber. Fails if one is already installed.
    pub fn init(config: LoggingConfig) -> Result<Self> {
        let mut guards = Vec::new();

        let writer = if let Some(log_dir) = &config.log_dir {
            fs::create_dir_all(log_dir)?;
            let file_appender = tracing_appender::rolling::never(log_dir, &config.log_file_pattern);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            guards.push(guard);
            non_blocking
        } else {
            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
            guards.push(guard);
            non_blocking
        };

        let format_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .boxed()
        } else {
            fmt::layer()
                .with_writer(writer)
                .with_timer(ChronoUtc::rfc_3339())
                .with_target(true)
                .with_ansi(config.log_dir.is_none())
                .boxed()
        };

        let mut env_filter = EnvFilter::builder()
            .with_default_directive(tracing_subscriber::filter::LevelFilter::from(config.level).into())
            .from_env_lossy();
        for (module, level) in &config.module_levels {
            let directive = format!("{}={}", module, level.as_str())
                .parse()
                .map_err(|e| AssemblyError::config(format!("Invalid log directive for {}: {}", module, e)))?;
            env_filter = env_filter.add_directive(directive);
        }

        tracing_subscriber::registry()
            .with(format_layer.with_filter(env_filter))
            .try_init()
            .map_err(|e| AssemblyError::config(format!("Failed to initialize logging: {}", e)))?;

        info!(
            level = config.level.as_str(),
            json = config.json_format,
            "readscan logging initialized"
        );

        Ok(Self {
            config,
            _guards: guards,
        })
    }

    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }
}

/// Wall-clock timer for one pipeline stage; logs its duration when finished
#[derive(Debug)]
pub struct StageTimer {
    stage: &'static str,
    start: Instant,
}

impl StageTimer {
    pub fn start(stage: &'static str) -> Self {
        debug!(stage, "Stage started");
        Self {
            stage,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Log the stage duration and return it
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        info!(
            stage = self.stage,
            elapsed_ms = elapsed.as_millis() as u64,
            "Stage finished"
        );
        elapsed
    }
}

/// Progress counter that logs every `interval` items
#[derive(Debug)]
pub struct ProgressReporter {
    operation: &'static str,
    interval: u64,
    current: AtomicU64,
    start: Instant,
}

impl ProgressReporter {
    pub fn new(operation: &'static str, interval: u64) -> Self {
        Self {
            operation,
            interval: interval.max(1),
            current: AtomicU64::new(0),
            start: Instant::now(),
        }
    }

    pub fn inc(&self) {
        let current = self.current.fetch_add(1, Ordering::Relaxed) + 1;
        if current % self.interval == 0 {
            let rate = current as f64 / self.start.elapsed().as_secs_f64().max(1e-9);
            info!(
                operation = self.operation,
                current,
                rate = format!("{:.0}/s", rate),
                "Progress"
            );
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Relaxed)
    }

    /// Log the final count
    pub fn finish(&self) {
        info!(
            operation = self.operation,
            total = self.current(),
            elapsed_ms = self.start.elapsed().as_millis() as u64,
            "Completed"
        );
    }
}
