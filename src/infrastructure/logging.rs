//! Logging system configuration and initialization
//!
//! Console output for interactive runs, plus optional daily-rolling file
//! logs (plain or JSON) written through a non-blocking appender. `RUST_LOG`
//! overrides the configured level when set.

#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use tracing::info;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use crate::infrastructure::config::LoggingConfig;

const LOG_FILE_PREFIX: &str = "ttb-catalog.log";

/// Dependencies that drown out pipeline logs below TRACE
const NOISY_TARGETS: &[(&str, &str)] = &[
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("html5ever", "warn"),
    ("selectors", "warn"),
];

// Keep the file writer alive for the life of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> =
        Mutex::new(Vec::new());
}

/// Log directory: configured path, else `<data dir>/ttb-catalog/logs`
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_directory.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default()
            .join("ttb-catalog")
            .join("logs")
    })
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(&LoggingConfig::default())
}

/// Filter from `RUST_LOG`, else the configured level with noisy crates capped
pub fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(level)
        .map_err(|e| anyhow!("Invalid log level '{}': {}", level, e))?;

    if !level.to_lowercase().contains("trace") {
        for (target, target_level) in NOISY_TARGETS {
            let directive = format!("{target}={target_level}")
                .parse()
                .map_err(|e| anyhow!("Invalid log directive for {}: {}", target, e))?;
            filter = filter.add_directive(directive);
        }
    }
    Ok(filter)
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.console_output && !config.file_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(&config.level)?;

    let console_layer = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let mut log_dir = None;
    let file_layer = if config.file_output {
        let dir = get_log_directory(config);
        std::fs::create_dir_all(&dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", dir, e))?;

        let (file_writer, file_guard) = non_blocking(rolling::daily(&dir, LOG_FILE_PREFIX));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);
        log_dir = Some(dir);

        let layer = fmt::Layer::new().with_writer(file_writer).with_ansi(false);
        Some(if config.json_format {
            layer
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            layer.with_target(false).boxed()
        })
    } else {
        None
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!("Logging system initialized (level: {})", config.level);
    if let Some(dir) = log_dir {
        info!("Log directory: {:?} (JSON: {})", dir, config.json_format);
    }
    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== ttb-catalog {} ===", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(parallelism) = std::thread::available_parallelism() {
        info!("Available parallelism: {}", parallelism);
    }
}
