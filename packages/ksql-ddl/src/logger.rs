//! # Logger Module
//!
//! Optional `tracing-subscriber` setup for binaries and tools embedding the compiler. The
//! library itself only emits `tracing` events; nothing is printed unless a subscriber is
//! installed, either through [`setup_logging`] or by the host application.
//!
//! `RUST_LOG` takes precedence over the configured level:
//!
//! ```bash
//! RUST_LOG=ksql_ddl::infrastructure=debug
//! ```
//!
//! ## Environment Variables
//!
//! - `KSQL_DDL_LOGGER__LEVEL`: Log level (DEBUG, INFO, WARN, ERROR)
//! - `KSQL_DDL_LOGGER__FORMAT`: Text or Json (default: Text)
//! - `KSQL_DDL_LOGGER__STDOUT`: Write to stdout instead of stderr (default: `false`)

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum LoggerLevel {
    #[serde(alias = "DEBUG", alias = "debug")]
    Debug,
    #[serde(alias = "INFO", alias = "info")]
    Info,
    #[serde(alias = "WARN", alias = "warn")]
    Warn,
    #[serde(alias = "ERROR", alias = "error")]
    Error,
}

impl LoggerLevel {
    pub fn to_tracing_level(&self) -> LevelFilter {
        match self {
            LoggerLevel::Debug => LevelFilter::DEBUG,
            LoggerLevel::Info => LevelFilter::INFO,
            LoggerLevel::Warn => LevelFilter::WARN,
            LoggerLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum LogFormat {
    #[serde(alias = "json", alias = "JSON")]
    Json,
    #[serde(alias = "text", alias = "TEXT")]
    Text,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoggerSettings {
    #[serde(default = "default_log_level")]
    pub level: LoggerLevel,
    #[serde(default = "default_log_stdout")]
    pub stdout: bool,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> LoggerLevel {
    LoggerLevel::Info
}

fn default_log_stdout() -> bool {
    false
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggerSettings {
    fn default() -> Self {
        LoggerSettings {
            level: default_log_level(),
            stdout: default_log_stdout(),
            format: default_log_format(),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    #[error("Error installing the global log subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Installs a global subscriber for `settings`. Fails if one is already installed.
pub fn setup_logging(settings: &LoggerSettings) -> Result<(), LoggerError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_tracing_level().to_string()));

    let format_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true);

    match (settings.stdout, &settings.format) {
        (true, LogFormat::Json) => tracing_subscriber::registry()
            .with(env_filter)
            .with(format_layer.with_writer(std::io::stdout).json())
            .try_init()?,
        (true, LogFormat::Text) => tracing_subscriber::registry()
            .with(env_filter)
            .with(format_layer.with_writer(std::io::stdout).compact())
            .try_init()?,
        (false, LogFormat::Json) => tracing_subscriber::registry()
            .with(env_filter)
            .with(format_layer.with_writer(std::io::stderr).json())
            .try_init()?,
        (false, LogFormat::Text) => tracing_subscriber::registry()
            .with(env_filter)
            .with(format_layer.with_writer(std::io::stderr).compact())
            .try_init()?,
    }

    Ok(())
}
