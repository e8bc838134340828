//! Logging setup and the server lifecycle events.
//!
//! Every event carries a `component` and an `event` field so JSON output can
//! be filtered without parsing messages.

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::market::FieldSet;

const LEVEL_VAR: &str = "KTOP_LOG_LEVEL";
const FORMAT_VAR: &str = "KTOP_LOG_FORMAT";
const TARGET_VAR: &str = "KTOP_LOG_TARGET";
const DEFAULT_LEVEL: &str = "info";
const SERVED_ROUTES: &str = "/,/board,/board/snapshot,/board.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `ktop=debug`.
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            format: LogFormat::Pretty,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Builds the config from any key lookup; unknown or blank values keep
    /// the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(level) = value(LEVEL_VAR) {
            config.level = level;
        }
        if let Some(format) = value(FORMAT_VAR).and_then(|raw| raw.parse().ok()) {
            config.format = format;
        }
        if let Some(include_target) = value(TARGET_VAR).and_then(|raw| parse_flag(&raw)) {
            config.include_target = include_target;
        }

        config
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

pub fn logging_config_from_env() -> LoggingConfig {
    LoggingConfig::from_lookup(|key| env::var(key).ok())
}

/// Installs the global subscriber. An unparsable level falls back to `info`.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.include_target);

    match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.with_ansi(false).json().finish())?
        }
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(builder.with_ansi(true).pretty().finish())?
        }
    }

    Ok(())
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = "dashboard_server",
        event = "app.start",
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = ?config.format,
        include_target = config.include_target
    );
}

pub fn log_app_bind(bound_addr: SocketAddr) {
    info!(
        component = "dashboard_server",
        event = "app.bind",
        bind_addr = %bound_addr,
        routes = SERVED_ROUTES
    );
}

pub fn log_source_selected(base_url: &str, field_set: FieldSet, http_timeout_ms: Option<u64>) {
    let timeout = http_timeout_ms
        .map(|ms| format!("{ms}ms"))
        .unwrap_or_else(|| "none".to_string());
    info!(
        component = "dashboard_server",
        event = "source.selected",
        base_url,
        field_set = ?field_set,
        field_count = field_set.fields().len(),
        http_timeout = %timeout
    );
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
