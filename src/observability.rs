//! Logging setup for the `prepare` and `partition` binaries.
//!
//! Events go to stderr so the one-line run summary on stdout stays clean.
//! Every event carries `component` and `event` fields; app-level events use
//! the binary name as their component.

use std::env;
use std::io;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

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
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub app: String,
    pub level: String,
    pub format: LogFormat,
    pub include_target: bool,
}

impl LoggingConfig {
    pub fn for_app(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_target: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_app(env!("CARGO_PKG_NAME"))
    }
}

#[derive(Debug, Error)]
pub enum LoggingInitError {
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// `FPREP_LOG_LEVEL` takes any `EnvFilter` directive, `FPREP_LOG_FORMAT` is
/// `json` or `pretty`, `FPREP_LOG_TARGET` toggles module targets. Unparseable
/// values keep the default.
pub fn logging_config_from_env(app: &str) -> LoggingConfig {
    let mut config = LoggingConfig::for_app(app);

    if let Some(level) = env_value("FPREP_LOG_LEVEL") {
        config.level = level;
    }
    if let Some(format) = env_value("FPREP_LOG_FORMAT").and_then(|raw| raw.parse().ok()) {
        config.format = format;
    }
    if let Some(include_target) = env_value("FPREP_LOG_TARGET").and_then(|raw| parse_bool(&raw))
    {
        config.include_target = include_target;
    }

    config
}

pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingInitError> {
    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(config.include_target);

    match config.format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().with_ansi(false).finish())?
        }
        LogFormat::Pretty => tracing::subscriber::set_global_default(builder.pretty().finish())?,
    }

    Ok(())
}

pub fn log_app_start(config: &LoggingConfig) {
    info!(
        component = %config.app,
        event = "app.start",
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = ?config.format
    );
}

/// `reason` names the env var that picked the directory, if any.
pub fn log_data_source(config: &LoggingConfig, data_dir: &Path, reason: Option<&str>) {
    info!(
        component = %config.app,
        event = "source.selected",
        data_dir = %data_dir.display(),
        reason = reason.unwrap_or("default")
    );
}

/// Trimmed value of `key`, or `None` when unset or blank.
pub(crate) fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod test_env {
    use std::env;
    use std::sync::{Mutex, OnceLock};

    /// Runs `f` with `vars` applied, then restores the previous values.
    /// Serialized, since the process environment is global.
    pub(crate) fn with_env_vars<R>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> R) -> R {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let _guard = LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let saved: Vec<(&str, Option<String>)> =
            vars.iter().map(|(key, _)| (*key, env::var(key).ok())).collect();
        let apply = |key: &str, value: Option<&str>| match value {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        };

        for (key, value) in vars {
            apply(*key, *value);
        }
        let output = f();
        for (key, value) in &saved {
            apply(*key, value.as_deref());
        }

        output
    }
}
