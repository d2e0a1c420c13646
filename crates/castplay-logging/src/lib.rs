// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Centralized logging setup for castplay
//!
//! Libraries in the workspace only emit `tracing` events; binaries call one of
//! the `init*` functions here (usually through [`CliLoggingArgs::init`]) to
//! install a `tracing-subscriber` registry with an `EnvFilter`. `RUST_LOG`
//! always wins over the configured default level.

pub mod logging_config;

use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use clap;
pub use logging_config::LoggingConfig;
pub use tracing::Level;

const APP_DIR: &str = "castplay";

/// Output format for log messages
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable plaintext format
    #[default]
    Plaintext,
    /// Structured JSON format
    Json,
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Plaintext => write!(f, "plaintext"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

/// Log level accepted on the command line and in config files
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CliLogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for Level {
    fn from(level: CliLogLevel) -> Self {
        match level {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliLogLevel::Error => write!(f, "error"),
            CliLogLevel::Warn => write!(f, "warn"),
            CliLogLevel::Info => write!(f, "info"),
            CliLogLevel::Debug => write!(f, "debug"),
            CliLogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Logging flags shared by castplay binaries
///
/// Use with `#[command(flatten)]`. Logs go to stderr unless `--log-file` or
/// `--log-dir` is given, so that replayed terminal text on stdout stays clean.
#[derive(Clone, Debug, Default, clap::Args, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CliLoggingArgs {
    /// Log verbosity level
    #[arg(long, value_enum, global = true, help = "Log verbosity level (default: warn)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<CliLogLevel>,

    /// Log output format
    #[arg(long, value_enum, global = true, help = "Log output format (default: plaintext)")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_format: Option<LogFormat>,

    /// Directory for log files
    #[arg(long, global = true, help = "Directory for log files")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Log filename
    #[arg(long, global = true, help = "Log filename")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl CliLoggingArgs {
    /// Fill every flag that was not given on the command line from `config`.
    pub fn with_config(mut self, config: &LoggingConfig) -> Self {
        self.log_level = self.log_level.or(config.level);
        self.log_format = self.log_format.or(config.format);
        if self.log_dir.is_none() {
            self.log_dir = config.log_dir.clone();
        }
        if self.log_file.is_none() {
            self.log_file = config.log_file.clone();
        }
        self
    }

    /// Install the global subscriber for `component`.
    pub fn init(self, component: &str, default_level: CliLogLevel) -> anyhow::Result<()> {
        let level = self.log_level.unwrap_or(default_level).into();
        let format = self.log_format.unwrap_or_default();

        if self.logs_to_file() {
            let log_path = self.resolve_log_path(component);
            init_to_file(component, level, format, &log_path)
        } else {
            init(component, level, format)
        }
    }

    pub fn logs_to_file(&self) -> bool {
        self.log_file.is_some() || self.log_dir.is_some()
    }

    /// Resolve the log file path:
    /// 1. an absolute `log_file` is used as is
    /// 2. a relative `log_file` is joined onto `log_dir` when one is set
    /// 3. a bare `log_dir` gets `<component>.log`
    /// 4. otherwise the platform standard location
    pub fn resolve_log_path(&self, component: &str) -> PathBuf {
        match (&self.log_file, &self.log_dir) {
            (Some(file), _) if Path::new(file).is_absolute() => PathBuf::from(file),
            (Some(file), Some(dir)) => Path::new(dir).join(file),
            (Some(file), None) => PathBuf::from(file),
            (None, Some(dir)) => Path::new(dir).join(format!("{}.log", component)),
            (None, None) => get_standard_log_path_for_component(component),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.log_level.is_none()
            && self.log_format.is_none()
            && self.log_dir.is_none()
            && self.log_file.is_none()
    }
}

/// Standard log file path with the component name as the file stem
pub fn get_standard_log_path_for_component(component: &str) -> PathBuf {
    let base_path = get_standard_log_path();
    let parent = base_path.parent().unwrap_or(Path::new("/tmp"));
    parent.join(format!("{}.log", component))
}

/// Platform log location:
/// - Windows: %APPDATA%\castplay\castplay.log
/// - macOS: ~/Library/Logs/castplay.log
/// - Linux: ~/.local/share/castplay/castplay.log
/// - Other: ~/castplay.log
pub fn get_standard_log_path() -> PathBuf {
    let log_name = format!("{}.log", APP_DIR);

    #[cfg(target_os = "windows")]
    {
        let mut path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("C:\\Users\\Default\\AppData\\Roaming"));
        path.push(APP_DIR);
        path.push(log_name);
        path
    }

    #[cfg(target_os = "macos")]
    {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        path.push("Library");
        path.push("Logs");
        path.push(log_name);
        path
    }

    #[cfg(target_os = "linux")]
    {
        let mut path = dirs::data_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp")));
        path.push(APP_DIR);
        path.push(log_name);
        path
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
        path.push(log_name);
        path
    }
}

/// Initialize logging to stderr.
pub fn init(component: &str, default_level: Level, format: LogFormat) -> anyhow::Result<()> {
    init_with_writer(component, default_level, format, io::stderr)
}

/// Initialize logging to `log_path`, creating parent directories.
pub fn init_to_file(
    component: &str,
    default_level: Level,
    format: LogFormat,
    log_path: &Path,
) -> anyhow::Result<()> {
    use std::fs;

    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = fs::OpenOptions::new().create(true).append(true).open(log_path)?;

    init_with_writer(component, default_level, format, log_file)
}

/// Initialize logging with a custom writer.
pub fn init_with_writer<W>(
    component: &str,
    default_level: Level,
    format: LogFormat,
    writer: W,
) -> anyhow::Result<()>
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_directive(component, default_level)));

    match format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).json();
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
        LogFormat::Plaintext => {
            let layer = tracing_subscriber::fmt::layer().with_writer(writer);
            #[cfg(debug_assertions)]
            let layer = layer.with_file(true).with_line_number(true);

            tracing_subscriber::registry().with(filter).with(layer).try_init()?;
        }
    }

    Ok(())
}

/// `EnvFilter` directive used when `RUST_LOG` is unset. Crate targets use
/// underscores, so `castplay-frames` is matched as `castplay_frames`.
fn default_filter_directive(component: &str, level: Level) -> String {
    format!("{},{}={}", level, component.replace('-', "_"), level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use castplay_test_utils::logged_test;

    #[logged_test]
    fn test_cli_log_level_conversion() {
        assert_eq!(Level::from(CliLogLevel::Error), Level::ERROR);
        assert_eq!(Level::from(CliLogLevel::Warn), Level::WARN);
        assert_eq!(Level::from(CliLogLevel::Info), Level::INFO);
        assert_eq!(Level::from(CliLogLevel::Debug), Level::DEBUG);
        assert_eq!(Level::from(CliLogLevel::Trace), Level::TRACE);
        assert_eq!(CliLogLevel::default(), CliLogLevel::Info);
        assert_eq!(CliLogLevel::Debug.to_string(), "debug");
    }

    #[logged_test]
    fn test_resolve_log_path() {
        let args = CliLoggingArgs {
            log_dir: Some("/var/log/castplay".into()),
            ..Default::default()
        };
        assert_eq!(
            args.resolve_log_path("castplay"),
            PathBuf::from("/var/log/castplay/castplay.log")
        );

        let args = CliLoggingArgs {
            log_dir: Some("/var/log".into()),
            log_file: Some("replay.log".into()),
            ..Default::default()
        };
        assert_eq!(args.resolve_log_path("castplay"), PathBuf::from("/var/log/replay.log"));

        let args = CliLoggingArgs {
            log_dir: Some("/var/log".into()),
            log_file: Some("/tmp/abs.log".into()),
            ..Default::default()
        };
        assert_eq!(args.resolve_log_path("castplay"), PathBuf::from("/tmp/abs.log"));

        let args = CliLoggingArgs::default();
        assert!(!args.logs_to_file());
        assert!(args.is_empty());
        assert!(args.resolve_log_path("castplay").ends_with("castplay.log"));
    }

    #[logged_test]
    fn test_flags_take_precedence_over_config() {
        let config: LoggingConfig = toml::from_str(
            r#"
log-level = "debug"
log-format = "json"
log-dir = "/tmp/castplay-logs"
"#,
        )
        .unwrap();

        let args = CliLoggingArgs {
            log_level: Some(CliLogLevel::Trace),
            ..Default::default()
        }
        .with_config(&config);

        assert_eq!(args.log_level, Some(CliLogLevel::Trace));
        assert_eq!(args.log_format, Some(LogFormat::Json));
        assert_eq!(args.log_dir.as_deref(), Some("/tmp/castplay-logs"));
        assert!(args.logs_to_file());
    }

    #[logged_test]
    fn test_default_filter_directive_uses_crate_target() {
        assert_eq!(
            default_filter_directive("castplay-frames", Level::DEBUG),
            "DEBUG,castplay_frames=DEBUG"
        );
    }

    #[logged_test]
    fn test_init_to_file_creates_log() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("castplay.log");

        // Another test in this binary may already own the global subscriber;
        // the file must exist either way.
        let _ = init_to_file("castplay", Level::INFO, LogFormat::Plaintext, &path);
        assert!(path.exists());
        Ok(())
    }
}
