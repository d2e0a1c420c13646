// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! castplay configuration file
//!
//! ```toml
//! [frames]
//! step = 30
//! plain = false
//!
//! [logging]
//! log-level = "info"
//!
//! [follow]
//! poll-interval-ms = 250
//! idle-timeout-secs = 30.0
//! ```
//!
//! Command-line flags override the file; the file overrides defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use castplay_frames::{FrameQueueConfig, DEFAULT_FRAME_EVENTS_STEP};
use castplay_logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub frames: FrameSettings,
    pub logging: LoggingConfig,
    pub follow: FollowSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FrameSettings {
    pub step: usize,
    /// Strip escape sequences from printed text
    pub plain: bool,
    /// Keep `i` events alongside terminal output
    pub include_input: bool,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            step: DEFAULT_FRAME_EVENTS_STEP,
            plain: false,
            include_input: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FollowSettings {
    pub poll_interval_ms: u64,
    pub idle_timeout_secs: Option<f64>,
}

impl Default for FollowSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            idle_timeout_secs: None,
        }
    }
}

impl Settings {
    /// Load settings from `explicit`, or from the per-user config file when
    /// it exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match default_config_path() {
                Some(path) if path.is_file() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings = Self::from_toml(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl FrameSettings {
    /// Queue configuration with the `--step` override applied.
    ///
    /// Cached snapshots stay raw even with `plain` set: an escape sequence
    /// may straddle two frames, so stripping happens on the finished text.
    pub fn queue_config(&self, step: Option<usize>) -> FrameQueueConfig {
        FrameQueueConfig::default().with_step(step.unwrap_or(self.step))
    }
}

/// `<config dir>/castplay/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("castplay").join(CONFIG_FILE_NAME))
}
