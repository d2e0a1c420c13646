// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `[logging]` table of the castplay configuration file

use serde::{Deserialize, Serialize};

use crate::{CliLogLevel, LogFormat};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    #[serde(rename = "log-level")]
    pub level: Option<CliLogLevel>,
    #[serde(rename = "log-format")]
    pub format: Option<LogFormat>,
    pub log_dir: Option<String>,
    pub log_file: Option<String>,
}
