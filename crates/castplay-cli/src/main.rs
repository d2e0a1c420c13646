// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use anyhow::Result;
use castplay_cli::{Cli, Parser, Settings};
use castplay_logging::CliLogLevel;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    cli.logging
        .clone()
        .with_config(&settings.logging)
        .init("castplay", CliLogLevel::Warn)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli.run(&settings, &mut out).await
}
