// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use castplay_logging::CliLoggingArgs;
use clap::Subcommand;

pub mod asciicast;
pub mod follow;
pub mod replay;
pub mod settings;

pub use clap::Parser;
pub use follow::{FollowArgs, FollowExit};
pub use replay::{DeltaArgs, FrameArgs, IndexedCast, InfoArgs, SnapshotArgs};
pub use settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "castplay",
    about = "Seek, slice and follow asciicast terminal recordings",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, env = "CASTPLAY_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub frames: FrameArgs,
    #[command(flatten)]
    pub logging: CliLoggingArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Info(InfoArgs),
    Snapshot(SnapshotArgs),
    Delta(DeltaArgs),
    Follow(FollowArgs),
}

impl Cli {
    /// Run the selected command, writing replayed text to `out`.
    pub async fn run<W: Write>(&self, settings: &Settings, out: &mut W) -> Result<()> {
        match &self.command {
            Commands::Info(args) => args.run(&self.frames, settings, out).await,
            Commands::Snapshot(args) => args.run(&self.frames, settings, out).await,
            Commands::Delta(args) => args.run(&self.frames, settings, out).await,
            Commands::Follow(args) => args.run(&self.frames, settings, out).await.map(|_| ()),
        }
    }
}
