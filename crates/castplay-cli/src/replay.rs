// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// `castplay info`, `castplay snapshot` and `castplay delta`
//
// Each command loads the whole cast file, indexes it into frames and answers
// one query.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use castplay_frames::{
    strip_control_sequences, Cast, CastRecording, FrameQueue, INPUT_EVENT, OUTPUT_EVENT,
};
use clap::{Args, Parser};
use tracing::info;

use crate::asciicast::{load_cast, ChannelFilter};
use crate::settings::Settings;

/// Frame options shared by all commands
#[derive(Args, Debug, Clone, Default)]
pub struct FrameArgs {
    /// Events per frame
    #[arg(long, global = true)]
    pub step: Option<usize>,

    /// Strip terminal escape sequences from printed text
    #[arg(long, global = true)]
    pub plain: bool,

    /// Keep input (`i`) events alongside output
    #[arg(long, global = true)]
    pub include_input: bool,
}

impl FrameArgs {
    pub fn plain(&self, settings: &Settings) -> bool {
        self.plain || settings.frames.plain
    }

    pub fn channel_filter(&self, settings: &Settings) -> ChannelFilter {
        ChannelFilter {
            include_input: self.include_input || settings.frames.include_input,
        }
    }
}

/// Print recording metadata and frame statistics
#[derive(Parser, Debug, Clone)]
pub struct InfoArgs {
    /// Path to the asciicast v2 file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Print the terminal text at a point in time
#[derive(Parser, Debug, Clone)]
pub struct SnapshotArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Time in seconds; defaults to the end of the recording
    #[arg(long, value_name = "SECS")]
    pub at: Option<f64>,
}

/// Print the text produced between two points in time
#[derive(Parser, Debug, Clone)]
pub struct DeltaArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Exclusive start time in seconds; defaults to the beginning
    #[arg(long, value_name = "SECS")]
    pub from: Option<f64>,

    /// Inclusive end time in seconds
    #[arg(long, value_name = "SECS")]
    pub to: f64,
}

/// A loaded recording and its frame index
pub struct IndexedCast {
    pub cast: Cast,
    pub queue: FrameQueue,
}

impl IndexedCast {
    pub async fn open(path: &Path, frames: &FrameArgs, settings: &Settings) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Recording file not found: {}", path.display());
        }
        let mut cast = load_cast(path, frames.channel_filter(settings))
            .await
            .with_context(|| format!("Failed to load recording {}", path.display()))?;
        let config = settings.frames.queue_config(frames.step);
        let queue = FrameQueue::new(&mut cast, config).context("Failed to index recording")?;
        info!(
            path = %path.display(),
            frames = queue.len(),
            duration = queue.duration(),
            "Indexed recording"
        );
        Ok(Self { cast, queue })
    }
}

fn finish_text(text: String, plain: bool) -> String {
    if plain {
        strip_control_sequences(&text)
    } else {
        text
    }
}

impl InfoArgs {
    pub async fn run<W: Write>(
        &self,
        frames: &FrameArgs,
        settings: &Settings,
        out: &mut W,
    ) -> Result<()> {
        let indexed = IndexedCast::open(&self.file, frames, settings).await?;
        let header = indexed.cast.header();
        let events = indexed.cast.events().borrow();
        let outputs = events.iter().filter(|e| e.event_type == OUTPUT_EVENT).count();
        let inputs = events.iter().filter(|e| e.event_type == INPUT_EVENT).count();
        let bytes: usize = events.iter().map(|e| e.data.len()).sum();

        writeln!(out, "Recording: {}", self.file.display())?;
        writeln!(out, "Version: {}", header.version)?;
        writeln!(out, "Terminal size: {}x{}", header.width, header.height)?;
        writeln!(out, "Duration: {:.3}s", indexed.queue.duration())?;
        writeln!(out, "Events: {} ({} output, {} input)", events.len(), outputs, inputs)?;
        writeln!(out, "Text bytes: {}", bytes)?;
        writeln!(
            out,
            "Frames: {} (step {})",
            indexed.queue.len(),
            indexed.queue.step()
        )?;
        if let Some(audio) = &header.audio {
            writeln!(out, "Audio: {}", audio)?;
        }
        Ok(())
    }
}

impl SnapshotArgs {
    pub async fn run<W: Write>(
        &self,
        frames: &FrameArgs,
        settings: &Settings,
        out: &mut W,
    ) -> Result<()> {
        let indexed = IndexedCast::open(&self.file, frames, settings).await?;
        let text = match self.at {
            Some(at) => indexed
                .queue
                .snapshot_at(at)
                .with_context(|| format!("Cannot take snapshot at {}", at))?,
            None => indexed.queue.end_frame()?.snapshot().to_string(),
        };
        out.write_all(finish_text(text, frames.plain(settings)).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

impl DeltaArgs {
    pub async fn run<W: Write>(
        &self,
        frames: &FrameArgs,
        settings: &Settings,
        out: &mut W,
    ) -> Result<()> {
        let indexed = IndexedCast::open(&self.file, frames, settings).await?;
        let from = self.from.unwrap_or(-1.0);
        let text = indexed
            .queue
            .delta(from, self.to)
            .with_context(|| format!("Cannot compute delta ({}, {}]", from, self.to))?;
        out.write_all(finish_text(text, frames.plain(settings)).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}
