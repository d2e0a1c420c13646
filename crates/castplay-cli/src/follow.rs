// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// `castplay follow`
//
// Tails a cast file that is still being recorded. New events go into a
// `LiveCast`, the frame queue re-batches them, and every poll that added
// events prints their text. Progress is tracked by log position, not time,
// so events sharing a timestamp or sitting below a stated duration are
// printed too.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use castplay_frames::{strip_control_sequences, FrameQueue, LiveCast};
use clap::Parser;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::asciicast::CastTail;
use crate::replay::FrameArgs;
use crate::settings::Settings;

/// Print a growing recording as it is written
#[derive(Parser, Debug, Clone)]
pub struct FollowArgs {
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Stop after this many seconds without new output
    #[arg(long, value_name = "SECS")]
    pub idle_timeout: Option<f64>,

    /// How often to check the file for new data
    #[arg(long, value_name = "MILLIS")]
    pub poll_interval_ms: Option<u64>,

    /// Skip the text recorded before following started
    #[arg(long)]
    pub skip_existing: bool,
}

/// Why following stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowExit {
    Idle,
    Interrupted,
}

impl FollowArgs {
    pub async fn run<W: Write>(
        &self,
        frames: &FrameArgs,
        settings: &Settings,
        out: &mut W,
    ) -> Result<FollowExit> {
        let poll_interval = Duration::from_millis(
            self.poll_interval_ms
                .unwrap_or(settings.follow.poll_interval_ms)
                .max(1),
        );
        let idle_timeout = self
            .idle_timeout
            .or(settings.follow.idle_timeout_secs)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
        let plain = frames.plain(settings);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let mut tail = CastTail::new(&self.file, frames.channel_filter(settings));
        let mut last_activity = Instant::now();

        let mut initial = Vec::new();
        let header = loop {
            initial.extend(tail.poll().await.context("Failed to read recording")?);
            if let Some(header) = tail.header() {
                break header.clone();
            }
            if idle_expired(idle_timeout, last_activity) {
                info!(path = %self.file.display(), "No recording header before idle timeout");
                return Ok(FollowExit::Idle);
            }
            tokio::select! {
                _ = &mut ctrl_c => return Ok(FollowExit::Interrupted),
                _ = sleep(poll_interval) => {}
            }
        };

        let mut live = LiveCast::new(header);
        live.append(initial).context("Recording events are out of order")?;
        let config = settings.frames.queue_config(frames.step);
        let queue = FrameQueue::new(&mut live, config).context("Failed to index recording")?;

        if !self.skip_existing && !queue.is_empty() {
            let text = queue.snapshot_at(queue.duration())?;
            emit(out, text, plain)?;
        }
        let mut printed = queue.event_count();
        debug!(
            path = %tail.path().display(),
            frames = queue.len(),
            duration = queue.duration(),
            "Following recording"
        );
        last_activity = Instant::now();

        loop {
            tokio::select! {
                _ = &mut ctrl_c => return Ok(FollowExit::Interrupted),
                _ = sleep(poll_interval) => {}
            }

            let events = tail.poll().await.context("Failed to read recording")?;
            if !events.is_empty() {
                live.append(events).context("Recording events are out of order")?;
            }

            if queue.event_count() > printed {
                let text = queue.text_since(printed)?;
                emit(out, text, plain)?;
                printed = queue.event_count();
                last_activity = Instant::now();
            } else if idle_expired(idle_timeout, last_activity) {
                info!(
                    path = %tail.path().display(),
                    duration = queue.duration(),
                    "Recording idle, stopping"
                );
                return Ok(FollowExit::Idle);
            }
        }
    }
}

fn idle_expired(idle_timeout: Option<Duration>, last_activity: Instant) -> bool {
    idle_timeout.is_some_and(|timeout| last_activity.elapsed() >= timeout)
}

fn emit<W: Write>(out: &mut W, text: String, plain: bool) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let text = if plain { strip_control_sequences(&text) } else { text };
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}
