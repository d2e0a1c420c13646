// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Default number of events batched into one frame
pub const DEFAULT_FRAME_EVENTS_STEP: usize = 30;

/// Function applied to a frame's full text before it is cached
///
/// The default is the identity. Transforms see the predecessor's already
/// transformed snapshot followed by the frame's raw event text.
#[derive(Clone, Default)]
pub struct SnapshotTransform(Option<Rc<dyn Fn(&str) -> String>>);

impl SnapshotTransform {
    pub fn identity() -> Self {
        Self(None)
    }

    pub fn new(transform: impl Fn(&str) -> String + 'static) -> Self {
        Self(Some(Rc::new(transform)))
    }

    /// Drop ANSI escape sequences (CSI, OSC and two-byte escapes) so cached
    /// snapshots hold printable text only.
    pub fn strip_control_sequences() -> Self {
        Self::new(strip_control_sequences)
    }

    pub fn is_identity(&self) -> bool {
        self.0.is_none()
    }

    pub fn apply(&self, text: String) -> String {
        match &self.0 {
            None => text,
            Some(transform) => transform(&text),
        }
    }
}

impl fmt::Debug for SnapshotTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            f.write_str("SnapshotTransform(identity)")
        } else {
            f.write_str("SnapshotTransform(custom)")
        }
    }
}

/// Frame queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FrameQueueConfig {
    /// Events per frame; bounds the work of a single `data` call
    pub step: usize,
    #[serde(skip)]
    pub snapshot_transform: SnapshotTransform,
}

impl Default for FrameQueueConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_FRAME_EVENTS_STEP,
            snapshot_transform: SnapshotTransform::identity(),
        }
    }
}

impl FrameQueueConfig {
    pub fn with_step(mut self, step: usize) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn with_snapshot_transform(mut self, transform: SnapshotTransform) -> Self {
        self.snapshot_transform = transform;
        self
    }

    /// Step actually used for batching; a zero step from a config file means 1.
    pub(crate) fn effective_step(&self) -> usize {
        self.step.max(1)
    }
}

/// Remove ANSI escape sequences from `text`.
pub fn strip_control_sequences(text: &str) -> String {
    const ESC: char = '\x1b';
    const BEL: char = '\x07';

    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != ESC {
            result.push(ch);
            continue;
        }

        match chars.next() {
            // CSI: parameters and intermediates, ended by a byte in '@'..='~'
            Some('[') => {
                for c in chars.by_ref() {
                    if ('@'..='~').contains(&c) {
                        break;
                    }
                }
            }
            // OSC: ended by BEL or ST (ESC \)
            Some(']') => {
                while let Some(c) = chars.next() {
                    if c == BEL {
                        break;
                    }
                    if c == ESC && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            // Character set designations carry one more byte
            Some('(' | ')' | '*' | '+') => {
                chars.next();
            }
            Some(_) | None => {}
        }
    }

    result
}
