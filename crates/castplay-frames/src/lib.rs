// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Frame index and incremental snapshot engine for terminal session replay
//!
//! A [`FrameQueue`] batches a recording's events into frames of a fixed number
//! of events. Each frame memoizes the full terminal text up to its end, so
//! seeking to any time costs one binary search plus at most one frame's worth
//! of event text. Live recordings ([`LiveCast`]) keep feeding the queue, which
//! appends frames and reports duration changes.
//!
//! ```
//! use castplay_frames::{Cast, CastEvent, CastHeader, FrameQueue, FrameQueueConfig};
//!
//! let mut cast = Cast::from_events(
//!     CastHeader::new(80, 24, 2.0),
//!     vec![CastEvent::output(0.0, "$ "), CastEvent::output(1.5, "ls\r\n")],
//! )
//! .unwrap();
//! let queue = FrameQueue::new(&mut cast, FrameQueueConfig::default()).unwrap();
//!
//! assert_eq!(queue.snapshot_at(1.0).unwrap(), "$ ");
//! assert_eq!(&*queue.end_frame().unwrap().snapshot(), "$ ls\r\n");
//! ```

pub mod config;
pub mod emitter;
pub mod error;
pub mod frame;
pub mod queue;
pub mod recording;
pub mod slice;

pub use config::{
    strip_control_sequences, FrameQueueConfig, SnapshotTransform, DEFAULT_FRAME_EVENTS_STEP,
};
pub use emitter::{EventEmitter, Subscription};
pub use error::{FrameError, RecordingError, Result};
pub use frame::{ContentFrame, Frame, FrameIndex, FrameKind, SentinelFrame};
pub use queue::{FrameLookup, FrameQueue, FrameRef, NullFrameQueue};
pub use recording::{
    Cast, CastEvent, CastEvents, CastHeader, CastRecording, Feeder, LiveCast, StreamingCast,
    INPUT_EVENT, OUTPUT_EVENT,
};
pub use slice::EventSlice;
