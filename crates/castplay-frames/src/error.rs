// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use thiserror::Error;

/// Convenient result alias for frame and queue operations.
pub type Result<T> = std::result::Result<T, FrameError>;

/// Contract violations detected by frames and the frame queue.
///
/// Construction and range errors indicate a caller bug. Lookups that land in a
/// time gap are not errors: they resolve to the null frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// A content frame must own at least one event.
    #[error("invalid frame: empty events")]
    EmptyEvents,

    #[error("invalid frame: negative start time {start_time}")]
    NegativeStart { start_time: f64 },

    #[error("invalid frame: end time {end_time} before start time {start_time}")]
    InvertedRange { start_time: f64, end_time: f64 },

    #[error("invalid frame: first event at {event_time} is after frame end {end_time}")]
    EventAfterEnd { event_time: f64, end_time: f64 },

    /// `data` was asked for a time this frame does not cover.
    #[error("cannot get data of time {time}: frame covers [{start_time}, {end_time})")]
    OutOfRange {
        time: f64,
        start_time: f64,
        end_time: f64,
    },

    /// Negative or NaN query time.
    #[error("time must be a non-negative number, got {time}")]
    NegativeTime { time: f64 },

    #[error("frame queue is empty")]
    EmptyQueue,

    #[error("frame queue has been disposed")]
    Disposed,
}

/// Rejected appends to an event log.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordingError {
    #[error("event time must not be negative, got {time}")]
    NegativeTime { time: f64 },

    #[error("event time must be finite, got {time}")]
    NonFiniteTime { time: f64 },

    #[error("event at {time} precedes the previous event at {previous}")]
    OutOfOrder { previous: f64, time: f64 },
}
