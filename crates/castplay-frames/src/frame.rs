// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Frames
//
// A frame covers the time range of a contiguous batch of events. Frames live
// in the frame queue's arena and link to their predecessor by arena index.
// Content frames memoize their snapshot: the full text from the start of the
// recording through their last event.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::config::SnapshotTransform;
use crate::error::{FrameError, Result};
use crate::slice::EventSlice;

/// Index of a frame in the queue arena
pub type FrameIndex = usize;

/// Which role a frame plays in the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Chain root, before any event
    Start,
    Content,
    /// Current or past end of the recording
    End,
    /// Returned for times no frame covers
    Null,
}

/// Zero-length frame without events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelFrame {
    pub start_time: f64,
    pub end_time: f64,
    pub prev: Option<FrameIndex>,
}

impl SentinelFrame {
    pub fn at(time: f64, prev: Option<FrameIndex>) -> Self {
        Self {
            start_time: time,
            end_time: time,
            prev,
        }
    }
}

/// Frame over a non-empty batch of events
pub struct ContentFrame {
    start_time: f64,
    end_time: f64,
    events: EventSlice,
    prev: Option<FrameIndex>,
    snapshot: OnceCell<Rc<str>>,
}

impl ContentFrame {
    pub fn new(
        start_time: f64,
        end_time: f64,
        events: EventSlice,
        prev: Option<FrameIndex>,
    ) -> Result<Self> {
        let first_time = match events.get(0) {
            Some(first) => first.time,
            None => return Err(FrameError::EmptyEvents),
        };
        if start_time < 0.0 {
            return Err(FrameError::NegativeStart { start_time });
        }
        if end_time < start_time {
            return Err(FrameError::InvertedRange {
                start_time,
                end_time,
            });
        }
        if first_time > end_time {
            return Err(FrameError::EventAfterEnd {
                event_time: first_time,
                end_time,
            });
        }

        Ok(Self {
            start_time,
            end_time,
            events,
            prev,
            snapshot: OnceCell::new(),
        })
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn events(&self) -> &EventSlice {
        &self.events
    }

    /// Relink the frame. The memoized snapshot is dropped only when the
    /// predecessor actually changes.
    pub fn set_prev(&mut self, prev: Option<FrameIndex>) {
        if self.prev != prev {
            self.prev = prev;
            self.snapshot.take();
        }
    }

    /// Text of the events with `start_time < time <= end_time`.
    ///
    /// `end_time` must lie in `[self.start_time, self.end_time)`; callers route
    /// to the right frame through the queue first. `None` for `start_time`
    /// starts at the first event of the frame.
    pub fn data(&self, end_time: f64, start_time: Option<f64>) -> Result<String> {
        if !(self.start_time <= end_time && end_time < self.end_time) {
            return Err(FrameError::OutOfRange {
                time: end_time,
                start_time: self.start_time,
                end_time: self.end_time,
            });
        }
        Ok(self.collect(start_time.unwrap_or(-1.0), end_time))
    }

    /// Text of the events with `start < time <= end`, without range checks.
    pub(crate) fn collect(&self, start: f64, end: f64) -> String {
        let mut text = String::new();
        for event in self.events.events().iter() {
            if event.time > end {
                break;
            }
            if event.time > start {
                text.push_str(&event.data);
            }
        }
        text
    }

    pub fn cached_snapshot(&self) -> Option<Rc<str>> {
        self.snapshot.get().cloned()
    }

    /// Snapshot of this frame given its predecessor's snapshot. Computed
    /// once, then served from the memo until the frame is relinked.
    pub fn snapshot_after(&self, prev_snapshot: &str, transform: &SnapshotTransform) -> Rc<str> {
        self.snapshot
            .get_or_init(|| {
                let events = self.events.events();
                let own_len: usize = events.iter().map(|e| e.data.len()).sum();
                let mut text = String::with_capacity(prev_snapshot.len() + own_len);
                text.push_str(prev_snapshot);
                for event in events.iter() {
                    text.push_str(&event.data);
                }
                Rc::from(transform.apply(text))
            })
            .clone()
    }
}

impl fmt::Debug for ContentFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentFrame")
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .field("events", &self.events.len())
            .field("prev", &self.prev)
            .field("cached", &self.snapshot.get().is_some())
            .finish()
    }
}

/// Arena entry
#[derive(Debug)]
pub enum Frame {
    Sentinel(SentinelFrame),
    Content(ContentFrame),
    Null,
}

impl Frame {
    pub fn start_time(&self) -> f64 {
        match self {
            Frame::Sentinel(sentinel) => sentinel.start_time,
            Frame::Content(content) => content.start_time,
            Frame::Null => 0.0,
        }
    }

    pub fn end_time(&self) -> f64 {
        match self {
            Frame::Sentinel(sentinel) => sentinel.end_time,
            Frame::Content(content) => content.end_time,
            Frame::Null => 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time() - self.start_time()
    }

    pub fn as_content(&self) -> Option<&ContentFrame> {
        match self {
            Frame::Content(content) => Some(content),
            _ => None,
        }
    }
}

/// Snapshot of the frame at `index`.
///
/// Walks back to the nearest frame with a memoized snapshot (or the chain
/// root), then fills the memos forward. No recursion, so chain length is
/// unbounded.
pub(crate) fn resolve_snapshot(
    frames: &[Frame],
    index: FrameIndex,
    transform: &SnapshotTransform,
) -> Rc<str> {
    let mut pending = Vec::new();
    let mut base: Rc<str> = Rc::from("");
    let mut cursor = Some(index);

    while let Some(i) = cursor {
        match frames.get(i) {
            Some(Frame::Content(content)) => {
                if let Some(cached) = content.cached_snapshot() {
                    base = cached;
                    break;
                }
                pending.push(i);
                cursor = content.prev;
            }
            Some(Frame::Sentinel(sentinel)) => cursor = sentinel.prev,
            Some(Frame::Null) | None => break,
        }
    }

    for i in pending.into_iter().rev() {
        if let Some(Frame::Content(content)) = frames.get(i) {
            base = content.snapshot_after(&base, transform);
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{CastEvent, CastEvents};
    use castplay_test_utils::logged_test;

    fn events(items: &[(f64, &str)]) -> CastEvents {
        CastEvents::from_events(items.iter().map(|(t, d)| CastEvent::output(*t, *d)).collect())
            .unwrap()
    }

    #[logged_test]
    fn test_construction_rejects_invalid_frames() {
        let log = events(&[(2.0, "a"), (3.0, "b")]);

        assert_eq!(
            ContentFrame::new(0.0, 1.0, log.slice(0, 0), None).unwrap_err(),
            FrameError::EmptyEvents
        );
        assert_eq!(
            ContentFrame::new(-1.0, 3.0, log.slice(0, 2), None).unwrap_err(),
            FrameError::NegativeStart { start_time: -1.0 }
        );
        assert_eq!(
            ContentFrame::new(3.0, 2.0, log.slice(0, 2), None).unwrap_err(),
            FrameError::InvertedRange {
                start_time: 3.0,
                end_time: 2.0
            }
        );
        assert_eq!(
            ContentFrame::new(0.0, 1.0, log.slice(0, 2), None).unwrap_err(),
            FrameError::EventAfterEnd {
                event_time: 2.0,
                end_time: 1.0
            }
        );
        assert!(ContentFrame::new(2.0, 2.0, log.slice(0, 1), None).is_ok());
    }

    #[logged_test]
    fn test_data_filters_half_open_interval() {
        let log = events(&[(1.0, "a"), (2.0, "b"), (3.0, "c"), (4.0, "d")]);
        let frame = ContentFrame::new(1.0, 4.0, log.slice(0, 4), None).unwrap();

        assert_eq!(frame.data(1.0, None).unwrap(), "a");
        assert_eq!(frame.data(3.0, None).unwrap(), "abc");
        assert_eq!(frame.data(3.0, Some(1.0)).unwrap(), "bc");
        assert_eq!(frame.data(2.5, Some(2.0)).unwrap(), "");
        assert_eq!(frame.duration(), 3.0);
    }

    #[logged_test]
    fn test_data_out_of_range_is_an_error() {
        let log = events(&[(1.0, "a"), (4.0, "d")]);
        let frame = ContentFrame::new(1.0, 4.0, log.slice(0, 2), None).unwrap();

        for time in [0.5, 4.0, 9.0] {
            assert_eq!(
                frame.data(time, None).unwrap_err(),
                FrameError::OutOfRange {
                    time,
                    start_time: 1.0,
                    end_time: 4.0
                }
            );
        }
    }

    #[logged_test]
    fn test_snapshot_is_memoized_until_relinked() {
        let log = events(&[(0.0, "a"), (1.0, "b"), (2.0, "c")]);
        let mut frames = vec![
            Frame::Sentinel(SentinelFrame::at(0.0, None)),
            Frame::Content(ContentFrame::new(0.0, 1.0, log.slice(0, 2), Some(0)).unwrap()),
            Frame::Content(ContentFrame::new(2.0, 2.0, log.slice(2, 3), Some(1)).unwrap()),
        ];
        let transform = SnapshotTransform::identity();

        assert_eq!(&*resolve_snapshot(&frames, 2, &transform), "abc");
        assert_eq!(
            frames[1].as_content().unwrap().cached_snapshot().as_deref(),
            Some("ab")
        );

        if let Frame::Content(last) = &mut frames[2] {
            last.set_prev(Some(1));
            assert!(last.cached_snapshot().is_some(), "same predecessor keeps the memo");
            last.set_prev(Some(0));
            assert!(last.cached_snapshot().is_none());
        }
        assert_eq!(&*resolve_snapshot(&frames, 2, &transform), "c");
    }

    #[logged_test]
    fn test_transform_applies_to_every_content_frame() {
        let log = events(&[(0.0, "x"), (1.0, "y")]);
        let frames = vec![
            Frame::Sentinel(SentinelFrame::at(0.0, None)),
            Frame::Content(ContentFrame::new(0.0, 0.0, log.slice(0, 1), Some(0)).unwrap()),
            Frame::Content(ContentFrame::new(1.0, 1.0, log.slice(1, 2), Some(1)).unwrap()),
            Frame::Sentinel(SentinelFrame::at(1.0, Some(2))),
        ];
        let bracket = SnapshotTransform::new(|s| format!("[{s}]"));

        assert_eq!(&*resolve_snapshot(&frames, 3, &bracket), "[[x]y]");
        assert_eq!(&*resolve_snapshot(&frames, 0, &bracket), "");
    }
}
