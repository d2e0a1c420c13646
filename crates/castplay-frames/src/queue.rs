// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Frame queue
//
// Owns the frame arena of one recording:
//
//   [start sentinel, content_1 .. content_N, end sentinel]
//
// Batching appends content frames of up to `step` events and replaces the
// end sentinel. Existing content frames are never touched again, so frames
// handed out earlier stay valid while a live recording grows.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, trace, warn};

use crate::config::{FrameQueueConfig, SnapshotTransform};
use crate::emitter::{EventEmitter, Subscription};
use crate::error::{FrameError, Result};
use crate::frame::{resolve_snapshot, ContentFrame, Frame, FrameIndex, FrameKind, SentinelFrame};
use crate::recording::{CastEvents, CastHeader, CastRecording};

const START_SENTINEL: FrameIndex = 0;

/// Time to frame lookup shared by [`FrameQueue`] and [`NullFrameQueue`]
pub trait FrameLookup {
    fn frame(&self, time: f64) -> Result<FrameRef<'_>>;

    /// Whether `frame` is the current end of the recording.
    fn is_end(&self, frame: &FrameRef<'_>) -> bool;

    /// Number of content frames
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct QueueState {
    header: CastHeader,
    events: CastEvents,
    frames: Vec<Frame>,
    step: usize,
    transform: SnapshotTransform,
    /// Events already batched into frames
    cursor: usize,
    content_frames: usize,
    duration: f64,
    /// Bumped every time the end sentinel is replaced
    epoch: u64,
    disposed: bool,
}

impl QueueState {
    fn add_frames(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            let pending = self.events.len();
            self.frames.reserve(2 + pending.div_ceil(self.step));
            self.frames.push(Frame::Sentinel(SentinelFrame::at(0.0, None)));
        } else {
            self.frames.pop();
        }

        let batched = self.batch_pending();

        self.duration = self.current_duration();
        self.epoch += 1;
        let last = self.frames.len() - 1;
        self.frames
            .push(Frame::Sentinel(SentinelFrame::at(self.duration, Some(last))));

        batched
    }

    fn batch_pending(&mut self) -> Result<()> {
        let total = self.events.len();
        let before = self.content_frames;

        while self.cursor < total {
            let end = (self.cursor + self.step).min(total);
            let slice = self.events.slice(self.cursor, end);
            let (start_time, end_time) = {
                let events = slice.events();
                match (events.first(), events.last()) {
                    (Some(first), Some(last)) => (first.time, last.time),
                    _ => return Err(FrameError::EmptyEvents),
                }
            };

            let prev = self.frames.len() - 1;
            let frame = ContentFrame::new(start_time, end_time, slice, Some(prev))?;
            self.frames.push(Frame::Content(frame));
            self.cursor = end;
            self.content_frames += 1;
        }

        trace!(
            added = self.content_frames - before,
            frames = self.content_frames,
            events = total,
            "Batched events into frames"
        );
        Ok(())
    }

    fn current_duration(&self) -> f64 {
        let last_event = self.events.last_time().unwrap_or(0.0);
        if self.header.duration.is_finite() {
            last_event.max(self.header.duration)
        } else {
            last_event
        }
    }

    fn content(&self, index: FrameIndex) -> Option<&ContentFrame> {
        self.frames.get(index).and_then(Frame::as_content)
    }

    fn end_sentinel(&self) -> Option<SentinelFrame> {
        match self.frames.last() {
            Some(Frame::Sentinel(sentinel)) if self.frames.len() > 1 => Some(*sentinel),
            _ => None,
        }
    }

    fn content_range(&self) -> &[Frame] {
        &self.frames[1..=self.content_frames]
    }

    /// Arena index of the last content frame ending at or before `time`, or
    /// the start sentinel when there is none.
    fn last_frame_ending_by(&self, time: f64) -> FrameIndex {
        self.content_range().partition_point(|frame| frame.end_time() <= time)
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(FrameError::Disposed)
        } else {
            Ok(())
        }
    }
}

/// Frame index over one recording
///
/// All methods take `&self`; the queue may be shared through an `Rc` and
/// queried from duration-changed handlers.
pub struct FrameQueue {
    state: Rc<RefCell<QueueState>>,
    duration_changed: EventEmitter<f64>,
}

impl FrameQueue {
    /// Batch the recording's current events. Streaming recordings get a
    /// feeder that batches newly appended events.
    pub fn new(recording: &mut dyn CastRecording, config: FrameQueueConfig) -> Result<Self> {
        let step = config.effective_step();
        let mut state = QueueState {
            header: recording.header().clone(),
            events: recording.events().clone(),
            frames: Vec::new(),
            step,
            transform: config.snapshot_transform,
            cursor: 0,
            content_frames: 0,
            duration: 0.0,
            epoch: 0,
            disposed: false,
        };
        state.add_frames()?;

        debug!(
            step,
            events = state.cursor,
            frames = state.content_frames,
            duration = state.duration,
            "Created frame queue"
        );

        let queue = Self {
            state: Rc::new(RefCell::new(state)),
            duration_changed: EventEmitter::new(),
        };

        if let Some(streaming) = recording.streaming() {
            let state = Rc::downgrade(&queue.state);
            let duration_changed = queue.duration_changed.clone();
            streaming.set_feeder(Box::new(move || {
                let Some(state) = state.upgrade() else {
                    trace!("Feeder called after the frame queue was dropped");
                    return;
                };

                let changed = {
                    let mut state = state.borrow_mut();
                    if state.disposed {
                        warn!("Feeder called on a disposed frame queue");
                        return;
                    }
                    let previous = state.duration;
                    if let Err(e) = state.add_frames() {
                        error!(error = %e, "Failed to batch appended events");
                    }
                    (state.duration != previous).then_some(state.duration)
                };

                if let Some(duration) = changed {
                    debug!(duration, "Recording duration changed");
                    duration_changed.fire(&duration);
                }
            }));
        }

        Ok(queue)
    }

    /// Frame covering `time`.
    ///
    /// Times at or after the last content frame's end resolve to the end
    /// sentinel. Times between two frames resolve to the null frame.
    pub fn frame(&self, time: f64) -> Result<FrameRef<'_>> {
        if time.is_nan() || time < 0.0 {
            return Err(FrameError::NegativeTime { time });
        }
        let state = self.state.borrow();
        state.ensure_live()?;
        if state.content_frames == 0 {
            return Err(FrameError::EmptyQueue);
        }

        let last_end = state.frames[state.content_frames].end_time();
        if time >= last_end {
            return self.end_ref(&state);
        }

        let mut low = 1;
        let mut high = state.content_frames;
        while low <= high {
            let mid = low + (high - low) / 2;
            let frame = &state.frames[mid];
            if time >= frame.end_time() {
                low = mid + 1;
            } else if time < frame.start_time() {
                high = mid - 1;
            } else {
                return Ok(FrameRef {
                    queue: Some(self),
                    slot: Slot::Content(mid),
                    start_time: frame.start_time(),
                    end_time: frame.end_time(),
                });
            }
        }

        trace!(time, "Lookup fell between frames");
        Ok(FrameRef::null())
    }

    /// The chain root: zero length at time 0, empty snapshot.
    pub fn start_frame(&self) -> FrameRef<'_> {
        FrameRef {
            queue: Some(self),
            slot: Slot::Start,
            start_time: 0.0,
            end_time: 0.0,
        }
    }

    /// The current end sentinel.
    pub fn end_frame(&self) -> Result<FrameRef<'_>> {
        let state = self.state.borrow();
        state.ensure_live()?;
        self.end_ref(&state)
    }

    fn end_ref(&self, state: &QueueState) -> Result<FrameRef<'_>> {
        let sentinel = state.end_sentinel().ok_or(FrameError::EmptyQueue)?;
        Ok(FrameRef {
            queue: Some(self),
            slot: Slot::End {
                epoch: state.epoch,
                prev: sentinel.prev,
            },
            start_time: sentinel.start_time,
            end_time: sentinel.end_time,
        })
    }

    pub fn is_end(&self, frame: &FrameRef<'_>) -> bool {
        let Some(owner) = frame.queue else {
            return false;
        };
        if !std::ptr::eq(owner, self) {
            return false;
        }
        let state = self.state.borrow();
        match frame.slot {
            Slot::End { epoch, .. } => !state.disposed && epoch == state.epoch,
            _ => false,
        }
    }

    /// Number of content frames
    pub fn len(&self) -> usize {
        self.state.borrow().content_frames
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current total duration in seconds
    pub fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    pub fn header(&self) -> CastHeader {
        self.state.borrow().header.clone()
    }

    /// Events per content frame
    pub fn step(&self) -> usize {
        self.state.borrow().step
    }

    /// Number of events batched into frames so far
    pub fn event_count(&self) -> usize {
        self.state.borrow().cursor
    }

    /// Text of the batched events from `event_index` on, in log order.
    ///
    /// Unlike [`delta`](Self::delta) this is keyed by position in the log,
    /// so events that share a timestamp with already consumed ones, or that
    /// land below a stated duration, are still returned exactly once.
    pub fn text_since(&self, event_index: usize) -> Result<String> {
        let state = self.state.borrow();
        state.ensure_live()?;
        let events = state.events.borrow();
        let end = state.cursor.min(events.len());
        Ok(events[event_index.min(end)..end]
            .iter()
            .map(|event| event.data.as_str())
            .collect())
    }

    /// Call `handler` with the new duration whenever a feeder round changes
    /// it. Handlers run synchronously inside the feeder.
    pub fn on_duration_changed(&self, handler: impl Fn(&f64) + 'static) -> Subscription {
        self.duration_changed.subscribe(handler)
    }

    /// Full text of every event at or before `time`.
    pub fn snapshot_at(&self, time: f64) -> Result<String> {
        if time.is_nan() || time < 0.0 {
            return Err(FrameError::NegativeTime { time });
        }
        let state = self.state.borrow();
        state.ensure_live()?;

        let settled = state.last_frame_ending_by(time);
        let mut text = if settled == START_SENTINEL {
            String::new()
        } else {
            resolve_snapshot(&state.frames, settled, &state.transform).to_string()
        };
        if let Some(next) = state.content(settled + 1) {
            text.push_str(&next.collect(-1.0, time));
        }
        Ok(text)
    }

    /// Text of every event with `start < time <= end`, across frames.
    pub fn delta(&self, start: f64, end: f64) -> Result<String> {
        if end.is_nan() || end < 0.0 {
            return Err(FrameError::NegativeTime { time: end });
        }
        if start > end {
            return Err(FrameError::InvertedRange {
                start_time: start,
                end_time: end,
            });
        }
        let state = self.state.borrow();
        state.ensure_live()?;

        let mut text = String::new();
        let first = state.last_frame_ending_by(start) + 1;
        for index in first..=state.content_frames {
            let Some(frame) = state.content(index) else {
                break;
            };
            if frame.start_time() > end {
                break;
            }
            text.push_str(&frame.collect(start, end));
        }
        Ok(text)
    }

    /// Release the frame arena. Afterwards the queue is empty, lookups fail
    /// with [`FrameError::Disposed`] and feeder calls are ignored.
    pub fn dispose(&self) {
        let mut state = self.state.borrow_mut();
        if state.disposed {
            return;
        }
        debug!(frames = state.content_frames, "Disposing frame queue");
        state.frames = Vec::new();
        state.content_frames = 0;
        state.disposed = true;
    }

    pub fn is_disposed(&self) -> bool {
        self.state.borrow().disposed
    }

    fn content_data(&self, index: FrameIndex, end: f64, start: Option<f64>) -> Result<String> {
        let state = self.state.borrow();
        state.ensure_live()?;
        match state.content(index) {
            Some(frame) => frame.data(end, start),
            None => Err(FrameError::Disposed),
        }
    }

    fn snapshot_of(&self, index: FrameIndex) -> Rc<str> {
        let state = self.state.borrow();
        if state.disposed {
            return Rc::from("");
        }
        resolve_snapshot(&state.frames, index, &state.transform)
    }
}

impl FrameLookup for FrameQueue {
    fn frame(&self, time: f64) -> Result<FrameRef<'_>> {
        FrameQueue::frame(self, time)
    }

    fn is_end(&self, frame: &FrameRef<'_>) -> bool {
        FrameQueue::is_end(self, frame)
    }

    fn len(&self) -> usize {
        FrameQueue::len(self)
    }
}

impl fmt::Debug for FrameQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FrameQueue")
            .field("frames", &state.content_frames)
            .field("events", &state.cursor)
            .field("step", &state.step)
            .field("duration", &state.duration)
            .field("disposed", &state.disposed)
            .finish()
    }
}

/// Stand-in used before a recording is available: no frames, always at end
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFrameQueue;

impl FrameLookup for NullFrameQueue {
    fn frame(&self, _time: f64) -> Result<FrameRef<'_>> {
        Ok(FrameRef::null())
    }

    fn is_end(&self, _frame: &FrameRef<'_>) -> bool {
        true
    }

    fn len(&self) -> usize {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Start,
    Content(FrameIndex),
    End { epoch: u64, prev: Option<FrameIndex> },
    Null,
}

/// A frame handed out by a queue
///
/// Time range and identity are fixed when the reference is created. End
/// sentinels keep describing the end as of their creation; use
/// [`FrameQueue::is_end`] to check whether one is still current.
#[derive(Clone)]
pub struct FrameRef<'q> {
    queue: Option<&'q FrameQueue>,
    slot: Slot,
    start_time: f64,
    end_time: f64,
}

impl FrameRef<'static> {
    /// The no-op frame: zero length, no text.
    pub fn null() -> Self {
        FrameRef {
            queue: None,
            slot: Slot::Null,
            start_time: 0.0,
            end_time: 0.0,
        }
    }
}

impl FrameRef<'_> {
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn kind(&self) -> FrameKind {
        match self.slot {
            Slot::Start => FrameKind::Start,
            Slot::Content(_) => FrameKind::Content,
            Slot::End { .. } => FrameKind::End,
            Slot::Null => FrameKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        self.slot == Slot::Null
    }

    /// Text of the frame's events with `start_time < time <= end_time`.
    ///
    /// Content frames require `end_time` inside their own range and fail
    /// with [`FrameError::OutOfRange`] otherwise. Sentinels and the null
    /// frame have no events and return empty text.
    pub fn data(&self, end_time: f64, start_time: Option<f64>) -> Result<String> {
        match (self.slot, self.queue) {
            (Slot::Content(index), Some(queue)) => queue.content_data(index, end_time, start_time),
            _ => Ok(String::new()),
        }
    }

    /// Full text from the start of the recording through this frame's end.
    pub fn snapshot(&self) -> Rc<str> {
        let index = match self.slot {
            Slot::Content(index) => Some(index),
            Slot::End { prev, .. } => prev,
            Slot::Start | Slot::Null => None,
        };
        match (index, self.queue) {
            (Some(index), Some(queue)) => queue.snapshot_of(index),
            _ => Rc::from(""),
        }
    }
}

impl fmt::Debug for FrameRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRef")
            .field("kind", &self.kind())
            .field("start_time", &self.start_time)
            .field("end_time", &self.end_time)
            .finish()
    }
}
