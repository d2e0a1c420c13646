// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// Recording model
//
// A recording is a header plus a shared, append-only event log. Static
// recordings are loaded once; live recordings keep appending and notify the
// frame queue through a registered feeder.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::RecordingError;
use crate::slice::EventSlice;

/// Channel tag for terminal output events
pub const OUTPUT_EVENT: char = 'o';

/// Channel tag for terminal input events
pub const INPUT_EVENT: char = 'i';

/// Recording header: terminal geometry and stated duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastHeader {
    pub version: u32,
    pub width: u16,
    pub height: u16,
    /// Stated duration in seconds; `f64::INFINITY` for live sources
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
}

impl CastHeader {
    pub fn new(width: u16, height: u16, duration: f64) -> Self {
        Self {
            version: 2,
            width,
            height,
            duration,
            audio: None,
        }
    }

    /// Header for a recording whose final duration is not known yet.
    pub fn live(width: u16, height: u16) -> Self {
        Self::new(width, height, f64::INFINITY)
    }

    pub fn with_audio(mut self, audio: impl Into<String>) -> Self {
        self.audio = Some(audio.into());
        self
    }
}

/// One timestamped chunk of terminal I/O
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastEvent {
    /// Seconds since the start of the recording
    pub time: f64,
    #[serde(rename = "type")]
    pub event_type: char,
    pub data: String,
}

impl CastEvent {
    pub fn new(time: f64, event_type: char, data: impl Into<String>) -> Self {
        Self {
            time,
            event_type,
            data: data.into(),
        }
    }

    pub fn output(time: f64, data: impl Into<String>) -> Self {
        Self::new(time, OUTPUT_EVENT, data)
    }

    pub fn input(time: f64, data: impl Into<String>) -> Self {
        Self::new(time, INPUT_EVENT, data)
    }
}

/// Shared append-only event log
///
/// Cloning is cheap and yields another handle to the same log. Events are
/// validated on append: times are finite, non-negative and non-decreasing.
#[derive(Clone, Default)]
pub struct CastEvents {
    inner: Rc<RefCell<Vec<CastEvent>>>,
}

impl CastEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events(events: Vec<CastEvent>) -> Result<Self, RecordingError> {
        let mut previous = None;
        for event in &events {
            check_event_time(previous, event.time)?;
            previous = Some(event.time);
        }
        Ok(Self {
            inner: Rc::new(RefCell::new(events)),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn push(&self, event: CastEvent) -> Result<(), RecordingError> {
        let mut events = self.inner.borrow_mut();
        check_event_time(events.last().map(|e| e.time), event.time)?;
        events.push(event);
        Ok(())
    }

    pub fn last_time(&self) -> Option<f64> {
        self.inner.borrow().last().map(|e| e.time)
    }

    /// Borrow the whole log.
    ///
    /// The borrow must be released before appending.
    pub fn borrow(&self) -> Ref<'_, [CastEvent]> {
        Ref::map(self.inner.borrow(), Vec::as_slice)
    }

    /// Zero-copy view over `[start, end)`, clamped to the current length.
    pub fn slice(&self, start: usize, end: usize) -> EventSlice {
        let len = self.len();
        let end = end.min(len);
        EventSlice::new(self.clone(), start.min(end), end)
    }
}

impl fmt::Debug for CastEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CastEvents").field("len", &self.len()).finish()
    }
}

fn check_event_time(previous: Option<f64>, time: f64) -> Result<(), RecordingError> {
    if !time.is_finite() {
        return Err(RecordingError::NonFiniteTime { time });
    }
    if time < 0.0 {
        return Err(RecordingError::NegativeTime { time });
    }
    match previous {
        Some(previous) if time < previous => Err(RecordingError::OutOfOrder { previous, time }),
        _ => Ok(()),
    }
}

/// Callback a streaming recording invokes after appending events
pub type Feeder = Box<dyn FnMut()>;

/// A recording: header plus event log
pub trait CastRecording {
    fn header(&self) -> &CastHeader;

    fn events(&self) -> &CastEvents;

    /// The streaming capability, for recordings that grow after load.
    fn streaming(&mut self) -> Option<&mut dyn StreamingCast> {
        None
    }
}

/// Capability of recordings that keep appending events
///
/// The recording calls the feeder after every append of one or more events.
/// It does not pass the new events; the consumer re-scans the shared log.
pub trait StreamingCast {
    fn set_feeder(&mut self, feeder: Feeder);
}

/// Fully loaded recording
#[derive(Debug, Clone)]
pub struct Cast {
    header: CastHeader,
    events: CastEvents,
}

impl Cast {
    pub fn new(header: CastHeader, events: CastEvents) -> Self {
        Self { header, events }
    }

    pub fn from_events(header: CastHeader, events: Vec<CastEvent>) -> Result<Self, RecordingError> {
        Ok(Self::new(header, CastEvents::from_events(events)?))
    }
}

impl CastRecording for Cast {
    fn header(&self) -> &CastHeader {
        &self.header
    }

    fn events(&self) -> &CastEvents {
        &self.events
    }
}

/// Recording that grows while it is being watched
pub struct LiveCast {
    header: CastHeader,
    events: CastEvents,
    feeder: Option<Feeder>,
}

impl LiveCast {
    pub fn new(header: CastHeader) -> Self {
        Self::with_events(header, CastEvents::new())
    }

    pub fn with_events(header: CastHeader, events: CastEvents) -> Self {
        Self {
            header,
            events,
            feeder: None,
        }
    }

    /// Append events in order, then notify the feeder once if anything was
    /// appended. Stops at the first rejected event; the events before it stay
    /// appended and are still announced.
    pub fn append<I>(&mut self, events: I) -> Result<usize, RecordingError>
    where
        I: IntoIterator<Item = CastEvent>,
    {
        let mut appended = 0;
        let mut rejected = None;
        for event in events {
            if let Err(e) = self.events.push(event) {
                rejected = Some(e);
                break;
            }
            appended += 1;
        }

        if appended > 0 {
            self.notify();
        }

        match rejected {
            Some(e) => Err(e),
            None => Ok(appended),
        }
    }

    pub fn has_feeder(&self) -> bool {
        self.feeder.is_some()
    }

    fn notify(&mut self) {
        if let Some(feeder) = self.feeder.as_mut() {
            feeder();
        }
    }
}

impl CastRecording for LiveCast {
    fn header(&self) -> &CastHeader {
        &self.header
    }

    fn events(&self) -> &CastEvents {
        &self.events
    }

    fn streaming(&mut self) -> Option<&mut dyn StreamingCast> {
        Some(self)
    }
}

impl StreamingCast for LiveCast {
    fn set_feeder(&mut self, feeder: Feeder) {
        self.feeder = Some(feeder);
    }
}

impl fmt::Debug for LiveCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveCast")
            .field("header", &self.header)
            .field("events", &self.events)
            .field("has_feeder", &self.has_feeder())
            .finish()
    }
}
