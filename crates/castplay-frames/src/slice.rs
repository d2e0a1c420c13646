// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::cell::Ref;
use std::fmt;

use crate::recording::{CastEvent, CastEvents};

/// Zero-copy view over a contiguous range of an event log
///
/// The log is append-only, so a range that was valid when the view was made
/// stays valid and keeps the same contents.
#[derive(Clone)]
pub struct EventSlice {
    events: CastEvents,
    start: usize,
    end: usize,
}

impl EventSlice {
    pub(crate) fn new(events: CastEvents, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= events.len());
        Self { events, start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Offset of the first event in the underlying log
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn get(&self, index: usize) -> Option<Ref<'_, CastEvent>> {
        if index >= self.len() {
            return None;
        }
        Some(Ref::map(self.events.borrow(), |events| &events[self.start + index]))
    }

    /// Borrow the viewed events as a slice.
    pub fn events(&self) -> Ref<'_, [CastEvent]> {
        Ref::map(self.events.borrow(), |events| &events[self.start..self.end])
    }
}

impl fmt::Debug for EventSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSlice")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}
