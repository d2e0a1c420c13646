// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

// asciicast v2 reader
//
// A cast file is newline-delimited JSON: a header object on the first line,
// then one `[time, "type", "data"]` array per event.

use std::path::{Path, PathBuf};

use castplay_frames::{
    Cast, CastEvent, CastEvents, CastHeader, CastRecording, RecordingError, INPUT_EVENT,
    OUTPUT_EVENT,
};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, trace};

pub const SUPPORTED_VERSION: u32 = 2;

#[derive(Debug, Error)]
pub enum CastFileError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("recording has no header line")]
    MissingHeader,

    #[error("line {line}: invalid header: {source}")]
    Header {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: unsupported asciicast version {version} (expected 2)")]
    UnsupportedVersion { line: usize, version: u32 },

    #[error("line {line}: invalid event: {source}")]
    Event {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: {source}")]
    Recording {
        line: usize,
        #[source]
        source: RecordingError,
    },

    #[error("line {line}: invalid UTF-8")]
    Utf8 { line: usize },
}

#[derive(Debug, Deserialize)]
struct HeaderLine {
    version: u32,
    width: u16,
    height: u16,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    audio: Option<String>,
}

/// Which event channels end up in the recording
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelFilter {
    pub include_input: bool,
}

impl ChannelFilter {
    /// Markers, resizes and unknown channels carry no terminal text and are
    /// always dropped.
    pub fn keeps(&self, event_type: char) -> bool {
        match event_type {
            OUTPUT_EVENT => true,
            INPUT_EVENT => self.include_input,
            _ => false,
        }
    }
}

/// One parsed line
#[derive(Debug, Clone, PartialEq)]
pub enum CastLine {
    Header {
        header: CastHeader,
        /// Whether the header stated a duration
        stated_duration: bool,
    },
    Event(CastEvent),
    /// Blank line or filtered event
    Skipped,
}

/// Line-by-line parser shared by whole-file loading and tailing
#[derive(Debug, Default)]
pub struct CastParser {
    line: usize,
    seen_header: bool,
    last_time: Option<f64>,
    filter: ChannelFilter,
}

impl CastParser {
    pub fn new(filter: ChannelFilter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Number of lines consumed so far
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn parse_line(&mut self, text: &str) -> Result<CastLine, CastFileError> {
        self.line += 1;
        let line = self.line;
        let text = text.trim_end_matches('\r');
        if text.trim().is_empty() {
            return Ok(CastLine::Skipped);
        }

        if !self.seen_header {
            let parsed: HeaderLine = serde_json::from_str(text)
                .map_err(|source| CastFileError::Header { line, source })?;
            if parsed.version != SUPPORTED_VERSION {
                return Err(CastFileError::UnsupportedVersion {
                    line,
                    version: parsed.version,
                });
            }
            self.seen_header = true;

            let stated_duration = parsed.duration.is_some();
            let mut header = CastHeader::new(
                parsed.width,
                parsed.height,
                parsed.duration.unwrap_or(f64::INFINITY),
            );
            header.audio = parsed.audio;
            return Ok(CastLine::Header {
                header,
                stated_duration,
            });
        }

        let (time, event_type, data): (f64, char, String) = serde_json::from_str(text)
            .map_err(|source| CastFileError::Event { line, source })?;

        if time < 0.0 {
            return Err(CastFileError::Recording {
                line,
                source: RecordingError::NegativeTime { time },
            });
        }
        if let Some(previous) = self.last_time {
            if time < previous {
                return Err(CastFileError::Recording {
                    line,
                    source: RecordingError::OutOfOrder { previous, time },
                });
            }
        }
        self.last_time = Some(time);

        if self.filter.keeps(event_type) {
            Ok(CastLine::Event(CastEvent::new(time, event_type, data)))
        } else {
            trace!(line, %event_type, "Skipping event channel");
            Ok(CastLine::Skipped)
        }
    }
}

/// Parse a complete cast file.
///
/// A header without `duration` gets the last event's time.
pub fn parse_cast(text: &str, filter: ChannelFilter) -> Result<Cast, CastFileError> {
    let mut parser = CastParser::new(filter);
    let mut header = None;
    let mut events = Vec::new();

    for raw in text.lines() {
        match parser.parse_line(raw)? {
            CastLine::Header {
                header: parsed,
                stated_duration,
            } => header = Some((parsed, stated_duration)),
            CastLine::Event(event) => events.push(event),
            CastLine::Skipped => {}
        }
    }

    let (mut header, stated_duration) = header.ok_or(CastFileError::MissingHeader)?;
    if !stated_duration {
        header.duration = events.last().map(|e| e.time).unwrap_or(0.0);
    }

    let line = parser.line();
    let events = CastEvents::from_events(events)
        .map_err(|source| CastFileError::Recording { line, source })?;
    Ok(Cast::new(header, events))
}

/// Read and parse a cast file.
pub async fn load_cast(path: &Path, filter: ChannelFilter) -> Result<Cast, CastFileError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CastFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let cast = parse_cast(&text, filter)?;
    debug!(path = %path.display(), events = cast.events().len(), "Loaded cast file");
    Ok(cast)
}

/// Incremental reader for a cast file that is still being written
///
/// Each [`poll`](Self::poll) reads whatever was appended since the previous
/// call. Only newline-terminated lines are parsed; a partial last line waits
/// for the next poll.
#[derive(Debug)]
pub struct CastTail {
    path: PathBuf,
    offset: u64,
    pending: Vec<u8>,
    parser: CastParser,
    header: Option<CastHeader>,
}

impl CastTail {
    pub fn new(path: impl Into<PathBuf>, filter: ChannelFilter) -> Self {
        Self {
            path: path.into(),
            offset: 0,
            pending: Vec::new(),
            parser: CastParser::new(filter),
            header: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header once its line has been read. A header without a stated
    /// duration is live: its duration is infinite.
    pub fn header(&self) -> Option<&CastHeader> {
        self.header.as_ref()
    }

    /// Events appended since the last poll. A missing file reads as empty.
    pub async fn poll(&mut self) -> Result<Vec<CastEvent>, CastFileError> {
        let io_error = |source| CastFileError::Io {
            path: self.path.clone(),
            source,
        };

        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(e)),
        };
        file.seek(std::io::SeekFrom::Start(self.offset))
            .await
            .map_err(io_error)?;
        let read = file.read_to_end(&mut self.pending).await.map_err(io_error)?;
        self.offset += read as u64;

        let mut events = Vec::new();
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Ok(events);
        };
        let complete: Vec<u8> = self.pending.drain(..=last_newline).collect();

        for raw in complete[..last_newline].split(|b| *b == b'\n') {
            let text = std::str::from_utf8(raw).map_err(|_| CastFileError::Utf8 {
                line: self.parser.line() + 1,
            })?;
            match self.parser.parse_line(text)? {
                CastLine::Header { header, .. } => self.header = Some(header),
                CastLine::Event(event) => events.push(event),
                CastLine::Skipped => {}
            }
        }

        if read > 0 {
            trace!(bytes = read, events = events.len(), "Read appended cast data");
        }
        Ok(events)
    }
}
