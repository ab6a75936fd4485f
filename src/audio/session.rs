//! # Call Session Management
//!
//! Tracks the single call currently being recorded and decides when a recording is
//! opened, appended to, and closed.
//!
//! ## Session Lifecycle:
//! 1. **Idle**: No call in progress, no sink open
//! 2. **Recording**: A call is in progress and owns exactly one open sink
//!
//! The first frame received while Idle starts a call. Every later frame is appended
//! to that call until [`SessionManager::end_call`] is invoked (inactivity, stream end,
//! or shutdown). Frames are *not* matched against the identifiers that opened the
//! call: any traffic arriving while a call is open lands in the same recording.
//!
//! ## Ownership:
//! The manager is owned by the recorder event loop and mutated through `&mut self`
//! only, so there is exactly one writer and no locking.

use crate::audio::layout::RecordingLayout;
use crate::audio::sink::{CallSink, SinkFactory};
use crate::error::RecorderResult;
use crate::packet::CallRecord;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Source of the wall-clock time used to name recordings.
pub type Clock = fn() -> DateTime<Local>;

/// Which of the two session states the manager is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// No call in progress, no sink open
    Idle,
    /// A call is open and owns the sink
    Recording,
}

impl SessionStatus {
    /// Lowercase name used in log fields.
    pub fn as_str(&self) -> &str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Recording => "recording",
        }
    }
}

/// The call currently being recorded.
pub struct CallSession {
    pub source_id: u32,
    pub destination_id: u32,
    pub sequence: u64,
    pub path: PathBuf,
    /// Wall-clock start, the time the recording is named after
    pub started_at: DateTime<Local>,
    started: Instant,   // monotonic, for the duration only
    frames: u64,
    bytes: u64,
    sink: Box<dyn CallSink>,
}

impl CallSession {
    /// Append one payload and make it durable immediately.
    fn write(&mut self, payload: &[u8]) -> RecorderResult<()> {
        self.sink.append(payload)?;
        self.sink.flush()?;
        self.frames += 1;
        self.bytes += payload.len() as u64;
        Ok(())
    }

    /// Flush and release the sink. The sink is released even when the flush fails.
    fn finish(mut self) -> RecorderResult<CallSummary> {
        let flushed = self.sink.flush();
        let closed = self.sink.close();
        flushed.and(closed)?;

        Ok(CallSummary {
            source_id: self.source_id,
            destination_id: self.destination_id,
            sequence: self.sequence,
            path: self.path,
            started_at: self.started_at,
            frames: self.frames,
            bytes: self.bytes,
            duration: self.started.elapsed(),
        })
    }
}

/// What a finished call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSummary {
    pub source_id: u32,
    pub destination_id: u32,
    pub sequence: u64,
    pub path: PathBuf,
    pub started_at: DateTime<Local>,
    pub frames: u64,
    pub bytes: u64,
    pub duration: Duration,
}

/// Owns the session state machine.
pub struct SessionManager {
    layout: RecordingLayout,
    factory: Box<dyn SinkFactory>,
    clock: Clock,
    /// Incremented once per call start, never reset while the process lives
    sequence_counter: u64,
    current: Option<CallSession>,
}

impl SessionManager {
    /// Create an Idle manager that writes under `layout` through sinks from `factory`.
    ///
    /// Recordings are named after the local wall clock unless [`with_clock`](Self::with_clock)
    /// replaces it.
    pub fn new(layout: RecordingLayout, factory: Box<dyn SinkFactory>) -> Self {
        Self {
            layout,
            factory,
            clock: Local::now,
            sequence_counter: 0,
            current: None,
        }
    }

    /// Replace the wall clock used for naming recordings.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn status(&self) -> SessionStatus {
        if self.current.is_some() {
            SessionStatus::Recording
        } else {
            SessionStatus::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.current.is_some()
    }

    pub fn sequence_counter(&self) -> u64 {
        self.sequence_counter
    }

    pub fn current(&self) -> Option<&CallSession> {
        self.current.as_ref()
    }

    /// Route one frame.
    ///
    /// ## State Transitions:
    /// - Idle → Recording: a new call is opened, then the payload is written
    /// - Recording → Recording: the payload is appended to the open call
    ///
    /// ## Errors:
    /// If the call cannot be opened the manager stays Idle. If the write fails the
    /// call is closed and the manager goes back to Idle. Either way the error is
    /// returned and no half-open session remains.
    pub fn on_record(&mut self, record: &CallRecord) -> RecorderResult<()> {
        let mut session = match self.current.take() {
            Some(session) => session,
            None => self.start_call(record)?,
        };

        match session.write(&record.payload) {
            Ok(()) => {
                debug!(
                    sequence = session.sequence,
                    source_id = record.source_id,
                    destination_id = record.destination_id,
                    frames = session.frames,
                    "Appended frame"
                );
                self.current = Some(session);
                Ok(())
            }
            Err(e) => {
                let path = session.path.clone();
                if let Err(close_err) = session.finish() {
                    warn!(path = %path.display(), "Failed to close recording after write error: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Recording → Idle. Returns `None` when no call was open.
    pub fn end_call(&mut self) -> RecorderResult<Option<CallSummary>> {
        match self.current.take() {
            Some(session) => session.finish().map(Some),
            None => Ok(None),
        }
    }

    fn start_call(&mut self, record: &CallRecord) -> RecorderResult<CallSession> {
        // The counter advances even if opening fails, so a number is never handed out twice.
        self.sequence_counter += 1;
        let sequence = self.sequence_counter;
        let started_at = (self.clock)();

        let path = self.layout.call_path(
            &started_at,
            record.destination_id,
            record.source_id,
            sequence,
            self.factory.extension(),
        );
        self.layout.prepare(&path)?;
        let sink = self.factory.open(&path)?;

        info!(
            sequence,
            source_id = record.source_id,
            destination_id = record.destination_id,
            path = %path.display(),
            "Call started"
        );

        Ok(CallSession {
            source_id: record.source_id,
            destination_id: record.destination_id,
            sequence,
            path,
            started_at,
            started: Instant::now(),
            frames: 0,
            bytes: 0,
            sink,
        })
    }
}
