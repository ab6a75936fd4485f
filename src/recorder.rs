//! # Call Recorder Event Loop
//!
//! Serializes everything that can change the session state into one ordered
//! sequence of [`RecorderEvent`]s:
//!
//! - a frame arrived on the record stream
//! - the inactivity deadline elapsed
//! - the record stream ended (socket closed)
//! - shutdown was requested
//!
//! A single task owns the [`SessionManager`] and applies each event through
//! [`CallRecorder::handle`]. The deadline is a `tokio::time::Sleep` that is reset on
//! every frame, so the timer and the receive path never race for the session.

use crate::audio::session::SessionManager;
use crate::packet::CallRecord;
use futures_util::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{error, info};

/// Silence after which the open call is considered finished.
pub const INACTIVITY_WINDOW: Duration = Duration::from_millis(1000);

/// Everything that can change the session state, in arrival order.
#[derive(Debug)]
pub enum RecorderEvent {
    /// A valid frame came off the record stream
    Frame(CallRecord),
    /// No frame for [`INACTIVITY_WINDOW`] while a call was open
    InactivityElapsed,
    /// The record stream ended (the socket is gone)
    StreamClosed,
    /// Process shutdown was requested
    Shutdown,
}

/// Counters reported when the recorder stops.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecorderSummary {
    /// Calls that were recorded and closed cleanly
    pub calls: u64,
    /// Frames written into recordings
    pub frames: u64,
    /// Call attempts that hit a filesystem or sink error
    pub failed_calls: u64,
}

/// Single owner of the session state; see the module docs for the event model.
pub struct CallRecorder {
    sessions: SessionManager,
    summary: RecorderSummary,
}

impl CallRecorder {
    /// Wrap an Idle session manager; nothing runs until [`run`](Self::run).
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions,
            summary: RecorderSummary::default(),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn summary(&self) -> &RecorderSummary {
        &self.summary
    }

    /// Drive the session state machine until the stream ends or `shutdown` resolves.
    ///
    /// Any open call is finalized before this returns, and before `records` (and the
    /// socket behind it) is dropped.
    pub async fn run<S, F>(mut self, records: S, shutdown: F) -> RecorderSummary
    where
        S: Stream<Item = CallRecord>,
        F: Future<Output = ()>,
    {
        tokio::pin!(records);
        tokio::pin!(shutdown);
        let deadline = time::sleep(INACTIVITY_WINDOW);
        tokio::pin!(deadline);

        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => RecorderEvent::Shutdown,
                _ = &mut deadline, if self.sessions.is_recording() => RecorderEvent::InactivityElapsed,
                next = records.next() => match next {
                    Some(record) => RecorderEvent::Frame(record),
                    None => RecorderEvent::StreamClosed,
                },
            };

            if matches!(event, RecorderEvent::Frame(_)) {
                deadline.as_mut().reset(Instant::now() + INACTIVITY_WINDOW);
            }

            if !self.handle(event) {
                break;
            }
        }

        info!(
            calls = self.summary.calls,
            frames = self.summary.frames,
            failed_calls = self.summary.failed_calls,
            status = self.sessions.status().as_str(),
            "Recorder stopped"
        );
        self.summary
    }

    /// Apply one event. Returns `false` once the recorder should stop.
    pub fn handle(&mut self, event: RecorderEvent) -> bool {
        match event {
            RecorderEvent::Frame(record) => {
                match self.sessions.on_record(&record) {
                    Ok(()) => self.summary.frames += 1,
                    Err(e) => {
                        error!(
                            source_id = record.source_id,
                            destination_id = record.destination_id,
                            "Dropping frame, call could not be recorded: {}",
                            e
                        );
                        self.summary.failed_calls += 1;
                    }
                }
                true
            }
            RecorderEvent::InactivityElapsed => {
                self.finish_call("inactivity");
                true
            }
            RecorderEvent::StreamClosed => {
                self.finish_call("stream closed");
                false
            }
            RecorderEvent::Shutdown => {
                self.finish_call("shutdown");
                false
            }
        }
    }

    fn finish_call(&mut self, reason: &str) {
        match self.sessions.end_call() {
            Ok(Some(call)) => {
                info!(
                    reason,
                    sequence = call.sequence,
                    source_id = call.source_id,
                    destination_id = call.destination_id,
                    frames = call.frames,
                    bytes = call.bytes,
                    started_at = %call.started_at.to_rfc3339(),
                    duration_ms = call.duration.as_millis() as u64,
                    path = %call.path.display(),
                    "Call ended"
                );
                self.summary.calls += 1;
            }
            Ok(None) => {}
            Err(e) => {
                error!(reason, "Failed to finalize recording: {}", e);
                self.summary.failed_calls += 1;
            }
        }
    }
}
