//! # Error Handling
//!
//! This module defines the error types used by the recorder and how each kind of
//! failure is treated by the rest of the program.
//!
//! ## Error Categories:
//! - **Transport**: Bind failures and socket errors. A bind failure is fatal at startup,
//!   a socket error ends the receive stream (the open call is finalized, nothing crashes).
//! - **Malformed frames**: [`FrameError`]. Recoverable, logged and discarded per datagram.
//!   They never reach the session state, so they have no variant in [`RecorderError`].
//! - **Filesystem / sink**: Directory or file creation and WAV writes. Fatal for the call
//!   attempt that hit them; the session is never left half-open.
//! - **Configuration**: Missing or invalid configuration. Fatal before listening starts.
//!
//! ## Why thiserror:
//! Each variant carries its source error so the full chain shows up in logs,
//! while `anyhow` is only used at the binary boundary in `main.rs`.

use std::io;
use std::path::PathBuf;

/// Errors that can stop an operation of the recorder.
///
/// ## Usage Example:
/// ```rust
/// # use call_recorder::error::RecorderError;
/// let err = RecorderError::Validation("receive port cannot be 0".to_string());
/// assert_eq!(err.to_string(), "Validation error: receive port cannot be 0");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// The UDP receive endpoint could not be opened
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The socket failed after it was bound
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// A recording directory or file could not be created
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The WAV writer rejected an operation
    #[error("Sink error at {}: {source}", path.display())]
    Sink {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// Configuration file or environment variable problems
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration values failed validation rules
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Reasons a received datagram is rejected before it becomes a call record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("datagram too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },
}

/// Shorthand for `Result<T, RecorderError>`.
pub type RecorderResult<T> = Result<T, RecorderError>;
