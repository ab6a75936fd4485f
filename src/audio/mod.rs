//! # Audio Recording Module
//!
//! Everything between a parsed frame and a finished recording on disk.
//!
//! ## Key Components:
//! - **Session Manager**: Idle/Recording state machine for the single active call
//! - **Layout**: Deterministic `logs/<date>/<time>/<destination>/<source>_<sequence>` naming
//! - **Sinks**: The writer abstraction and the WAV implementation
//!
//! ## Audio Format Requirements:
//! - **Sample Rate**: 8kHz (8,000 Hz)
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Encoding**: Little-endian signed integers

pub mod layout;       // Recording paths and bucket directories
pub mod session;      // Call session state management
pub mod sink;         // Output sinks (WAV via hound)
