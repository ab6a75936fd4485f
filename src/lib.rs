//! # Call Recorder
//!
//! Segments a continuous stream of fixed-size UDP voice datagrams into one WAV
//! recording per call.
//!
//! ## Application Architecture:
//! - **packet**: UDP socket, frame validation and parsing (Packet Ingestor)
//! - **recorder**: Event loop serializing frames, inactivity and shutdown
//! - **audio**: Session state machine, recording layout and WAV sinks
//! - **config**: Configuration file + environment variables
//! - **error**: Error types shared by every module

pub mod audio;
pub mod config;
pub mod error;
pub mod packet;
pub mod recorder;
