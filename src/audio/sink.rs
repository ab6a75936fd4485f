//! # Recording Sinks
//!
//! The session manager writes call audio through the [`CallSink`] trait and opens
//! sinks through a [`SinkFactory`]. Production recordings use [`WavSinkFactory`],
//! which serializes the payload as a playable WAV file with `hound`.
//!
//! ## Audio Format:
//! - **Sample Rate**: 8kHz (8,000 Hz)
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Encoding**: Little-endian signed integers

use crate::error::{RecorderError, RecorderResult};
use byteorder::{LittleEndian, ReadBytesExt};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

pub const SAMPLE_RATE: u32 = 8000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

/// An open recording.
///
/// `close` takes the sink by value: once a call has been closed there is no handle
/// left to write through.
pub trait CallSink: Send {
    /// Append raw little-endian 16-bit PCM bytes.
    fn append(&mut self, pcm: &[u8]) -> RecorderResult<()>;

    /// Make everything appended so far durable and readable.
    fn flush(&mut self) -> RecorderResult<()>;

    /// Flush and release the recording.
    fn close(self: Box<Self>) -> RecorderResult<()>;
}

/// Opens sinks at paths chosen by the session manager.
pub trait SinkFactory: Send {
    /// File extension of the recordings this factory produces, without the dot.
    fn extension(&self) -> &str;

    /// Create the recording file at `path`. Parent directories already exist.
    fn open(&mut self, path: &Path) -> RecorderResult<Box<dyn CallSink>>;
}

/// Produces 8kHz mono 16-bit WAV recordings.
#[derive(Debug, Default, Clone)]
pub struct WavSinkFactory;

impl WavSinkFactory {
    pub fn spec() -> WavSpec {
        WavSpec {
            channels: CHANNELS,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        }
    }
}

impl SinkFactory for WavSinkFactory {
    fn extension(&self) -> &str {
        "wav"
    }

    fn open(&mut self, path: &Path) -> RecorderResult<Box<dyn CallSink>> {
        let writer = WavWriter::create(path, Self::spec()).map_err(|source| RecorderError::Sink {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Box::new(WavSink {
            path: path.to_path_buf(),
            writer,
        }))
    }
}

/// A WAV file being written by `hound`.
pub struct WavSink {
    path: PathBuf,
    writer: WavWriter<BufWriter<File>>,
}

impl WavSink {
    fn sink_error(&self, source: hound::Error) -> RecorderError {
        RecorderError::Sink {
            path: self.path.clone(),
            source,
        }
    }
}

impl CallSink for WavSink {
    fn append(&mut self, pcm: &[u8]) -> RecorderResult<()> {
        // A trailing odd byte cannot form a sample and is dropped by the reader loop.
        let mut cursor = Cursor::new(pcm);
        while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
            self.writer
                .write_sample(sample)
                .map_err(|e| self.sink_error(e))?;
        }
        Ok(())
    }

    fn flush(&mut self) -> RecorderResult<()> {
        // hound rewrites the header lengths on flush, so the file stays playable.
        self.writer.flush().map_err(|e| self.sink_error(e))
    }

    fn close(self: Box<Self>) -> RecorderResult<()> {
        let WavSink { path, writer } = *self;
        writer
            .finalize()
            .map_err(|source| RecorderError::Sink { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_wav_round_trip_preserves_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("call.wav");
        let first = pcm_bytes(&[0, 1000, -1000, i16::MAX]);
        let second = pcm_bytes(&[i16::MIN, 42]);

        let mut factory = WavSinkFactory;
        let mut sink = factory.open(&path).unwrap();
        sink.append(&first).unwrap();
        sink.flush().unwrap();
        sink.append(&second).unwrap();
        sink.flush().unwrap();
        sink.close().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec(), WavSinkFactory::spec());
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        let mut expected = first.clone();
        expected.extend_from_slice(&second);
        assert_eq!(pcm_bytes(&samples), expected);
    }

    #[test]
    fn test_flushed_file_is_readable_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.wav");

        let mut factory = WavSinkFactory;
        let mut sink = factory.open(&path).unwrap();
        sink.append(&pcm_bytes(&[5; 160])).unwrap();
        sink.flush().unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 160);

        sink.close().unwrap();
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("call.wav");

        let mut factory = WavSinkFactory;
        assert!(matches!(factory.open(&path), Err(RecorderError::Sink { .. })));
    }
}

/// In-memory sinks for exercising the session logic without WAV files.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex, MutexGuard};

    /// Everything the sinks of one factory have seen.
    #[derive(Debug, Default)]
    pub struct SinkLog {
        pub opened: Vec<PathBuf>,
        pub appended: Vec<(PathBuf, Vec<u8>)>,
        pub flushes: usize,
        pub closed: Vec<PathBuf>,
    }

    impl SinkLog {
        /// All bytes appended to the recording at `path`, in order.
        pub fn recorded(&self, path: &Path) -> Vec<u8> {
            self.appended
                .iter()
                .filter(|(p, _)| p == path)
                .flat_map(|(_, bytes)| bytes.iter().copied())
                .collect()
        }
    }

    #[derive(Debug, Default, Clone)]
    pub struct MemorySinkFactory {
        log: Arc<Mutex<SinkLog>>,
        pub fail_open: bool,
        pub fail_append: bool,
    }

    impl MemorySinkFactory {
        pub fn log(&self) -> MutexGuard<'_, SinkLog> {
            self.log.lock().unwrap()
        }
    }

    impl SinkFactory for MemorySinkFactory {
        fn extension(&self) -> &str {
            "wav"
        }

        fn open(&mut self, path: &Path) -> RecorderResult<Box<dyn CallSink>> {
            if self.fail_open {
                return Err(RecorderError::Filesystem {
                    path: path.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
                });
            }
            self.log().opened.push(path.to_path_buf());
            Ok(Box::new(MemorySink {
                path: path.to_path_buf(),
                log: Arc::clone(&self.log),
                fail_append: self.fail_append,
            }))
        }
    }

    struct MemorySink {
        path: PathBuf,
        log: Arc<Mutex<SinkLog>>,
        fail_append: bool,
    }

    impl CallSink for MemorySink {
        fn append(&mut self, pcm: &[u8]) -> RecorderResult<()> {
            if self.fail_append {
                return Err(RecorderError::Sink {
                    path: self.path.clone(),
                    source: hound::Error::IoError(io::Error::new(io::ErrorKind::Other, "disk full")),
                });
            }
            let mut log = self.log.lock().unwrap();
            log.appended.push((self.path.clone(), pcm.to_vec()));
            Ok(())
        }

        fn flush(&mut self) -> RecorderResult<()> {
            self.log.lock().unwrap().flushes += 1;
            Ok(())
        }

        fn close(self: Box<Self>) -> RecorderResult<()> {
            self.log.lock().unwrap().closed.push(self.path.clone());
            Ok(())
        }
    }
}
