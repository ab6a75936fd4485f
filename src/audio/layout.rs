//! # Recording Layout
//!
//! Decides where each call is written:
//!
//! ```text
//! <log_path>/logs/<YYYYMMDD>/<HHMM>/<destination_id>/<source_id>_<sequence>.<ext>
//! ```
//!
//! The name is a pure function of the call start time, both identifiers and the
//! sequence counter. Because the counter never repeats within a process, two calls
//! from the same source in the same minute still get distinct files.

use crate::error::{RecorderError, RecorderResult};
use chrono::{DateTime, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory created under the configured log path.
pub const LOGS_DIR: &str = "logs";

/// Maps a call's start time and identifiers to its place under the log path.
#[derive(Debug, Clone)]
pub struct RecordingLayout {
    root: PathBuf, // the configured `log_path`
}

impl RecordingLayout {
    pub fn new(log_path: impl Into<PathBuf>) -> Self {
        Self {
            root: log_path.into(),
        }
    }

    /// Full path of the recording for a call that starts at `started_at`.
    pub fn call_path<Tz: TimeZone>(
        &self,
        started_at: &DateTime<Tz>,
        destination_id: u32,
        source_id: u32,
        sequence: u64,
        extension: &str,
    ) -> PathBuf
    where
        Tz::Offset: std::fmt::Display,
    {
        self.root
            .join(LOGS_DIR)
            .join(started_at.format("%Y%m%d").to_string())
            .join(started_at.format("%H%M").to_string())
            .join(destination_id.to_string())
            .join(format!("{}_{}.{}", source_id, sequence, extension))
    }

    /// Create every missing bucket directory above `path`.
    ///
    /// Existing directories are not an error, so concurrent or repeated calls into
    /// the same minute bucket are fine.
    pub fn prepare(&self, path: &Path) -> RecorderResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| RecorderError::Filesystem {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, NaiveDate, Utc};

    #[test]
    fn test_call_path_buckets() {
        let layout = RecordingLayout::new("/data");
        let started_at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 59).unwrap();

        let path = layout.call_path(&started_at, 200, 100, 1, "wav");
        assert_eq!(path, PathBuf::from("/data/logs/20240307/0905/200/100_1.wav"));
    }

    #[test]
    fn test_sequence_distinguishes_same_minute() {
        let layout = RecordingLayout::new("/data");
        let naive = NaiveDate::from_ymd_opt(2024, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let started_at = Local.from_local_datetime(&naive).earliest().unwrap();

        let first = layout.call_path(&started_at, 9, 5, 1, "wav");
        let second = layout.call_path(&started_at, 9, 5, 2, "wav");
        assert_ne!(first, second);
        assert_eq!(first.parent(), second.parent());
        assert!(first.ends_with("logs/20241231/2359/9/5_1.wav"));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RecordingLayout::new(dir.path());
        let started_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let path = layout.call_path(&started_at, 1, 2, 3, "wav");

        layout.prepare(&path).unwrap();
        layout.prepare(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());
    }

    #[test]
    fn test_prepare_reports_filesystem_errors() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        fs::write(&blocker, b"not a directory").unwrap();

        let layout = RecordingLayout::new(dir.path());
        let started_at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let path = layout.call_path(&started_at, 1, 2, 3, "wav");

        assert!(matches!(
            layout.prepare(&path),
            Err(RecorderError::Filesystem { .. })
        ));
    }
}
