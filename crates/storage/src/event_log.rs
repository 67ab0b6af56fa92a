//! Session event log sidecar
//!
//! A small text file next to each data file recording when the session
//! started and ended, in local wall-clock time:
//!
//! ```text
//! START 2024-05-01T12:00:00.125
//! END 2024-05-01T12:30:04.871
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::debug;

use crate::error::{Result, StorageError};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    file: Option<BufWriter<File>>,
}

impl EventLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::open(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(BufWriter::new(file)),
        })
    }

    pub fn start(&mut self, at: DateTime<Local>) -> Result<()> {
        self.write_line("START", at)
    }

    /// Write the END line and close. Later calls are no-ops.
    pub fn end(&mut self, at: DateTime<Local>) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        self.write_line("END", at)?;
        self.file = None;
        Ok(())
    }

    pub fn rename_to(&mut self, new_path: &Path) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush().map_err(|e| StorageError::write(&self.path, e))?;
        }
        fs::rename(&self.path, new_path).map_err(|source| StorageError::Rename {
            from: self.path.clone(),
            to: new_path.to_path_buf(),
            source,
        })?;
        self.path = new_path.to_path_buf();
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, tag: &str, at: DateTime<Local>) -> Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(StorageError::Closed {
                path: self.path.clone(),
            });
        };
        let stamp = at.format(TIMESTAMP_FORMAT);
        writeln!(file, "{tag} {stamp}")
            .and_then(|_| file.flush())
            .map_err(|e| StorageError::write(&self.path, e))?;
        debug!(path = %self.path.display(), tag, "event logged");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_start_end_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00042-2024-05-01-12-00-00-watch-events.txt");
        let start = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let end = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 4).unwrap();

        let mut log = EventLog::open(&path).unwrap();
        log.start(start).unwrap();
        log.end(end).unwrap();
        log.end(end).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "START 2024-05-01T12:00:00.000\nEND 2024-05-01T12:30:04.000\n"
        );
    }

    #[test]
    fn test_start_after_end_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = EventLog::open(&dir.path().join("e.txt")).unwrap();
        log.end(Local::now()).unwrap();
        assert!(matches!(
            log.start(Local::now()),
            Err(StorageError::Closed { .. })
        ));
    }
}
