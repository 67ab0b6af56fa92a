//! BinaryRecordWriter - append-only record file
//!
//! Each append writes one whole record and flushes it to the OS before
//! returning, so a killed process never leaves a record half-buffered in
//! user space.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use contracts::{SensorRecord, RECORD_LEN};
use tracing::{debug, error, info, instrument};

use crate::error::{Result, StorageError};
use crate::metrics::WriterMetrics;

/// Append-only writer for fixed-size records.
///
/// Exclusively owned by one session. After `close` every `append` fails with
/// [`StorageError::Closed`].
#[derive(Debug)]
pub struct BinaryRecordWriter {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    metrics: Arc<WriterMetrics>,
}

impl BinaryRecordWriter {
    /// Create (or append to) the file at `path`, creating parent directories.
    #[instrument(name = "record_writer_open", skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::open(path, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                error!(error = %e, "cannot create data file");
                StorageError::open(path, e)
            })?;

        info!("data file opened");
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(BufWriter::with_capacity(RECORD_LEN * 16, file)),
            metrics: Arc::new(WriterMetrics::new()),
        })
    }

    /// Write exactly one record and flush it.
    pub fn append(&mut self, record: &[u8]) -> Result<()> {
        if record.len() != RECORD_LEN {
            self.metrics.inc_rejected();
            return Err(StorageError::RecordSize {
                actual: record.len(),
            });
        }

        let Some(file) = self.file.as_mut() else {
            self.metrics.inc_rejected();
            return Err(StorageError::Closed {
                path: self.path.clone(),
            });
        };

        if let Err(e) = file.write_all(record).and_then(|_| file.flush()) {
            self.metrics.inc_write_failure();
            error!(path = %self.path.display(), error = %e, "record append failed");
            return Err(StorageError::write(&self.path, e));
        }

        self.metrics.inc_written(record.len());
        Ok(())
    }

    pub fn append_record(&mut self, record: &SensorRecord) -> Result<()> {
        self.append(&record.to_bytes())
    }

    /// Flush and release the file. Closing twice, or closing a writer whose
    /// file is already gone, is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut file) = self.file.take() else {
            debug!(path = %self.path.display(), "close on closed writer ignored");
            return Ok(());
        };

        file.flush()
            .and_then(|_| file.get_ref().sync_all())
            .map_err(|e| StorageError::write(&self.path, e))?;

        info!(
            path = %self.path.display(),
            records = self.metrics.records_written(),
            "data file closed"
        );
        Ok(())
    }

    /// Move the file to `new_path` and keep appending to it.
    ///
    /// Pending bytes are flushed first; the open handle follows the rename.
    #[instrument(
        name = "record_writer_rename",
        skip_all,
        fields(from = %self.path.display(), to = %new_path.display())
    )]
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

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    pub fn records_written(&self) -> u64 {
        self.metrics.records_written()
    }

    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::MotionChannels;

    fn record(ts: i64) -> SensorRecord {
        SensorRecord {
            channels: MotionChannels::default(),
            device_timestamp_ms: ts,
            host_timestamp_ms: ts + 1,
        }
    }

    #[test]
    fn test_append_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/00001-ring.data");

        let mut writer = BinaryRecordWriter::open(&path).unwrap();
        for ts in 0..10 {
            writer.append_record(&record(ts)).unwrap();
        }
        writer.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 10 * RECORD_LEN);
        assert_eq!(writer.records_written(), 10);
    }

    #[test]
    fn test_each_append_is_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.data");

        let mut writer = BinaryRecordWriter::open(&path).unwrap();
        writer.append_record(&record(1)).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), RECORD_LEN as u64);
        writer.append_record(&record(2)).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * RECORD_LEN as u64);
    }

    #[test]
    fn test_wrong_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sizes.data");
        let mut writer = BinaryRecordWriter::open(&path).unwrap();

        for len in [0, 1, 72, 79, 81, 160] {
            let err = writer.append(&vec![0u8; len]).unwrap_err();
            assert!(matches!(err, StorageError::RecordSize { actual } if actual == len));
        }
        writer.append(&[0u8; RECORD_LEN]).unwrap();
        writer.close().unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), RECORD_LEN as u64);
        assert_eq!(writer.metrics().rejected_records(), 6);
    }

    #[test]
    fn test_close_is_idempotent_and_append_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = BinaryRecordWriter::open(&dir.path().join("c.data")).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(!writer.is_open());

        let err = writer.append_record(&record(0)).unwrap_err();
        assert!(matches!(err, StorageError::Closed { .. }));
    }

    #[test]
    fn test_open_failure_is_loud() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = BinaryRecordWriter::open(&blocker.join("r.data")).unwrap_err();
        assert!(matches!(err, StorageError::Open { .. }));
    }

    #[test]
    fn test_rename_keeps_appending() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("00000-a.data");
        let new = dir.path().join("00042-a.data");

        let mut writer = BinaryRecordWriter::open(&old).unwrap();
        writer.append_record(&record(1)).unwrap();
        writer.rename_to(&new).unwrap();
        writer.append_record(&record(2)).unwrap();
        writer.close().unwrap();

        assert!(!old.exists());
        assert_eq!(std::fs::read(&new).unwrap().len(), 2 * RECORD_LEN);
        assert_eq!(writer.path(), new.as_path());
    }
}
