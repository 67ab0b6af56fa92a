//! RecordReader - offline view of a data file
//!
//! Data files carry no header, so the record count is `len / RECORD_LEN` and
//! the peripheral is taken from the file name when needed.

use std::path::{Path, PathBuf};

use contracts::{PeripheralKind, SensorRecord, RECORD_LEN};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::naming::kind_from_file_name;

#[derive(Debug, Clone)]
pub struct RecordReader {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl RecordReader {
    /// Load a whole data file. A trailing partial record is an error.
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| StorageError::read(path, e))?;
        Self::from_bytes(path, bytes)
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: Vec<u8>) -> Result<Self> {
        let path = path.into();
        let trailing = bytes.len() % RECORD_LEN;
        if trailing != 0 {
            return Err(StorageError::TrailingBytes {
                path,
                records: bytes.len() / RECORD_LEN,
                trailing,
            });
        }
        debug!(path = %path.display(), records = bytes.len() / RECORD_LEN, "data file loaded");
        Ok(Self { path, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len() / RECORD_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<SensorRecord> {
        let start = index.checked_mul(RECORD_LEN)?;
        let end = start.checked_add(RECORD_LEN)?;
        let chunk = self.bytes.get(start..end)?;
        SensorRecord::from_bytes(chunk).ok()
    }

    pub fn records(&self) -> impl Iterator<Item = SensorRecord> + '_ {
        self.bytes
            .chunks_exact(RECORD_LEN)
            .filter_map(|chunk| SensorRecord::from_bytes(chunk).ok())
    }

    /// Peripheral inferred from the file name.
    pub fn kind(&self) -> Option<PeripheralKind> {
        kind_from_file_name(&self.path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::BinaryRecordWriter;
    use contracts::MotionChannels;

    fn record(ts: i64) -> SensorRecord {
        SensorRecord {
            channels: MotionChannels {
                gyro: [ts as f32, 0.0, 0.0],
                ..MotionChannels::default()
            },
            device_timestamp_ms: ts,
            host_timestamp_ms: ts + 3,
        }
    }

    #[test]
    fn test_reads_back_written_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("00042-2024-05-01-12-00-00-ring.data");
        let mut writer = BinaryRecordWriter::open(&path).unwrap();
        for ts in 0..5 {
            writer.append_record(&record(ts * 10)).unwrap();
        }
        writer.close().unwrap();

        let reader = RecordReader::open(&path).unwrap();
        assert_eq!(reader.len(), 5);
        assert_eq!(reader.kind(), Some(PeripheralKind::Ring));
        assert_eq!(reader.get(2), Some(record(20)));
        assert_eq!(reader.get(5), None);

        let timestamps: Vec<i64> = reader.records().map(|r| r.device_timestamp_ms).collect();
        assert_eq!(timestamps, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_trailing_partial_record_rejected() {
        let err = RecordReader::from_bytes("x.data", vec![0u8; RECORD_LEN * 2 + 7]).unwrap_err();
        match err {
            StorageError::TrailingBytes {
                records, trailing, ..
            } => {
                assert_eq!(records, 2);
                assert_eq!(trailing, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_file() {
        let reader = RecordReader::from_bytes("empty.data", Vec::new()).unwrap();
        assert!(reader.is_empty());
        assert_eq!(reader.records().count(), 0);
        assert_eq!(reader.kind(), None);
    }

    #[test]
    fn test_get_far_out_of_range() {
        let reader = RecordReader::from_bytes("x.data", vec![0u8; RECORD_LEN]).unwrap();
        assert!(reader.get(0).is_some());
        assert_eq!(reader.get(usize::MAX / RECORD_LEN), None);
        assert_eq!(reader.get(usize::MAX), None);
    }
}
