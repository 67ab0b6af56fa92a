//! Session file naming
//!
//! `<participant>-<yyyy-MM-dd-HH-mm-ss>-<ring|watch>.data`, with the
//! participant id left-padded with zeros to five characters. Downstream
//! tooling parses these names, so the format is fixed.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use contracts::PeripheralKind;

pub const PARTICIPANT_ID_WIDTH: usize = 5;

const STARTED_AT_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub const DATA_EXTENSION: &str = "data";

const EVENTS_SUFFIX: &str = "-events.txt";

pub fn padded_participant_id(id: &str) -> String {
    format!("{id:0>width$}", width = PARTICIPANT_ID_WIDTH)
}

/// `<participant>-<started>-<suffix>`, shared by the data file and its
/// event log.
pub fn session_prefix(
    participant_id: &str,
    kind: PeripheralKind,
    started_at: &DateTime<Local>,
) -> String {
    format!(
        "{}-{}-{}",
        padded_participant_id(participant_id),
        started_at.format(STARTED_AT_FORMAT),
        kind.file_suffix()
    )
}

/// Paths for one session's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub data: PathBuf,
    pub events: PathBuf,
}

impl SessionPaths {
    pub fn new(
        directory: &Path,
        participant_id: &str,
        kind: PeripheralKind,
        started_at: &DateTime<Local>,
    ) -> Self {
        Self::from_prefix(directory, &session_prefix(participant_id, kind, started_at))
    }

    pub fn from_prefix(directory: &Path, prefix: &str) -> Self {
        Self {
            data: directory.join(format!("{prefix}.{DATA_EXTENSION}")),
            events: directory.join(format!("{prefix}{EVENTS_SUFFIX}")),
        }
    }
}

/// Infer the peripheral from a data file name.
pub fn kind_from_file_name(path: &Path) -> Option<PeripheralKind> {
    let stem = path.file_stem()?.to_str()?;
    PeripheralKind::ALL
        .into_iter()
        .find(|kind| stem.ends_with(&format!("-{}", kind.file_suffix())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_padding() {
        assert_eq!(padded_participant_id("42"), "00042");
        assert_eq!(padded_participant_id("12345"), "12345");
        assert_eq!(padded_participant_id("1234567"), "1234567");
    }

    #[test]
    fn test_session_paths() {
        let paths = SessionPaths::new(Path::new("/rec"), "42", PeripheralKind::Ring, &started());
        assert_eq!(
            paths.data,
            PathBuf::from("/rec/00042-2024-05-01-12-00-00-ring.data")
        );
        assert_eq!(
            paths.events,
            PathBuf::from("/rec/00042-2024-05-01-12-00-00-ring-events.txt")
        );

        let wrist = SessionPaths::new(Path::new("/rec"), "7", PeripheralKind::Wrist, &started());
        assert_eq!(
            wrist.data,
            PathBuf::from("/rec/00007-2024-05-01-12-00-00-watch.data")
        );
    }

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(
            kind_from_file_name(Path::new("00042-2024-05-01-12-00-00-ring.data")),
            Some(PeripheralKind::Ring)
        );
        assert_eq!(
            kind_from_file_name(Path::new("x/00042-2024-05-01-12-00-00-watch.data")),
            Some(PeripheralKind::Wrist)
        );
        assert_eq!(kind_from_file_name(Path::new("capture.bin")), None);
    }
}
