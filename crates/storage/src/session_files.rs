//! SessionFiles - the data file and event log of one recording session

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use contracts::{PeripheralKind, SensorRecord};
use tracing::{error, info, instrument, warn};

use crate::error::Result;
use crate::event_log::EventLog;
use crate::metrics::WriterMetrics;
use crate::naming::{session_prefix, SessionPaths};
use crate::writer::BinaryRecordWriter;

/// Where and how a session's files are created.
#[derive(Debug, Clone)]
pub struct SessionFilesConfig {
    pub directory: PathBuf,
    pub participant_id: String,
    pub write_event_log: bool,
}

#[derive(Debug)]
pub struct SessionFiles {
    kind: PeripheralKind,
    directory: PathBuf,
    started_at: DateTime<Local>,
    paths: SessionPaths,
    writer: BinaryRecordWriter,
    events: Option<EventLog>,
}

impl SessionFiles {
    #[instrument(name = "session_files_create", skip(config, started_at), fields(peripheral = %kind))]
    pub fn create(
        config: &SessionFilesConfig,
        kind: PeripheralKind,
        started_at: DateTime<Local>,
    ) -> Result<Self> {
        let paths = SessionPaths::new(
            &config.directory,
            &config.participant_id,
            kind,
            &started_at,
        );

        let writer = BinaryRecordWriter::open(&paths.data)?;
        let events = if config.write_event_log {
            let mut log = EventLog::open(&paths.events)?;
            log.start(started_at)?;
            Some(log)
        } else {
            None
        };

        info!(path = %paths.data.display(), "session files created");
        Ok(Self {
            kind,
            directory: config.directory.clone(),
            started_at,
            paths,
            writer,
            events,
        })
    }

    pub fn append(&mut self, record: &SensorRecord) -> Result<()> {
        self.writer.append_record(record)
    }

    /// Close the data file and write the END line. Safe to call repeatedly.
    pub fn finish(&mut self, ended_at: DateTime<Local>) -> Result<()> {
        let closed = self.writer.close();
        if let Some(events) = self.events.as_mut() {
            if let Err(e) = events.end(ended_at) {
                warn!(error = %e, "failed to finalize event log");
            }
        }
        closed
    }

    /// Re-label the session under a corrected participant id.
    ///
    /// Both files are renamed in place; recording continues into the renamed
    /// data file. If the event log cannot follow, the data file is moved back
    /// so the pair keeps a common prefix. `paths()` always reflects what is
    /// on disk.
    #[instrument(name = "session_files_rename", skip(self), fields(peripheral = %self.kind))]
    pub fn rename_participant(&mut self, participant_id: &str) -> Result<()> {
        let prefix = session_prefix(participant_id, self.kind, &self.started_at);
        let target = SessionPaths::from_prefix(&self.directory, &prefix);
        if target == self.paths {
            return Ok(());
        }

        self.writer.rename_to(&target.data)?;
        if let Some(events) = self.events.as_mut() {
            if let Err(e) = events.rename_to(&target.events) {
                if let Err(rollback) = self.writer.rename_to(&self.paths.data) {
                    error!(error = %rollback, "data file left under the new name");
                }
                self.paths.data = self.writer.path().to_path_buf();
                return Err(e);
            }
        }

        info!(path = %target.data.display(), "session files renamed");
        self.paths = target;
        Ok(())
    }

    pub fn kind(&self) -> PeripheralKind {
        self.kind
    }

    pub fn data_path(&self) -> &Path {
        &self.paths.data
    }

    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_open()
    }

    pub fn records_written(&self) -> u64 {
        self.writer.records_written()
    }

    pub fn writer_metrics(&self) -> &Arc<WriterMetrics> {
        self.writer.metrics()
    }
}
