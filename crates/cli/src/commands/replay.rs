//! `replay` command implementation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::{ConfigLoader, ConfigOverrides};
use contracts::{Clock, ManualClock, PeripheralKind, SessionSignal, SignalEvent, SystemClock};
use observability::SessionMetricsAggregator;
use session::Recorder;
use storage::{naming::kind_from_file_name, padded_participant_id, RecordReader};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::ReplayArgs;
use crate::error::CliError;
use crate::replay::{ring_script, wrist_script, ReplayStep, ReplayTransport};

/// Execute the `replay` command
pub async fn run_replay(args: &ReplayArgs) -> Result<()> {
    let kind = PeripheralKind::from(args.peripheral);
    info!(config = %args.config.display(), capture = %args.capture.display(), peripheral = %kind, "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut overrides = ConfigOverrides::default().only(kind);
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding output directory from CLI");
        overrides = overrides.output_directory(output);
    }
    if let Some(ref participant) = args.participant {
        info!(participant = %participant, "Overriding participant id from CLI");
        overrides = overrides.participant(participant);
    }
    let blueprint = ConfigLoader::load_with_overrides(&args.config, &overrides)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let script = load_script(kind, args)?;
    if script.is_empty() {
        return Err(CliError::EmptyCapture {
            path: args.capture.clone(),
        }
        .into());
    }
    info!(steps = script.len(), "Capture loaded");

    let output_dir = blueprint.output.directory.clone();
    let participant = blueprint.participant.id.clone();

    let clock = ManualClock::new(SystemClock.now_millis());
    let transport_clock = clock.clone();
    let mut recorder = Recorder::builder(blueprint)
        .clock(clock)
        .peripheral(kind, move |listener| {
            ReplayTransport::new(listener, transport_clock, script)
        })
        .build()
        .context("Failed to build recorder")?;
    let mut signals = recorder
        .take_signals()
        .context("Recorder signal stream unavailable")?;

    recorder
        .start_session(kind)
        .await
        .with_context(|| format!("Failed to start {kind} session"))?;

    let outcome = if args.timeout == 0 {
        wait_for_stop(&mut signals).await
    } else {
        tokio::time::timeout(Duration::from_secs(args.timeout), wait_for_stop(&mut signals))
            .await
            .unwrap_or(Err(CliError::Timeout {
                seconds: args.timeout,
            }))
    };

    if outcome.is_err() {
        if let Err(e) = recorder.stop_session(kind).await {
            warn!(error = %e, "Failed to stop session");
        }
    }
    recorder.shutdown().await;
    outcome?;

    match latest_data_file(&output_dir, &participant, kind)? {
        Some(path) => print_replay_summary(&path)?,
        None => warn!(directory = %output_dir.display(), "No data file found after replay"),
    }
    Ok(())
}

fn load_script(kind: PeripheralKind, args: &ReplayArgs) -> Result<Vec<ReplayStep>> {
    let script = match kind {
        PeripheralKind::Ring => {
            let capture = std::fs::read(&args.capture)
                .with_context(|| format!("Failed to read {}", args.capture.display()))?;
            ring_script(&capture, args.chunk_size, args.chunk_interval_ms)
        }
        PeripheralKind::Wrist => {
            let text = std::fs::read_to_string(&args.capture)
                .with_context(|| format!("Failed to read {}", args.capture.display()))?;
            wrist_script(&args.capture, &text)?
        }
    };
    Ok(script)
}

/// Wait for the session to finish; any failure signal ends the wait early.
async fn wait_for_stop(
    signals: &mut mpsc::UnboundedReceiver<SignalEvent>,
) -> std::result::Result<(), CliError> {
    while let Some(SignalEvent { peripheral, signal }) = signals.recv().await {
        match signal {
            SessionSignal::Connected => info!(%peripheral, "Replay connected"),
            SessionSignal::RecordingStopped => {
                info!(%peripheral, "Recording stopped");
                return Ok(());
            }
            SessionSignal::ConnectFailed => return Err(CliError::ConnectFailed { peripheral }),
            SessionSignal::UnexpectedDisconnect { reason } => {
                return Err(CliError::UnexpectedDisconnect { peripheral, reason })
            }
            SessionSignal::StorageFailed { message } => {
                return Err(CliError::StorageFailed {
                    peripheral,
                    message,
                })
            }
        }
    }
    Ok(())
}

/// Newest data file for this participant and peripheral. File names embed
/// the start time, so the lexicographic maximum is the latest session.
fn latest_data_file(
    directory: &Path,
    participant_id: &str,
    kind: PeripheralKind,
) -> Result<Option<PathBuf>> {
    let prefix = format!("{}-", padded_participant_id(participant_id));
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("Failed to list {}", directory.display()))?;

    let mut latest: Option<PathBuf> = None;
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let is_match = name.starts_with(&prefix)
            && path.extension().is_some_and(|e| e == storage::naming::DATA_EXTENSION)
            && kind_from_file_name(&path) == Some(kind);
        if is_match && latest.as_ref().map_or(true, |l| path > *l) {
            latest = Some(path);
        }
    }
    Ok(latest)
}

fn print_replay_summary(path: &Path) -> Result<()> {
    let reader = RecordReader::open(path)
        .with_context(|| format!("Failed to read back {}", path.display()))?;

    let mut aggregator = SessionMetricsAggregator::new();
    if let Some(kind) = reader.kind() {
        for record in reader.records() {
            aggregator.observe_record(kind, record.device_timestamp_ms, record.skew_ms());
        }
    }

    println!("\nReplay written to {}", path.display());
    print!("{}", aggregator.summary());
    Ok(())
}
