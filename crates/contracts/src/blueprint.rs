//! RecorderBlueprint - Config Loader output
//!
//! Describes one recording deployment: who is being recorded, where files go,
//! and how each peripheral family is driven.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{ContractError, PeripheralKind};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete recorder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecorderBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Participant identity, used in file names
    pub participant: ParticipantConfig,

    /// Output location
    #[serde(default)]
    pub output: OutputConfig,

    /// Ring peripheral settings
    #[serde(default)]
    pub ring: RingConfig,

    /// Wrist peripheral settings
    #[serde(default)]
    pub wrist: WristConfig,
}

/// Participant identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantConfig {
    /// Study participant id; padded to five digits in file names
    pub id: String,
}

impl ParticipantConfig {
    /// Check an id before it is spliced into a file name: non-empty, ASCII
    /// letters and digits only.
    pub fn validate_id(id: &str) -> Result<(), ContractError> {
        if id.is_empty() {
            return Err(ContractError::config_validation(
                "participant.id",
                "participant id cannot be empty",
            ));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ContractError::config_validation(
                "participant.id",
                format!("participant id must be alphanumeric, got '{id}'"),
            ));
        }
        Ok(())
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory that receives `.data` and `-events.txt` files
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Write a START/END sidecar next to each data file
    #[serde(default = "default_true")]
    pub write_event_log: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            write_event_log: true,
        }
    }
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("./recordings")
}

fn default_true() -> bool {
    true
}

/// Ring peripheral settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// MAC address the platform binding should connect to
    #[serde(default)]
    pub device_address: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Reassembly buffer capacity; a frame reaching it is discarded
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,

    #[serde(default)]
    pub clock: ClockConfig,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            device_address: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            max_frame_len: default_max_frame_len(),
            clock: ClockConfig::default(),
        }
    }
}

/// Wrist peripheral settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WristConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Fused-sample emission rate
    #[serde(default = "default_target_rate_hz")]
    pub target_rate_hz: f64,

    #[serde(default)]
    pub clock: ClockConfig,
}

impl Default for WristConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            connect_timeout_ms: default_connect_timeout_ms(),
            target_rate_hz: default_target_rate_hz(),
            clock: ClockConfig::default(),
        }
    }
}

/// Clock drift diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Nominal spacing between consecutive device timestamps
    #[serde(default = "default_expected_interval_ms")]
    pub expected_interval_ms: i64,

    /// Deltas further than this from the nominal spacing are logged
    #[serde(default = "default_drift_tolerance_ms")]
    pub drift_tolerance_ms: i64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            expected_interval_ms: default_expected_interval_ms(),
            drift_tolerance_ms: default_drift_tolerance_ms(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_max_frame_len() -> usize {
    256
}

fn default_target_rate_hz() -> f64 {
    100.0
}

fn default_expected_interval_ms() -> i64 {
    10
}

fn default_drift_tolerance_ms() -> i64 {
    5
}

impl RecorderBlueprint {
    /// Minimal blueprint with defaults for everything but the participant.
    pub fn for_participant(id: impl Into<String>) -> Self {
        Self {
            version: ConfigVersion::V1,
            participant: ParticipantConfig { id: id.into() },
            output: OutputConfig::default(),
            ring: RingConfig::default(),
            wrist: WristConfig::default(),
        }
    }

    pub fn is_enabled(&self, kind: PeripheralKind) -> bool {
        match kind {
            PeripheralKind::Ring => self.ring.enabled,
            PeripheralKind::Wrist => self.wrist.enabled,
        }
    }

    pub fn connect_timeout(&self, kind: PeripheralKind) -> Duration {
        let ms = match kind {
            PeripheralKind::Ring => self.ring.connect_timeout_ms,
            PeripheralKind::Wrist => self.wrist.connect_timeout_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn clock(&self, kind: PeripheralKind) -> ClockConfig {
        match kind {
            PeripheralKind::Ring => self.ring.clock,
            PeripheralKind::Wrist => self.wrist.clock,
        }
    }

    /// Enabled peripherals, in stable order
    pub fn enabled_peripherals(&self) -> Vec<PeripheralKind> {
        PeripheralKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let bp: RecorderBlueprint =
            serde_json::from_str(r#"{ "participant": { "id": "7" } }"#).unwrap();
        assert_eq!(bp.ring.max_frame_len, 256);
        assert_eq!(bp.ring.connect_timeout_ms, 5_000);
        assert_eq!(bp.wrist.target_rate_hz, 100.0);
        assert_eq!(bp.wrist.clock.expected_interval_ms, 10);
        assert!(bp.output.write_event_log);
        assert_eq!(
            bp.enabled_peripherals(),
            vec![PeripheralKind::Ring, PeripheralKind::Wrist]
        );
    }

    #[test]
    fn test_participant_id_rules() {
        assert!(ParticipantConfig::validate_id("42").is_ok());
        assert!(ParticipantConfig::validate_id("P07a").is_ok());
        for bad in ["", "../x", "a/b", "4 2", "a\\b", "ü1"] {
            let err = ParticipantConfig::validate_id(bad).unwrap_err();
            assert!(err.to_string().contains("participant.id"), "{bad}: {err}");
        }
    }

    #[test]
    fn test_connect_timeout_per_kind() {
        let mut bp = RecorderBlueprint::for_participant("1");
        bp.wrist.connect_timeout_ms = 250;
        assert_eq!(
            bp.connect_timeout(PeripheralKind::Ring),
            Duration::from_secs(5)
        );
        assert_eq!(
            bp.connect_timeout(PeripheralKind::Wrist),
            Duration::from_millis(250)
        );
    }
}
