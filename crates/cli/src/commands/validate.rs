//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{PeripheralKind, RecorderBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    participant: String,
    output_directory: String,
    peripherals: Vec<PeripheralKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ring_connect_timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wrist_target_rate_hz: Option<f64>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    participant: blueprint.participant.id.clone(),
                    output_directory: blueprint.output.directory.display().to_string(),
                    peripherals: blueprint.enabled_peripherals(),
                    ring_connect_timeout_ms: blueprint
                        .ring
                        .enabled
                        .then_some(blueprint.ring.connect_timeout_ms),
                    wrist_target_rate_hz: blueprint
                        .wrist
                        .enabled
                        .then_some(blueprint.wrist.target_rate_hz),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RecorderBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.ring.enabled && blueprint.ring.device_address.is_none() {
        warnings.push("ring.device_address is not set - the binding must discover the ring".to_string());
    }

    if !blueprint.output.write_event_log {
        warnings.push("output.write_event_log is off - no START/END sidecar will be written".to_string());
    }

    if !blueprint.output.directory.exists() {
        warnings.push(format!(
            "Output directory {} does not exist yet - it will be created on first session",
            blueprint.output.directory.display()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Participant: {}", summary.participant);
            println!("  Output: {}", summary.output_directory);
            let peripherals: Vec<String> =
                summary.peripherals.iter().map(|k| k.to_string()).collect();
            println!("  Peripherals: {}", peripherals.join(", "));
            if let Some(timeout) = summary.ring_connect_timeout_ms {
                println!("  Ring connect timeout: {} ms", timeout);
            }
            if let Some(rate) = summary.wrist_target_rate_hz {
                println!("  Wrist rate: {} Hz", rate);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_for_defaults() {
        let mut blueprint = RecorderBlueprint::for_participant("42");
        blueprint.output.directory = std::env::temp_dir();
        let warnings = collect_warnings(&blueprint);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("device_address"));
    }

    #[test]
    fn test_validate_missing_file() {
        let args = ValidateArgs {
            config: "does/not/exist.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_good_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recorder.toml");
        std::fs::write(&path, "[participant]\nid = \"42\"\n\n[wrist]\nenabled = false\n").unwrap();

        let result = validate_config(&ValidateArgs {
            config: path,
            json: false,
        });
        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!(summary.peripherals, vec![PeripheralKind::Ring]);
        assert!(summary.wrist_target_rate_hz.is_none());
    }
}
