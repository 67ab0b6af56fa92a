//! # Config Loader
//!
//! Builds the `RecorderBlueprint` a recorder runs with.
//!
//! Sources, in order of precedence:
//! 1. Command-line overrides (`ConfigOverrides`)
//! 2. The config file (`.toml` preferred, `.json` accepted)
//! 3. Field defaults from `contracts`
//!
//! Validation runs once, on the final merged blueprint, so an override can
//! repair a file value and can never slip past the participant id rules.
//!
//! # Example
//!
//! ```no_run
//! use config_loader::{ConfigLoader, ConfigOverrides};
//! use contracts::PeripheralKind;
//! use std::path::Path;
//!
//! let overrides = ConfigOverrides::default()
//!     .participant("17")
//!     .only(PeripheralKind::Ring);
//! let blueprint =
//!     ConfigLoader::load_with_overrides(Path::new("recorder.toml"), &overrides).unwrap();
//! assert!(!blueprint.wrist.enabled);
//! ```

mod parser;
mod validator;

pub use contracts::RecorderBlueprint;
pub use parser::ConfigFormat;

use std::path::{Path, PathBuf};

use contracts::{ContractError, PeripheralKind};

/// Values that replace what the config file says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub output_directory: Option<PathBuf>,
    pub participant_id: Option<String>,
    /// Record from this peripheral alone, enabling it if the file does not
    pub only: Option<PeripheralKind>,
}

impl ConfigOverrides {
    pub fn output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = Some(dir.into());
        self
    }

    pub fn participant(mut self, id: impl Into<String>) -> Self {
        self.participant_id = Some(id.into());
        self
    }

    pub fn only(mut self, kind: PeripheralKind) -> Self {
        self.only = Some(kind);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the overrides into `blueprint`. Does not validate.
    pub fn apply(&self, blueprint: &mut RecorderBlueprint) {
        if let Some(dir) = &self.output_directory {
            blueprint.output.directory = dir.clone();
        }
        if let Some(id) = &self.participant_id {
            blueprint.participant.id = id.clone();
        }
        if let Some(kind) = self.only {
            blueprint.ring.enabled = kind == PeripheralKind::Ring;
            blueprint.wrist.enabled = kind == PeripheralKind::Wrist;
        }
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a config file; format follows the extension.
    pub fn load_from_path(path: &Path) -> Result<RecorderBlueprint, ContractError> {
        Self::load_with_overrides(path, &ConfigOverrides::default())
    }

    /// Load a config file, apply `overrides`, then validate the result.
    pub fn load_with_overrides(
        path: &Path,
        overrides: &ConfigOverrides,
    ) -> Result<RecorderBlueprint, ContractError> {
        let format = detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        let mut blueprint = parser::parse(&content, format)?;
        overrides.apply(&mut blueprint);
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<RecorderBlueprint, ContractError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &RecorderBlueprint) -> Result<String, ContractError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    pub fn to_json(blueprint: &RecorderBlueprint) -> Result<String, ContractError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ContractError::config_parse("cannot determine file format from extension"))?;

    ConfigFormat::from_extension(ext)
        .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
}
