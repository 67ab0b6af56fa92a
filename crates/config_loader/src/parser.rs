//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, RecorderBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<RecorderBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<RecorderBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<RecorderBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[participant]
id = "42"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.participant.id, "42");
        assert_eq!(bp.ring.max_frame_len, 256);
    }

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
[participant]
id = "1234"

[output]
directory = "/tmp/recordings"
write_event_log = false

[ring]
device_address = "DF:1A:E1:6B:31:36"
connect_timeout_ms = 3000

[ring.clock]
expected_interval_ms = 10
drift_tolerance_ms = 2

[wrist]
enabled = false
target_rate_hz = 50.0
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.ring.device_address.as_deref(), Some("DF:1A:E1:6B:31:36"));
        assert_eq!(bp.ring.connect_timeout_ms, 3000);
        assert_eq!(bp.ring.clock.drift_tolerance_ms, 2);
        assert!(!bp.wrist.enabled);
        assert_eq!(bp.wrist.target_rate_hz, 50.0);
        assert!(!bp.output.write_event_log);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "participant": { "id": "9" },
            "wrist": { "target_rate_hz": 25.0 }
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        assert_eq!(result.unwrap().wrist.target_rate_hz, 25.0);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_missing_participant_is_parse_error() {
        let result = parse_toml("[ring]\nenabled = true\n");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
