//! 配置校验模块
//!
//! 校验规则：
//! - participant.id 非空且仅含字母数字
//! - 至少启用一个外设
//! - connect_timeout_ms > 0
//! - ring.max_frame_len 在 4..=256 之间
//! - wrist.target_rate_hz > 0
//! - drift_tolerance_ms >= 0, expected_interval_ms > 0

use contracts::{ClockConfig, ContractError, ParticipantConfig, RecorderBlueprint};

const MIN_FRAME_LEN: usize = 4;
// Longer frames would need COBS 0xFF code blocks, which the ring never emits
const MAX_FRAME_LEN: usize = 256;

/// 校验 RecorderBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    validate_participant(blueprint)?;
    validate_peripherals_enabled(blueprint)?;
    validate_ring(blueprint)?;
    validate_wrist(blueprint)?;
    Ok(())
}

/// 校验参与者 ID（规则与会话重命名共用）
fn validate_participant(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    ParticipantConfig::validate_id(&blueprint.participant.id)
}

/// 至少启用一个外设
fn validate_peripherals_enabled(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    if blueprint.enabled_peripherals().is_empty() {
        return Err(ContractError::config_validation(
            "ring.enabled / wrist.enabled",
            "at least one peripheral must be enabled",
        ));
    }
    Ok(())
}

/// 校验戒指配置
fn validate_ring(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let ring = &blueprint.ring;

    if ring.connect_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "ring.connect_timeout_ms",
            "connect_timeout_ms must be > 0",
        ));
    }

    if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&ring.max_frame_len) {
        return Err(ContractError::config_validation(
            "ring.max_frame_len",
            format!(
                "max_frame_len must be within {MIN_FRAME_LEN}..={MAX_FRAME_LEN}, got {}",
                ring.max_frame_len
            ),
        ));
    }

    validate_clock("ring.clock", &ring.clock)
}

/// 校验手表配置
fn validate_wrist(blueprint: &RecorderBlueprint) -> Result<(), ContractError> {
    let wrist = &blueprint.wrist;

    if wrist.connect_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "wrist.connect_timeout_ms",
            "connect_timeout_ms must be > 0",
        ));
    }

    if !(wrist.target_rate_hz.is_finite() && wrist.target_rate_hz > 0.0) {
        return Err(ContractError::config_validation(
            "wrist.target_rate_hz",
            format!("target_rate_hz must be > 0, got {}", wrist.target_rate_hz),
        ));
    }

    validate_clock("wrist.clock", &wrist.clock)
}

fn validate_clock(field: &str, clock: &ClockConfig) -> Result<(), ContractError> {
    if clock.expected_interval_ms <= 0 {
        return Err(ContractError::config_validation(
            format!("{field}.expected_interval_ms"),
            format!(
                "expected_interval_ms must be > 0, got {}",
                clock.expected_interval_ms
            ),
        ));
    }
    if clock.drift_tolerance_ms < 0 {
        return Err(ContractError::config_validation(
            format!("{field}.drift_tolerance_ms"),
            format!(
                "drift_tolerance_ms must be >= 0, got {}",
                clock.drift_tolerance_ms
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_blueprint() -> RecorderBlueprint {
        RecorderBlueprint::for_participant("42")
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_empty_participant() {
        let mut bp = minimal_blueprint();
        bp.participant.id = String::new();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_participant_with_path_separator() {
        let mut bp = minimal_blueprint();
        bp.participant.id = "../42".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("alphanumeric"), "got: {err}");
    }

    #[test]
    fn test_nothing_enabled() {
        let mut bp = minimal_blueprint();
        bp.ring.enabled = false;
        bp.wrist.enabled = false;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("at least one peripheral"), "got: {err}");
    }

    #[test]
    fn test_zero_timeout() {
        let mut bp = minimal_blueprint();
        bp.ring.connect_timeout_ms = 0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("ring.connect_timeout_ms"), "got: {err}");
    }

    #[test]
    fn test_frame_len_out_of_range() {
        let mut bp = minimal_blueprint();
        bp.ring.max_frame_len = 2;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("max_frame_len"), "got: {err}");
    }

    #[test]
    fn test_invalid_rate() {
        let mut bp = minimal_blueprint();
        bp.wrist.target_rate_hz = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("target_rate_hz must be > 0"), "got: {err}");

        bp.wrist.target_rate_hz = f64::NAN;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_negative_drift_tolerance() {
        let mut bp = minimal_blueprint();
        bp.wrist.clock.drift_tolerance_ms = -1;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("wrist.clock.drift_tolerance_ms"), "got: {err}");
    }
}
