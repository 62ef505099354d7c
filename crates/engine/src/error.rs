//! 엔진 에러 타입
//!
//! [`ProcEngineError`]는 엔진 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<ProcEngineError> for ProcmeterError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 분류 실패(매칭 없음)와 수치 파싱 실패는 에러가 아닙니다.

use procmeter_core::error::{ConfigError, ProcmeterError, RuleError};

/// 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ProcEngineError {
    /// 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 규칙 유효성 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 규칙 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 수집기 에러 (파일 I/O 등)
    #[error("collector error: {path}: {reason}")]
    Collector {
        /// 수집 대상 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProcEngineError> for ProcmeterError {
    fn from(err: ProcEngineError) -> Self {
        match err {
            ProcEngineError::RuleLoad { path, reason } => {
                ProcmeterError::Rule(RuleError::Load { path, reason })
            }
            ProcEngineError::RuleValidation { rule_id, reason } => {
                ProcmeterError::Rule(RuleError::Invalid { rule_id, reason })
            }
            ProcEngineError::Config { field, reason } => {
                ProcmeterError::Config(ConfigError::InvalidValue { field, reason })
            }
            ProcEngineError::Io(e) => ProcmeterError::Io(e),
            other @ ProcEngineError::Collector { .. } => {
                ProcmeterError::Collector(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_load_error_display() {
        let err = ProcEngineError::RuleLoad {
            path: "/etc/procmeter/rules.yml".to_owned(),
            reason: "invalid YAML".to_owned(),
        };
        assert!(err.to_string().contains("rules.yml"));
    }

    #[test]
    fn rule_validation_converts_to_rule_error() {
        let err = ProcEngineError::RuleValidation {
            rule_id: "custom_heal".to_owned(),
            reason: "bad pattern".to_owned(),
        };
        let top: ProcmeterError = err.into();
        assert!(matches!(top, ProcmeterError::Rule(RuleError::Invalid { .. })));
    }

    #[test]
    fn config_converts_to_config_error() {
        let err = ProcEngineError::Config {
            field: "max_tracked_keys".to_owned(),
            reason: "must be greater than 0".to_owned(),
        };
        let top: ProcmeterError = err.into();
        assert!(matches!(top, ProcmeterError::Config(_)));
        assert!(top.to_string().contains("max_tracked_keys"));
    }

    #[test]
    fn collector_converts_to_collector_error() {
        let err = ProcEngineError::Collector {
            path: "/tmp/game.log".to_owned(),
            reason: "failed to read".to_owned(),
        };
        let top: ProcmeterError = err.into();
        assert!(matches!(top, ProcmeterError::Collector(_)));
    }
}
