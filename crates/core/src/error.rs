//! 에러 타입 -- 도메인별 에러 정의
//!
//! 분류 실패, 숫자 파싱 실패, 쿨다운 설정 누락은 에러가 아닙니다.
//! 에러는 설정 로딩, 사용자 규칙 로딩, 입출력 경계에서만 발생합니다.

/// procmeter 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ProcmeterError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 분류 규칙 에러
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// 라인 수집 에러
    #[error("collector error: {0}")]
    Collector(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 분류 규칙 에러
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// 규칙 파일 로딩 실패
    #[error("failed to load rules from {path}: {reason}")]
    Load { path: String, reason: String },

    /// 규칙 유효성 검증 실패
    #[error("invalid rule '{rule_id}': {reason}")]
    Invalid { rule_id: String, reason: String },
}
