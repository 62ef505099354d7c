#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`rule`]: 우선순위 분류 규칙 (내장 테이블 + 사용자 YAML 규칙)
//! - [`cooldown`]: 키별 쿨다운 게이트와 쿨다운 정책
//! - [`stats`]: 키별 누적 통계 집계
//! - [`rate`]: 시간당 발동 수 추정
//! - [`display`]: 가시성 프리셋, 스냅샷, 디스플레이 어댑터 계약
//! - [`collector`]: 로그 파일 tail 수집 및 리플레이용 일괄 읽기
//! - [`tracker`]: 전체 흐름 오케스트레이션
//! - [`config`]: 엔진 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! FileTailCollector -> mpsc -> ProcTracker
//!                                |
//!     RuleClassifier -> CooldownGate -> StatsAggregator -> ProcSnapshot -> DisplayAdapter
//! ```

pub mod config;
pub mod cooldown;
pub mod display;
pub mod error;
pub mod rate;
pub mod stats;
pub mod tracker;

pub mod collector;
pub mod rule;

// --- 주요 타입 re-export ---

// 트래커
pub use tracker::{ProcTracker, TrackerBuilder, TrackerCommand, TrackerStats};

// 설정
pub use config::{EngineConfig, EngineConfigBuilder};

// 에러
pub use error::ProcEngineError;

// 분류 규칙
pub use rule::{Classification, ClassificationRule, RuleClassifier, RuleLoader};

// 쿨다운
pub use cooldown::{CooldownGate, CooldownPolicy};

// 통계
pub use stats::{StatsAggregator, StatsRecord};

// 디스플레이
pub use display::{DisplayAdapter, DisplayState, ProcSnapshot};

// 수집기
pub use collector::{FileTailCollector, FileTailConfig, LogLine};
