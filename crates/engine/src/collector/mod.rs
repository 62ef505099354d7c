//! 로그 라인 수집 모듈
//!
//! # 수집 소스
//! - [`FileTailCollector`]: 파일 감시 (tail -f 방식, 잘림 감지)
//! - [`read_all_lines`]: 파일 전체를 한 번에 읽기 (리플레이용)
//!
//! # 아키텍처
//! 수집기는 자체 tokio 태스크에서 실행되며, 수집한 라인을
//! `tokio::mpsc::Sender<LogLine>` 채널로 트래커를 소유한 단일 태스크에 전달합니다.

pub mod file;

pub use file::{FileTailCollector, FileTailConfig, read_all_lines};

use std::time::SystemTime;

/// 수집된 로그 라인
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// 라인 텍스트 (개행 제외)
    pub text: String,
    /// 수집 소스 식별자 (예: "file:/home/user/game.log")
    pub source: String,
    /// 수집 시각
    pub received_at: SystemTime,
}

impl LogLine {
    /// 새 라인을 생성합니다.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            received_at: SystemTime::now(),
        }
    }
}

/// 수집기 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectorStatus {
    /// 실행 대기 중
    Idle,
    /// 실행 중
    Running,
    /// 에러로 중단됨
    Error(String),
    /// 정상 종료됨
    Stopped,
}
