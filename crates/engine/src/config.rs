//! 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`ProcmeterConfig`]에서 엔진이 쓰는 섹션만 모아
//! 하나의 구조로 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use procmeter_core::config::ProcmeterConfig;
//! use procmeter_engine::config::EngineConfig;
//!
//! let core_config = ProcmeterConfig::default();
//! let config = EngineConfig::from_core(&core_config);
//! ```

use std::path::PathBuf;

use procmeter_core::config::{CooldownConfig, DisplayConfig, ProcmeterConfig};
use procmeter_core::types::Category;

use crate::error::ProcEngineError;

/// 추적 가능한 키 수의 상한
const MAX_TRACKED_KEYS_LIMIT: usize = 1_000_000;

/// 엔진 설정
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// 분류할 카테고리 (평가 순서)
    pub categories: Vec<Category>,
    /// 사용자 정의 규칙 파일
    pub rules_file: Option<PathBuf>,
    /// 추적할 최대 키 수
    pub max_tracked_keys: usize,
    /// 쿨다운 설정
    pub cooldown: CooldownConfig,
    /// 디스플레이 설정
    pub display: DisplayConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            rules_file: None,
            max_tracked_keys: 10_000,
            cooldown: CooldownConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl EngineConfig {
    /// core 설정에서 엔진 설정을 생성합니다.
    ///
    /// 카테고리는 중복을 제거하고 [`Category::ALL`] 순서로 정렬합니다.
    pub fn from_core(core: &ProcmeterConfig) -> Self {
        let rules_file = if core.tracker.rules_file.trim().is_empty() {
            None
        } else {
            Some(PathBuf::from(core.tracker.rules_file.trim()))
        };

        Self {
            categories: normalize_categories(&core.tracker.categories),
            rules_file,
            max_tracked_keys: core.tracker.max_tracked_keys,
            cooldown: core.cooldown.clone(),
            display: core.display.clone(),
        }
    }

    /// 설정 값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ProcEngineError> {
        if self.categories.is_empty() {
            return Err(ProcEngineError::Config {
                field: "categories".to_owned(),
                reason: "at least one category must be enabled".to_owned(),
            });
        }

        if self.max_tracked_keys == 0 || self.max_tracked_keys > MAX_TRACKED_KEYS_LIMIT {
            return Err(ProcEngineError::Config {
                field: "max_tracked_keys".to_owned(),
                reason: format!("must be between 1 and {MAX_TRACKED_KEYS_LIMIT}"),
            });
        }

        for category in Category::ALL {
            self.cooldown
                .for_category(category)
                .validate(category)
                .map_err(|e| ProcEngineError::Config {
                    field: format!("cooldown.{category}"),
                    reason: e.to_string(),
                })?;
        }

        self.display.validate().map_err(|e| ProcEngineError::Config {
            field: "display".to_owned(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}

fn normalize_categories(categories: &[Category]) -> Vec<Category> {
    Category::ALL
        .into_iter()
        .filter(|c| categories.contains(c))
        .collect()
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 분류할 카테고리를 설정합니다.
    pub fn categories(mut self, categories: &[Category]) -> Self {
        self.config.categories = normalize_categories(categories);
        self
    }

    /// 사용자 정의 규칙 파일을 설정합니다.
    pub fn rules_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_file = Some(path.into());
        self
    }

    /// 최대 추적 키 수를 설정합니다.
    pub fn max_tracked_keys(mut self, max: usize) -> Self {
        self.config.max_tracked_keys = max;
        self
    }

    /// 쿨다운 설정을 지정합니다.
    pub fn cooldown(mut self, cooldown: CooldownConfig) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    /// 디스플레이 설정을 지정합니다.
    pub fn display(mut self, display: DisplayConfig) -> Self {
        self.config.display = display;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<EngineConfig, ProcEngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
