//! 설정 관리 -- procmeter.toml 파싱 및 런타임 설정
//!
//! [`ProcmeterConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`PROCMETER_GENERAL_LOG_LEVEL=debug` 형식)
//! 3. 설정 파일 (`procmeter.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), procmeter_core::error::ProcmeterError> {
//! use procmeter_core::config::ProcmeterConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ProcmeterConfig::load("procmeter.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ProcmeterConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ProcmeterError};
use crate::types::{Category, StatField};

/// 쿨다운 최대값 (밀리초, 1시간)
pub const MAX_COOLDOWN_MS: u64 = 3_600_000;

/// 항상 존재해야 하는 디스플레이 프리셋 이름
pub const REQUIRED_PRESETS: [&str; 3] = ["All", "DamageOnly", "ActivationsOnly"];

/// 기본 쿨다운이 0.5초로 지정된 알려진 참 이름
const KNOWN_CHARMS: &[&str] = &[
    "Adrenaline Burst",
    "Bless",
    "Carnage",
    "Cleanse",
    "Cripple",
    "Curse",
    "Divine Wrath",
    "Dodge",
    "Enflame",
    "Fatal Hold",
    "Freeze",
    "Gut",
    "Low Blow",
    "Numb",
    "Overflux",
    "Overpower",
    "Parry",
    "Poison",
    "Ruse",
    "Savage Blow",
    "Scavenge",
    "Vampiric Embrace",
    "Void Inversion",
    "Void's Call",
    "Wound",
    "Zap",
];

/// 기본 쿨다운이 0.5초로 지정된 알려진 티어 이름
const KNOWN_TIERS: &[&str] = &[
    "Amplification",
    "Critical Attack",
    "Dodge",
    "Momentum",
    "Onslaught",
    "Perfect Shot",
    "Transcendence",
];

/// procmeter 통합 설정
///
/// `procmeter.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcmeterConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 트래커 설정
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// 카테고리/키별 쿨다운 설정
    #[serde(default)]
    pub cooldown: CooldownConfig,
    /// 디스플레이 설정
    #[serde(default)]
    pub display: DisplayConfig,
}

impl ProcmeterConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ProcmeterError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ProcmeterError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcmeterError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ProcmeterError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ProcmeterError> {
        toml::from_str(toml_str).map_err(|e| {
            ProcmeterError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `PROCMETER_{SECTION}_{FIELD}`
    /// 예: `PROCMETER_COOLDOWN_HEAL_DEFAULT_MS=250`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "PROCMETER_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "PROCMETER_GENERAL_LOG_FORMAT");

        // Tracker
        override_categories(
            &mut self.tracker.categories,
            "PROCMETER_TRACKER_CATEGORIES",
        );
        override_string(&mut self.tracker.rules_file, "PROCMETER_TRACKER_RULES_FILE");
        override_usize(
            &mut self.tracker.max_tracked_keys,
            "PROCMETER_TRACKER_MAX_TRACKED_KEYS",
        );

        // Cooldown
        for category in Category::ALL {
            let env_key = format!(
                "PROCMETER_COOLDOWN_{}_DEFAULT_MS",
                category.as_str().to_uppercase()
            );
            override_u64(&mut self.cooldown.for_category_mut(category).default_ms, &env_key);
        }

        // Display
        override_string(
            &mut self.display.active_preset,
            "PROCMETER_DISPLAY_ACTIVE_PRESET",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ProcmeterError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.tracker.categories.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tracker.categories".to_owned(),
                reason: "at least one category must be enabled".to_owned(),
            }
            .into());
        }

        if self.tracker.max_tracked_keys == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tracker.max_tracked_keys".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        for category in Category::ALL {
            self.cooldown.for_category(category).validate(category)?;
        }

        self.display.validate()?;

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 트래커 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// 분류할 카테고리 목록
    pub categories: Vec<Category>,
    /// 사용자 정의 규칙 YAML 파일 경로 (빈 문자열이면 사용 안 함)
    pub rules_file: String,
    /// 추적할 최대 키 수 (메모리 성장 제한)
    pub max_tracked_keys: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            categories: Category::ALL.to_vec(),
            rules_file: String::new(),
            max_tracked_keys: 10_000,
        }
    }
}

/// 전체 카테고리의 쿨다운 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    /// 참 쿨다운
    pub charm: CategoryCooldown,
    /// 티어 쿨다운
    pub tier: CategoryCooldown,
    /// 회복 쿨다운
    pub heal: CategoryCooldown,
    /// 크리처 피해 쿨다운
    pub creature_damage: CategoryCooldown,
}

impl CooldownConfig {
    /// 카테고리의 쿨다운 설정을 반환합니다.
    pub fn for_category(&self, category: Category) -> &CategoryCooldown {
        match category {
            Category::Charm => &self.charm,
            Category::Tier => &self.tier,
            Category::Heal => &self.heal,
            Category::CreatureDamage => &self.creature_damage,
        }
    }

    /// 카테고리의 쿨다운 설정에 대한 가변 참조를 반환합니다.
    pub fn for_category_mut(&mut self, category: Category) -> &mut CategoryCooldown {
        match category {
            Category::Charm => &mut self.charm,
            Category::Tier => &mut self.tier,
            Category::Heal => &mut self.heal,
            Category::CreatureDamage => &mut self.creature_damage,
        }
    }
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            charm: CategoryCooldown::with_known_keys(250, KNOWN_CHARMS, 500),
            tier: CategoryCooldown::with_known_keys(250, KNOWN_TIERS, 500),
            heal: CategoryCooldown::new(100),
            creature_damage: CategoryCooldown::new(0),
        }
    }
}

/// 카테고리 하나의 쿨다운 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryCooldown {
    /// 키별 설정이 없을 때의 기본 쿨다운 (밀리초)
    pub default_ms: u64,
    /// 키 이름별 쿨다운 (밀리초)
    pub keys: BTreeMap<String, u64>,
}

impl CategoryCooldown {
    /// 키별 설정 없이 기본값만 가진 설정을 생성합니다.
    pub fn new(default_ms: u64) -> Self {
        Self {
            default_ms,
            keys: BTreeMap::new(),
        }
    }

    fn with_known_keys(default_ms: u64, names: &[&str], key_ms: u64) -> Self {
        Self {
            default_ms,
            keys: names
                .iter()
                .map(|name| ((*name).to_owned(), key_ms))
                .collect(),
        }
    }

    /// 키 이름에 적용할 쿨다운을 반환합니다.
    ///
    /// 키별 설정이 없으면 카테고리 기본값을 사용합니다.
    pub fn duration_for(&self, name: &str) -> Duration {
        let ms = self.keys.get(name).copied().unwrap_or(self.default_ms);
        Duration::from_millis(ms)
    }

    /// 쿨다운 값의 범위를 검증합니다.
    pub fn validate(&self, category: Category) -> Result<(), ProcmeterError> {
        if self.default_ms > MAX_COOLDOWN_MS {
            return Err(ConfigError::InvalidValue {
                field: format!("cooldown.{category}.default_ms"),
                reason: format!("must be at most {MAX_COOLDOWN_MS}"),
            }
            .into());
        }

        for (name, ms) in &self.keys {
            if name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("cooldown.{category}.keys"),
                    reason: "key name must not be empty".to_owned(),
                }
                .into());
            }
            if *ms > MAX_COOLDOWN_MS {
                return Err(ConfigError::InvalidValue {
                    field: format!("cooldown.{category}.keys.{name}"),
                    reason: format!("must be at most {MAX_COOLDOWN_MS}"),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// 디스플레이 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 순환 가능한 가시성 프리셋 (정의 순서대로 순환)
    pub presets: Vec<PresetConfig>,
    /// 시작 시 활성 프리셋 이름
    pub active_preset: String,
    /// 숨길 카테고리 목록
    pub hidden_categories: Vec<Category>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            presets: vec![
                PresetConfig {
                    name: "All".to_owned(),
                    fields: StatField::ALL.to_vec(),
                },
                PresetConfig {
                    name: "DamageOnly".to_owned(),
                    fields: vec![
                        StatField::Min,
                        StatField::Average,
                        StatField::Max,
                        StatField::Total,
                    ],
                },
                PresetConfig {
                    name: "ActivationsOnly".to_owned(),
                    fields: vec![
                        StatField::Count,
                        StatField::HourlyEstimate,
                        StatField::ElapsedTime,
                    ],
                },
            ],
            active_preset: "All".to_owned(),
            hidden_categories: Vec::new(),
        }
    }
}

impl DisplayConfig {
    /// 프리셋 구성을 검증합니다.
    pub fn validate(&self) -> Result<(), ProcmeterError> {
        if self.presets.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "display.presets".to_owned(),
                reason: "at least one preset must be defined".to_owned(),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for preset in &self.presets {
            if preset.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "display.presets".to_owned(),
                    reason: "preset name must not be empty".to_owned(),
                }
                .into());
            }
            if !seen.insert(preset.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "display.presets".to_owned(),
                    reason: format!("duplicate preset name '{}'", preset.name),
                }
                .into());
            }
        }

        for required in REQUIRED_PRESETS {
            if !seen.contains(required) {
                return Err(ConfigError::InvalidValue {
                    field: "display.presets".to_owned(),
                    reason: format!("missing required preset '{required}'"),
                }
                .into());
            }
        }

        if !seen.contains(self.active_preset.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "display.active_preset".to_owned(),
                reason: format!("unknown preset '{}'", self.active_preset),
            }
            .into());
        }

        Ok(())
    }
}

/// 가시성 프리셋
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetConfig {
    /// 프리셋 이름
    pub name: String,
    /// 표시할 필드 목록
    pub fields: Vec<StatField>,
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_categories(target: &mut Vec<Category>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let mut parsed = Vec::new();
        for item in val.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match Category::from_str_loose(item) {
                Some(category) if !parsed.contains(&category) => parsed.push(category),
                Some(_) => {}
                None => warn!(env_key, value = item, "unknown category in env var, ignoring"),
            }
        }
        *target = parsed;
    }
}
