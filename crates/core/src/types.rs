//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 분류기, 쿨다운 게이트, 통계 집계기, 디스플레이 어댑터가 공유하는
//! 데이터 구조를 정의합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 프록 이벤트 카테고리
///
/// 닫힌 열거형입니다. 새 이벤트 계열을 추가하면 모든 `match`가
/// 컴파일 타임에 갱신을 요구합니다.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 참(charm) 발동
    Charm,
    /// 티어/보너스 발동
    Tier,
    /// 회복
    Heal,
    /// 크리처와 주고받은 피해
    CreatureDamage,
}

impl Category {
    /// 우선순위 순서의 전체 카테고리 목록
    pub const ALL: [Category; 4] = [
        Category::Charm,
        Category::Tier,
        Category::Heal,
        Category::CreatureDamage,
    ];

    /// 설정 파일과 로그에서 사용하는 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charm => "charm",
            Self::Tier => "tier",
            Self::Heal => "heal",
            Self::CreatureDamage => "creature_damage",
        }
    }

    /// 문자열에서 카테고리를 파싱합니다.
    ///
    /// 대소문자, `-`/`_` 구분을 하지 않습니다.
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "charm" | "charms" => Some(Self::Charm),
            "tier" | "tiers" => Some(Self::Tier),
            "heal" | "heals" | "healing" => Some(Self::Heal),
            "creature_damage" | "damage" | "creature" => Some(Self::CreatureDamage),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이벤트 키 -- 하나의 카운터를 식별하는 (카테고리, 이름) 쌍
///
/// 같은 키를 만드는 두 라인은 같은 논리적 카운터로 집계됩니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    /// 카테고리
    pub category: Category,
    /// 매칭 결과에서 파생된 이름 (예: "Low Blow", "Self", "From_Knight")
    pub name: String,
}

impl EventKey {
    /// 새 이벤트 키를 생성합니다.
    pub fn new(category: Category, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}

/// 분류 결과
///
/// 한 라인이 특정 카테고리의 규칙에 매칭되었을 때 생성됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEvent {
    /// 이벤트 키
    pub key: EventKey,
    /// 추출된 수치 (수치가 없는 이벤트는 0)
    pub value: u64,
}

impl ClassifiedEvent {
    /// 새 분류 결과를 생성합니다.
    pub fn new(category: Category, name: impl Into<String>, value: u64) -> Self {
        Self {
            key: EventKey::new(category, name),
            value,
        }
    }
}

impl fmt::Display for ClassifiedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.key, self.value)
    }
}

/// 디스플레이에 노출할 수 있는 통계 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    /// 발동 횟수
    Count,
    /// 시간당 예상 발동 수
    HourlyEstimate,
    /// 최소값
    Min,
    /// 평균값
    Average,
    /// 최대값
    Max,
    /// 합계
    Total,
    /// 경과 시간
    ElapsedTime,
}

impl StatField {
    /// 표시 순서의 전체 필드 목록
    pub const ALL: [StatField; 7] = [
        StatField::Count,
        StatField::HourlyEstimate,
        StatField::Min,
        StatField::Average,
        StatField::Max,
        StatField::Total,
        StatField::ElapsedTime,
    ];

    /// 피해량 계열 필드인지 여부
    ///
    /// 값이 0인 레코드(예: 회피)에서는 디스플레이가 이 필드를 숨깁니다.
    pub fn is_amount_field(&self) -> bool {
        matches!(self, Self::Min | Self::Average | Self::Max | Self::Total)
    }

    /// 짧은 표시 라벨
    pub fn label(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::HourlyEstimate => "per hour",
            Self::Min => "min",
            Self::Average => "avg",
            Self::Max => "max",
            Self::Total => "total",
            Self::ElapsedTime => "elapsed",
        }
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
