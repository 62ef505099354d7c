//! 디스플레이 어댑터 입력 계약
//!
//! 화면 렌더링은 엔진 밖의 관심사입니다. 엔진은 인정된 이벤트마다
//! 읽기 전용 [`ProcSnapshot`]을 만들어 [`DisplayAdapter`]에 넘기고,
//! 어떤 필드와 카테고리를 보일지는 [`DisplayState`]가 관리합니다.

use std::collections::BTreeSet;
use std::time::SystemTime;

use procmeter_core::config::DisplayConfig;
use procmeter_core::types::{Category, EventKey, StatField};
use serde::Serialize;

use crate::error::ProcEngineError;
use crate::stats::StatsRecord;

/// 가시성 프리셋
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    /// 프리셋 이름
    pub name: String,
    /// 표시할 필드 (표시 순서)
    pub fields: Vec<StatField>,
}

/// 디스플레이 상태 -- 활성 프리셋과 숨긴 카테고리
#[derive(Debug, Clone)]
pub struct DisplayState {
    presets: Vec<Preset>,
    active: usize,
    hidden: BTreeSet<Category>,
}

impl DisplayState {
    /// 설정에서 디스플레이 상태를 생성합니다.
    pub fn from_config(config: &DisplayConfig) -> Result<Self, ProcEngineError> {
        let presets: Vec<Preset> = config
            .presets
            .iter()
            .map(|p| Preset {
                name: p.name.clone(),
                fields: p.fields.clone(),
            })
            .collect();

        if presets.is_empty() {
            return Err(ProcEngineError::Config {
                field: "display.presets".to_owned(),
                reason: "at least one preset must be defined".to_owned(),
            });
        }

        let active = presets
            .iter()
            .position(|p| p.name == config.active_preset)
            .ok_or_else(|| ProcEngineError::Config {
                field: "display.active_preset".to_owned(),
                reason: format!("unknown preset '{}'", config.active_preset),
            })?;

        Ok(Self {
            presets,
            active,
            hidden: config.hidden_categories.iter().copied().collect(),
        })
    }

    /// 활성 프리셋
    pub fn active_preset(&self) -> &Preset {
        &self.presets[self.active]
    }

    /// 정의된 프리셋 목록
    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// 다음 프리셋으로 순환하고 새 활성 프리셋을 반환합니다.
    pub fn cycle_preset(&mut self) -> &Preset {
        self.active = (self.active + 1) % self.presets.len();
        tracing::debug!(preset = %self.presets[self.active].name, "display preset changed");
        &self.presets[self.active]
    }

    /// 이름으로 프리셋을 선택합니다. 없는 이름이면 `false`.
    pub fn select_preset(&mut self, name: &str) -> bool {
        match self.presets.iter().position(|p| p.name == name) {
            Some(pos) => {
                self.active = pos;
                true
            }
            None => false,
        }
    }

    /// 카테고리 가시성을 뒤집고 새 가시성을 반환합니다.
    pub fn toggle_category(&mut self, category: Category) -> bool {
        let visible = if self.hidden.remove(&category) {
            true
        } else {
            self.hidden.insert(category);
            false
        };
        tracing::debug!(category = %category, visible, "category visibility toggled");
        visible
    }

    /// 카테고리가 보이는지 여부
    pub fn is_category_visible(&self, category: Category) -> bool {
        !self.hidden.contains(&category)
    }

    /// 활성 프리셋의 필드
    pub fn visible_fields(&self) -> &[StatField] {
        &self.active_preset().fields
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        let config = DisplayConfig::default();
        Self {
            presets: config
                .presets
                .into_iter()
                .map(|p| Preset {
                    name: p.name,
                    fields: p.fields,
                })
                .collect(),
            active: 0,
            hidden: BTreeSet::new(),
        }
    }
}

/// 인정된 이벤트 하나에 대한 읽기 전용 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcSnapshot {
    /// 이벤트 키
    pub key: EventKey,
    /// 통계 레코드 사본
    pub record: StatsRecord,
    /// 경과 시간 (`HH:MM:SS`)
    pub elapsed: String,
    /// 스냅샷 시점의 시간당 예상 발동 수
    pub hourly_estimate: u64,
    /// 표시할 필드
    pub visible_fields: Vec<StatField>,
    /// 카테고리 가시성
    pub category_visible: bool,
}

impl ProcSnapshot {
    /// 레코드와 디스플레이 상태로 스냅샷을 만듭니다.
    pub fn capture(
        key: &EventKey,
        record: &StatsRecord,
        state: &DisplayState,
        now: SystemTime,
    ) -> Self {
        Self {
            key: key.clone(),
            record: record.clone(),
            elapsed: format_elapsed(record.elapsed_secs_at(now)),
            hourly_estimate: record.hourly_at(now),
            visible_fields: state.visible_fields().to_vec(),
            category_visible: state.is_category_visible(key.category),
        }
    }

    /// 필드 값을 문자열로 반환합니다.
    ///
    /// 값이 0뿐인 레코드(회피 등)에서는 피해량 필드를 숨기므로 `None`입니다.
    pub fn field_value(&self, field: StatField) -> Option<String> {
        if field.is_amount_field() && self.record.max_value == 0 {
            return None;
        }
        Some(match field {
            StatField::Count => self.record.count.to_string(),
            StatField::HourlyEstimate => self.hourly_estimate.to_string(),
            StatField::Min => self.record.min_value.to_string(),
            StatField::Average => self.record.average.to_string(),
            StatField::Max => self.record.max_value.to_string(),
            StatField::Total => self.record.total.to_string(),
            StatField::ElapsedTime => self.elapsed.clone(),
        })
    }

    /// 한 줄 텍스트로 렌더링합니다. 카테고리가 숨겨져 있으면 `None`.
    pub fn render_line(&self) -> Option<String> {
        if !self.category_visible {
            return None;
        }
        let parts: Vec<String> = self
            .visible_fields
            .iter()
            .filter_map(|field| {
                self.field_value(*field)
                    .map(|value| format!("{} {value}", field.label()))
            })
            .collect();

        if parts.is_empty() {
            Some(self.key.name.clone())
        } else {
            Some(format!("{}: {}", self.key.name, parts.join(" | ")))
        }
    }
}

/// 경과 초를 `HH:MM:SS`로 표기합니다. 시간 자리는 99를 넘을 수 있습니다.
pub fn format_elapsed(secs: u64) -> String {
    let hours = secs / 3_600;
    let minutes = (secs % 3_600) / 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// 디스플레이 어댑터 -- 스냅샷 소비자
///
/// 화면 렌더링, 드래그, 위치 저장은 모두 구현체의 책임입니다.
pub trait DisplayAdapter {
    /// 인정된 이벤트의 스냅샷을 받습니다.
    fn on_snapshot(&mut self, snapshot: &ProcSnapshot);

    /// 키가 리셋되었음을 알립니다.
    fn on_reset(&mut self, _key: &EventKey) {}

    /// 활성 프리셋이나 카테고리 가시성이 바뀌었음을 알립니다.
    fn on_display_change(&mut self, _state: &DisplayState) {}
}
