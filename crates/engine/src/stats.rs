//! 통계 집계기 -- 키별 누적 통계 레코드
//!
//! [`StatsAggregator`]는 쿨다운 게이트를 통과한 이벤트에 대해서만 갱신되며,
//! 키별 [`StatsRecord`]를 독점 소유합니다. 레코드는 리셋될 수는 있어도
//! 프로세스가 끝날 때까지 삭제되지 않습니다.

use std::collections::HashMap;
use std::time::SystemTime;

use procmeter_core::types::EventKey;
use serde::{Serialize, Serializer};

use crate::rate;

/// 키 하나의 누적 통계
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRecord {
    /// 인정된 이벤트 수
    pub count: u64,
    /// 첫 이벤트(또는 리셋) 시각 (직렬화 시 Unix epoch 초)
    #[serde(serialize_with = "serialize_epoch_secs")]
    pub first_seen: SystemTime,
    /// 마지막 값
    pub last_value: u64,
    /// 최소값
    pub min_value: u64,
    /// 최대값
    pub max_value: u64,
    /// 합계
    pub total: u64,
    /// 평균 (소수점 둘째 자리 내림)
    pub average: f64,
    /// 시간당 예상 발동 수 (마지막 갱신 시점 기준)
    pub hourly_estimate: u64,
}

impl StatsRecord {
    /// 첫 이벤트 상태의 레코드를 생성합니다.
    pub fn first(value: u64, now: SystemTime) -> Self {
        Self {
            count: 1,
            first_seen: now,
            last_value: value,
            min_value: value,
            max_value: value,
            total: value,
            average: value as f64,
            hourly_estimate: rate::estimate_hourly(now, 1, now),
        }
    }

    /// 값을 반영합니다. `count == 0`이면 첫 이벤트 규칙을 따릅니다.
    fn apply(&mut self, value: u64, now: SystemTime) {
        if self.count == 0 {
            *self = Self::first(value, now);
            return;
        }

        self.count += 1;
        self.max_value = self.max_value.max(value);
        self.min_value = self.min_value.min(value);
        self.total = self.total.saturating_add(value);
        self.average = truncated_average(self.total, self.count);
        self.last_value = value;
        self.hourly_estimate = rate::estimate_hourly(self.first_seen, self.count, now);
    }

    /// 리셋 상태로 되돌립니다.
    fn clear(&mut self, now: SystemTime) {
        self.count = 0;
        self.first_seen = now;
        self.last_value = 0;
        self.min_value = 0;
        self.max_value = 0;
        self.total = 0;
        self.average = 0.0;
        self.hourly_estimate = 0;
    }

    /// `now` 기준 시간당 예상 발동 수
    pub fn hourly_at(&self, now: SystemTime) -> u64 {
        rate::estimate_hourly(self.first_seen, self.count, now)
    }

    /// `now` 기준 경과 초
    pub fn elapsed_secs_at(&self, now: SystemTime) -> u64 {
        rate::elapsed_secs(self.first_seen, now)
    }
}

fn serialize_epoch_secs<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
    let secs = time
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    serializer.serialize_u64(secs)
}

/// `floor(total / count * 100) / 100`
pub fn truncated_average(total: u64, count: u64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    ((total as f64 / count as f64) * 100.0).floor() / 100.0
}

/// 통계 집계기
#[derive(Debug, Default)]
pub struct StatsAggregator {
    records: HashMap<EventKey, StatsRecord>,
}

impl StatsAggregator {
    /// 새 집계기를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 인정된 이벤트를 반영하고 갱신된 레코드를 반환합니다.
    pub fn update(&mut self, key: &EventKey, value: u64, now: SystemTime) -> &StatsRecord {
        if !self.records.contains_key(key) {
            tracing::debug!(key = %key, "tracking new key");
        }
        self.records
            .entry(key.clone())
            .and_modify(|record| record.apply(value, now))
            .or_insert_with(|| StatsRecord::first(value, now))
    }

    /// 키의 통계를 리셋합니다.
    ///
    /// 레코드는 유지되며 다음 이벤트에서 첫 이벤트 규칙으로 다시 초기화됩니다.
    /// 모르는 키는 아무 일도 하지 않고 `false`를 반환합니다.
    pub fn reset(&mut self, key: &EventKey, now: SystemTime) -> bool {
        match self.records.get_mut(key) {
            Some(record) => {
                record.clear(now);
                tracing::info!(key = %key, "statistics reset");
                true
            }
            None => false,
        }
    }

    /// 모든 키의 통계를 리셋합니다.
    pub fn reset_all(&mut self, now: SystemTime) -> usize {
        for record in self.records.values_mut() {
            record.clear(now);
        }
        self.records.len()
    }

    /// 키의 레코드를 조회합니다.
    pub fn get(&self, key: &EventKey) -> Option<&StatsRecord> {
        self.records.get(key)
    }

    /// 키를 알고 있는지 여부
    pub fn contains(&self, key: &EventKey) -> bool {
        self.records.contains_key(key)
    }

    /// 모든 레코드를 키 순서로 반환합니다.
    pub fn sorted(&self) -> Vec<(&EventKey, &StatsRecord)> {
        let mut entries: Vec<_> = self.records.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// 레코드 순회
    pub fn iter(&self) -> impl Iterator<Item = (&EventKey, &StatsRecord)> {
        self.records.iter()
    }

    /// 추적 중인 키 수
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 추적 중인 키가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
