//! 쿨다운 게이트 -- 키별 단일 토큰 디바운스
//!
//! [`CooldownGate`]는 키마다 "다음 이벤트를 받을 수 있는 가장 이른 시각"을 기록합니다.
//! 이벤트를 받아들이는 순간 `next_allowed_at = now + cooldown`으로 갱신되므로,
//! 윈도우 안의 버스트는 한 번만 인정되고 다음 인정은 직전 *인정* 시각으로부터
//! 한 쿨다운 뒤에야 가능합니다 (마지막 라인 기준이 아님).
//!
//! [`CooldownPolicy`]는 설정에서 키별 쿨다운 길이를 결정합니다.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use procmeter_core::config::CooldownConfig;
use procmeter_core::types::{Category, EventKey};

/// 키 하나의 쿨다운 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownEntry {
    /// 새 이벤트를 받을 수 있는 가장 이른 시각
    pub next_allowed_at: SystemTime,
    /// 마지막 인정 시 적용된 쿨다운 길이
    pub cooldown: Duration,
}

/// 쿨다운 게이트
///
/// 키별 [`CooldownEntry`]를 독점 소유합니다.
#[derive(Debug, Default)]
pub struct CooldownGate {
    entries: HashMap<EventKey, CooldownEntry>,
    /// 인정된 이벤트 수
    accepted: u64,
    /// 쿨다운으로 억제된 이벤트 수
    suppressed: u64,
}

impl CooldownGate {
    /// 새 게이트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 이벤트를 받아들일지 결정합니다.
    ///
    /// - 항목이 없으면 즉시 인정합니다.
    /// - `now < next_allowed_at`이면 거부하고 항목은 그대로 둡니다.
    /// - 그 외에는 인정하고 `next_allowed_at = now + cooldown`으로 갱신합니다.
    pub fn admit(&mut self, key: &EventKey, cooldown: Duration, now: SystemTime) -> bool {
        if let Some(entry) = self.entries.get(key)
            && now < entry.next_allowed_at
        {
            self.suppressed += 1;
            tracing::debug!(
                key = %key,
                remaining_ms = entry
                    .next_allowed_at
                    .duration_since(now)
                    .unwrap_or_default()
                    .as_millis() as u64,
                "event suppressed by cooldown"
            );
            return false;
        }

        let next_allowed_at = now.checked_add(cooldown).unwrap_or(now);
        self.entries.insert(
            key.clone(),
            CooldownEntry {
                next_allowed_at,
                cooldown,
            },
        );
        self.accepted += 1;
        true
    }

    /// 키의 현재 쿨다운 상태를 반환합니다.
    pub fn entry(&self, key: &EventKey) -> Option<&CooldownEntry> {
        self.entries.get(key)
    }

    /// 쿨다운이 끝난 항목을 정리합니다.
    ///
    /// 항목이 없는 키는 즉시 인정되므로 동작은 바뀌지 않습니다.
    /// 주기적으로 호출하여 메모리 성장을 방지합니다.
    pub fn cleanup_expired(&mut self, now: SystemTime) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.next_allowed_at);
        before - self.entries.len()
    }

    /// 추적 중인 키 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 추적 중인 키가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 인정된 이벤트 수를 반환합니다.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// 쿨다운으로 억제된 이벤트 수를 반환합니다.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

/// 키별 쿨다운 길이 결정 정책
///
/// 키별 설정이 있으면 그 값을, 없으면 카테고리 기본값을 사용합니다.
/// 결정된 값은 키마다 한 번만 계산하여 캐싱합니다. 회복 키는 처음 등장할 때
/// 각자의 쿨다운을 갖게 되어 출처마다 독립적으로 제한됩니다.
#[derive(Debug, Clone)]
pub struct CooldownPolicy {
    config: CooldownConfig,
    resolved: HashMap<EventKey, Duration>,
}

impl CooldownPolicy {
    /// 설정에서 정책을 생성합니다.
    pub fn from_config(config: &CooldownConfig) -> Self {
        Self {
            config: config.clone(),
            resolved: HashMap::new(),
        }
    }

    /// 모든 카테고리에 같은 기본값을 쓰는 정책을 생성합니다.
    pub fn uniform(cooldown: Duration) -> Self {
        let ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
        let mut config = CooldownConfig::default();
        for category in Category::ALL {
            let section = config.for_category_mut(category);
            section.default_ms = ms;
            section.keys.clear();
        }
        Self::from_config(&config)
    }

    /// 특정 키의 쿨다운을 지정합니다.
    pub fn with_key(mut self, category: Category, name: &str, cooldown: Duration) -> Self {
        let ms = u64::try_from(cooldown.as_millis()).unwrap_or(u64::MAX);
        self.config
            .for_category_mut(category)
            .keys
            .insert(name.to_owned(), ms);
        self.resolved.remove(&EventKey::new(category, name));
        self
    }

    /// 키에 적용할 쿨다운을 결정합니다.
    pub fn resolve(&mut self, key: &EventKey) -> Duration {
        if let Some(duration) = self.resolved.get(key) {
            return *duration;
        }

        let section = self.config.for_category(key.category);
        let duration = section.duration_for(&key.name);
        if key.category == Category::Heal {
            tracing::debug!(
                key = %key,
                cooldown_ms = duration.as_millis() as u64,
                "registered cooldown for new heal source"
            );
        }
        self.resolved.insert(key.clone(), duration);
        duration
    }

    /// 캐싱된 키 수
    pub fn resolved_len(&self) -> usize {
        self.resolved.len()
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self::from_config(&CooldownConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> EventKey {
        EventKey::new(Category::Charm, name)
    }

    fn at(base: SystemTime, ms: u64) -> SystemTime {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn first_event_is_admitted() {
        let mut gate = CooldownGate::new();
        assert!(gate.admit(&key("Low Blow"), Duration::from_millis(500), SystemTime::now()));
        assert_eq!(gate.accepted(), 1);
    }

    #[test]
    fn debounce_sequence() {
        let mut gate = CooldownGate::new();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let cooldown = Duration::from_millis(500);

        assert!(gate.admit(&key("Low Blow"), cooldown, t));
        assert!(!gate.admit(&key("Low Blow"), cooldown, at(t, 100)));
        assert!(gate.admit(&key("Low Blow"), cooldown, at(t, 600)));
        assert_eq!(gate.accepted(), 2);
        assert_eq!(gate.suppressed(), 1);
    }

    #[test]
    fn next_allowed_counts_from_acceptance_not_last_line() {
        let mut gate = CooldownGate::new();
        let t = SystemTime::UNIX_EPOCH;
        let cooldown = Duration::from_millis(500);

        assert!(gate.admit(&key("Freeze"), cooldown, t));
        // 거부된 라인은 창을 연장하지 않음
        assert!(!gate.admit(&key("Freeze"), cooldown, at(t, 300)));
        assert!(!gate.admit(&key("Freeze"), cooldown, at(t, 450)));
        assert!(gate.admit(&key("Freeze"), cooldown, at(t, 500)));
    }

    #[test]
    fn rejection_leaves_entry_unchanged() {
        let mut gate = CooldownGate::new();
        let t = SystemTime::UNIX_EPOCH;
        gate.admit(&key("Zap"), Duration::from_millis(500), t);
        let before = *gate.entry(&key("Zap")).unwrap();
        gate.admit(&key("Zap"), Duration::from_millis(500), at(t, 10));
        assert_eq!(*gate.entry(&key("Zap")).unwrap(), before);
        assert_eq!(before.next_allowed_at, at(t, 500));
    }

    #[test]
    fn zero_cooldown_admits_everything() {
        let mut gate = CooldownGate::new();
        let t = SystemTime::UNIX_EPOCH;
        for _ in 0..5 {
            assert!(gate.admit(&key("By Dragon"), Duration::ZERO, t));
        }
    }

    #[test]
    fn keys_are_independent() {
        let mut gate = CooldownGate::new();
        let t = SystemTime::UNIX_EPOCH;
        let cooldown = Duration::from_millis(500);
        assert!(gate.admit(&key("Low Blow"), cooldown, t));
        assert!(gate.admit(&key("Freeze"), cooldown, at(t, 100)));
        // 같은 이름이라도 카테고리가 다르면 별개
        assert!(gate.admit(&EventKey::new(Category::Tier, "Low Blow"), cooldown, at(t, 100)));
    }

    #[test]
    fn clock_going_backwards_is_rejected_until_window_passes() {
        let mut gate = CooldownGate::new();
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        assert!(gate.admit(&key("Ruse"), Duration::from_millis(500), t));
        assert!(!gate.admit(&key("Ruse"), Duration::from_millis(500), t - Duration::from_secs(1)));
    }

    #[test]
    fn cleanup_removes_only_expired() {
        let mut gate = CooldownGate::new();
        let t = SystemTime::UNIX_EPOCH;
        gate.admit(&key("Short"), Duration::from_millis(100), t);
        gate.admit(&key("Long"), Duration::from_millis(1_000), t);

        assert_eq!(gate.cleanup_expired(at(t, 500)), 1);
        assert_eq!(gate.len(), 1);
        assert!(gate.entry(&key("Long")).is_some());
    }

    #[test]
    fn policy_uses_key_then_category_default() {
        let mut policy = CooldownPolicy::uniform(Duration::from_millis(200))
            .with_key(Category::Charm, "Low Blow", Duration::from_millis(500));
        assert_eq!(policy.resolve(&key("Low Blow")), Duration::from_millis(500));
        assert_eq!(policy.resolve(&key("Freeze")), Duration::from_millis(200));
    }

    #[test]
    fn policy_caches_heal_sources_lazily() {
        let mut policy = CooldownPolicy::default();
        assert_eq!(policy.resolved_len(), 0);
        let from = EventKey::new(Category::Heal, "From_Druid");
        let to = EventKey::new(Category::Heal, "To_Druid");
        policy.resolve(&from);
        policy.resolve(&from);
        policy.resolve(&to);
        assert_eq!(policy.resolved_len(), 2);
    }

    #[test]
    fn policy_default_matches_config_defaults() {
        let mut policy = CooldownPolicy::default();
        assert_eq!(policy.resolve(&key("Low Blow")), Duration::from_millis(500));
        assert_eq!(
            policy.resolve(&EventKey::new(Category::CreatureDamage, "By Dragon")),
            Duration::ZERO
        );
    }

    #[test]
    fn with_key_invalidates_cached_value() {
        let mut policy = CooldownPolicy::uniform(Duration::from_millis(100));
        assert_eq!(policy.resolve(&key("Gut")), Duration::from_millis(100));
        let mut policy = policy.with_key(Category::Charm, "Gut", Duration::from_millis(900));
        assert_eq!(policy.resolve(&key("Gut")), Duration::from_millis(900));
    }
}
