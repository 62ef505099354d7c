//! 프록 트래커 -- 분류, 쿨다운, 집계의 전체 흐름을 관리합니다.
//!
//! [`ProcTracker`]는 라인 하나를 받아 활성 카테고리마다 분류하고, 쿨다운 게이트를
//! 통과한 이벤트만 통계에 반영한 뒤 스냅샷을 디스플레이 어댑터에 넘깁니다.
//!
//! # 내부 아키텍처
//! ```text
//! line -> RuleClassifier -> CooldownGate -> StatsAggregator -> ProcSnapshot -> DisplayAdapter
//! ```
//!
//! 트래커는 단일 작성자입니다. 여러 소스에서 라인이 들어오면
//! `mpsc` 채널로 모아 [`ProcTracker::run`]을 실행하는 태스크 하나에 전달합니다.

use std::time::{Duration, Instant, SystemTime};

use metrics::{counter, gauge, histogram};
use procmeter_core::metrics as m;
use procmeter_core::types::{Category, ClassifiedEvent, EventKey};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::collector::LogLine;
use crate::config::EngineConfig;
use crate::cooldown::{CooldownGate, CooldownPolicy};
use crate::display::{DisplayAdapter, DisplayState, ProcSnapshot};
use crate::error::ProcEngineError;
use crate::rule::{Classification, ClassificationRule, RuleClassifier};
use crate::stats::{StatsAggregator, StatsRecord};

/// 만료된 쿨다운 항목 정리 주기
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// 운영자 명령
///
/// 라인과 같은 단일 작성자 경로로 트래커 태스크에 전달됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    /// 다음 가시성 프리셋으로 순환
    CyclePreset,
    /// 카테고리 가시성 토글
    ToggleCategory(Category),
    /// 키 하나의 통계 리셋
    Reset(EventKey),
    /// 모든 키의 통계 리셋
    ResetAll,
}

/// 트래커 처리 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerStats {
    /// 처리한 라인 수
    pub lines_processed: u64,
    /// 분류된 이벤트 수
    pub events_classified: u64,
    /// 쿨다운을 통과해 집계된 이벤트 수
    pub events_accepted: u64,
    /// 쿨다운으로 억제된 이벤트 수
    pub events_suppressed: u64,
    /// 억제 규칙에 매칭된 라인 수
    pub rule_suppressed: u64,
    /// 키 상한 초과로 버려진 이벤트 수
    pub keys_dropped: u64,
}

/// 프록 트래커
///
/// 쿨다운 게이트와 통계 집계기를 독점 소유하는 상태 객체입니다.
///
/// # 사용 예시
/// ```ignore
/// use procmeter_engine::TrackerBuilder;
///
/// let mut tracker = TrackerBuilder::new().config(config).build()?;
/// for snapshot in tracker.process_line("You deal 150 damage. (low blow charm)") {
///     println!("{}", snapshot.render_line().unwrap_or_default());
/// }
/// ```
pub struct ProcTracker {
    config: EngineConfig,
    classifier: RuleClassifier,
    gate: CooldownGate,
    policy: CooldownPolicy,
    stats: StatsAggregator,
    display: DisplayState,
    adapters: Vec<Box<dyn DisplayAdapter + Send>>,
    counters: TrackerStats,
}

impl ProcTracker {
    /// 현재 시각으로 라인을 처리합니다.
    pub fn process_line(&mut self, line: &str) -> Vec<ProcSnapshot> {
        self.process_line_at(line, SystemTime::now())
    }

    /// 지정한 시각으로 라인을 처리하고 인정된 이벤트의 스냅샷을 반환합니다.
    ///
    /// 한 라인이 여러 카테고리에서 이벤트를 만들 수 있습니다
    /// (예: 참 회복은 참 발동이자 회복).
    pub fn process_line_at(&mut self, line: &str, now: SystemTime) -> Vec<ProcSnapshot> {
        let start = Instant::now();
        self.counters.lines_processed += 1;
        counter!(m::TRACKER_LINES_PROCESSED_TOTAL).increment(1);

        let mut snapshots = Vec::new();
        for index in 0..self.config.categories.len() {
            let category = self.config.categories[index];
            match self.classifier.evaluate(line, category) {
                Classification::NoMatch => {}
                Classification::Suppressed { .. } => {
                    self.counters.rule_suppressed += 1;
                    counter!(m::TRACKER_RULE_SUPPRESSED_TOTAL).increment(1);
                }
                Classification::Matched(event) => {
                    if let Some(snapshot) = self.handle_event(event, now) {
                        snapshots.push(snapshot);
                    }
                }
            }
        }

        histogram!(m::TRACKER_PROCESSING_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        snapshots
    }

    /// 분류된 이벤트를 게이트와 집계기에 통과시킵니다.
    fn handle_event(&mut self, event: ClassifiedEvent, now: SystemTime) -> Option<ProcSnapshot> {
        let ClassifiedEvent { key, value } = event;
        let category = key.category.as_str();
        self.counters.events_classified += 1;
        counter!(m::TRACKER_EVENTS_CLASSIFIED_TOTAL, m::LABEL_CATEGORY => category).increment(1);

        if !self.stats.contains(&key) && self.stats.len() >= self.config.max_tracked_keys {
            self.counters.keys_dropped += 1;
            counter!(m::TRACKER_KEYS_DROPPED_TOTAL).increment(1);
            tracing::warn!(
                key = %key,
                max_tracked_keys = self.config.max_tracked_keys,
                "tracked key limit reached, dropping new key"
            );
            return None;
        }

        let cooldown = self.policy.resolve(&key);
        if !self.gate.admit(&key, cooldown, now) {
            self.counters.events_suppressed += 1;
            counter!(m::TRACKER_EVENTS_SUPPRESSED_TOTAL, m::LABEL_CATEGORY => category)
                .increment(1);
            return None;
        }

        self.counters.events_accepted += 1;
        counter!(m::TRACKER_EVENTS_ACCEPTED_TOTAL, m::LABEL_CATEGORY => category).increment(1);

        let record = self.stats.update(&key, value, now);
        let snapshot = ProcSnapshot::capture(&key, record, &self.display, now);
        gauge!(m::TRACKER_TRACKED_KEYS).set(self.stats.len() as f64);

        tracing::debug!(key = %key, value, count = snapshot.record.count, "event accepted");
        for adapter in &mut self.adapters {
            adapter.on_snapshot(&snapshot);
        }
        Some(snapshot)
    }

    /// 채널이 닫힐 때까지 라인을 받아 처리합니다.
    ///
    /// 처리한 라인 수를 반환합니다. 만료된 쿨다운 항목은 주기적으로 정리합니다.
    pub async fn run(&mut self, rx: mpsc::Receiver<LogLine>) -> u64 {
        let (_command_tx, command_rx) = mpsc::channel(1);
        self.run_with_commands(rx, command_rx).await
    }

    /// 라인과 운영자 명령을 함께 받아 처리합니다.
    ///
    /// 라인 채널이 닫히면 종료합니다. 명령 채널이 먼저 닫히면 라인만 계속 처리합니다.
    pub async fn run_with_commands(
        &mut self,
        mut rx: mpsc::Receiver<LogLine>,
        mut commands: mpsc::Receiver<TrackerCommand>,
    ) -> u64 {
        let mut processed = 0;
        let mut commands_open = true;
        let mut cleanup = tokio::time::interval(CLEANUP_INTERVAL);
        cleanup.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe_line = rx.recv() => {
                    let Some(line) = maybe_line else {
                        break;
                    };
                    self.process_line_at(&line.text, line.received_at);
                    processed += 1;
                }
                maybe_command = commands.recv(), if commands_open => {
                    match maybe_command {
                        Some(command) => {
                            self.apply_command_at(command, SystemTime::now());
                        }
                        None => {
                            tracing::debug!("command channel closed");
                            commands_open = false;
                        }
                    }
                }
                _ = cleanup.tick() => {
                    let removed = self.cleanup_expired(SystemTime::now());
                    if removed > 0 {
                        tracing::debug!(removed, "expired cooldown entries cleaned up");
                    }
                }
            }
        }

        tracing::info!(processed, "line channel closed, tracker stopped");
        processed
    }

    /// 운영자 명령을 적용합니다.
    ///
    /// 모르는 키의 리셋처럼 아무것도 바뀌지 않으면 `false`를 반환합니다.
    pub fn apply_command_at(&mut self, command: TrackerCommand, now: SystemTime) -> bool {
        match command {
            TrackerCommand::CyclePreset => {
                let preset = self.display.cycle_preset().name.clone();
                tracing::info!(preset = %preset, "display preset changed");
                self.notify_display_change();
                true
            }
            TrackerCommand::ToggleCategory(category) => {
                let visible = self.display.toggle_category(category);
                tracing::info!(category = %category, visible, "category visibility toggled");
                self.notify_display_change();
                true
            }
            TrackerCommand::Reset(key) => {
                let found = self.reset_at(&key, now);
                if !found {
                    tracing::warn!(key = %key, "reset requested for unknown key");
                }
                found
            }
            TrackerCommand::ResetAll => self.reset_all_at(now) > 0,
        }
    }

    fn notify_display_change(&mut self) {
        for adapter in &mut self.adapters {
            adapter.on_display_change(&self.display);
        }
    }

    /// 키의 통계를 리셋합니다. 모르는 키면 `false`.
    pub fn reset(&mut self, key: &EventKey) -> bool {
        self.reset_at(key, SystemTime::now())
    }

    /// 지정한 시각으로 키의 통계를 리셋합니다.
    pub fn reset_at(&mut self, key: &EventKey, now: SystemTime) -> bool {
        if !self.stats.reset(key, now) {
            return false;
        }
        counter!(m::TRACKER_RESETS_TOTAL).increment(1);
        for adapter in &mut self.adapters {
            adapter.on_reset(key);
        }
        true
    }

    /// 모든 키의 통계를 리셋하고 리셋한 키 수를 반환합니다.
    pub fn reset_all_at(&mut self, now: SystemTime) -> usize {
        let keys: Vec<EventKey> = self.stats.iter().map(|(key, _)| key.clone()).collect();
        let count = self.stats.reset_all(now);
        counter!(m::TRACKER_RESETS_TOTAL).increment(count as u64);
        for key in &keys {
            for adapter in &mut self.adapters {
                adapter.on_reset(key);
            }
        }
        count
    }

    /// 모든 키의 현재 스냅샷을 키 순서로 반환합니다.
    pub fn snapshots(&self, now: SystemTime) -> Vec<ProcSnapshot> {
        self.stats
            .sorted()
            .into_iter()
            .map(|(key, record)| ProcSnapshot::capture(key, record, &self.display, now))
            .collect()
    }

    /// 만료된 쿨다운 항목을 정리합니다.
    pub fn cleanup_expired(&mut self, now: SystemTime) -> usize {
        self.gate.cleanup_expired(now)
    }

    /// 키의 통계 레코드를 조회합니다.
    pub fn record(&self, key: &EventKey) -> Option<&StatsRecord> {
        self.stats.get(key)
    }

    /// 통계 집계기에 대한 참조
    pub fn stats(&self) -> &StatsAggregator {
        &self.stats
    }

    /// 처리 통계
    pub fn tracker_stats(&self) -> TrackerStats {
        self.counters
    }

    /// 분류기에 대한 참조
    pub fn classifier(&self) -> &RuleClassifier {
        &self.classifier
    }

    /// 분류기에 대한 가변 참조
    pub fn classifier_mut(&mut self) -> &mut RuleClassifier {
        &mut self.classifier
    }

    /// 디스플레이 상태
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    /// 디스플레이 상태에 대한 가변 참조 (프리셋 순환, 카테고리 토글)
    pub fn display_mut(&mut self) -> &mut DisplayState {
        &mut self.display
    }

    /// 디스플레이 어댑터를 등록합니다.
    pub fn add_adapter(&mut self, adapter: Box<dyn DisplayAdapter + Send>) {
        self.adapters.push(adapter);
    }

    /// 활성 카테고리
    pub fn categories(&self) -> &[Category] {
        &self.config.categories
    }

    /// 설정에 지정된 사용자 규칙 파일을 로드합니다.
    ///
    /// 파일이 지정되지 않았거나 존재하지 않으면 내장 규칙만 사용하고 0을 반환합니다.
    /// 존재하지만 잘못된 파일은 에러입니다.
    pub async fn load_configured_rules(&mut self) -> Result<usize, ProcEngineError> {
        let Some(path) = self.config.rules_file.clone() else {
            return Ok(0);
        };
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::warn!(
                path = %path.display(),
                "custom rules file not found, using built-in rules only"
            );
            return Ok(0);
        }
        self.classifier.load_custom_rules(&path).await
    }
}

/// 트래커 빌더
///
/// # 사용 예시
/// ```ignore
/// let tracker = TrackerBuilder::new()
///     .config(EngineConfig::from_core(&core_config))
///     .adapter(Box::new(MyAdapter))
///     .build()?;
/// ```
#[derive(Default)]
pub struct TrackerBuilder {
    config: Option<EngineConfig>,
    policy: Option<CooldownPolicy>,
    rules: Vec<ClassificationRule>,
    adapters: Vec<Box<dyn DisplayAdapter + Send>>,
}

impl TrackerBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔진 설정을 지정합니다.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 설정 대신 사용할 쿨다운 정책을 지정합니다.
    pub fn cooldown_policy(mut self, policy: CooldownPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// 사용자 정의 규칙을 추가합니다.
    pub fn rule(mut self, rule: ClassificationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// 디스플레이 어댑터를 추가합니다.
    pub fn adapter(mut self, adapter: Box<dyn DisplayAdapter + Send>) -> Self {
        self.adapters.push(adapter);
        self
    }

    /// 트래커를 빌드합니다.
    ///
    /// 설정의 `rules_file`은 읽지 않습니다.
    /// [`ProcTracker::load_configured_rules`]로 따로 로드하세요.
    pub fn build(self) -> Result<ProcTracker, ProcEngineError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut classifier = RuleClassifier::with_builtin_rules()?;
        for rule in self.rules {
            classifier.add_custom_rule(rule)?;
        }

        let policy = self
            .policy
            .unwrap_or_else(|| CooldownPolicy::from_config(&config.cooldown));
        let display = DisplayState::from_config(&config.display)?;

        tracing::debug!(
            categories = ?config.categories,
            rules = classifier.rule_count(),
            max_tracked_keys = config.max_tracked_keys,
            "tracker built"
        );

        Ok(ProcTracker {
            config,
            classifier,
            gate: CooldownGate::new(),
            policy,
            stats: StatsAggregator::new(),
            display,
            adapters: self.adapters,
            counters: TrackerStats::default(),
        })
    }
}
