//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `procmeter_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! 레코더가 설치되지 않은 상태에서는 모든 매크로 호출이 no-op입니다.
//! `procmeter` CLI는 레코더를 설치하지 않습니다. 라이브러리를 임베딩하는
//! 애플리케이션이 익스포터를 설치한 직후 [`describe_all`]을 호출합니다.
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(procmeter_core::metrics::TRACKER_LINES_PROCESSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 카테고리 레이블 키 (charm, tier, heal, creature_damage)
pub const LABEL_CATEGORY: &str = "category";

// ─── Tracker 메트릭 ────────────────────────────────────────────────

/// Tracker: 처리된 전체 라인 수 (counter)
pub const TRACKER_LINES_PROCESSED_TOTAL: &str = "procmeter_tracker_lines_processed_total";

/// Tracker: 분류된 이벤트 수 (counter, label: category)
pub const TRACKER_EVENTS_CLASSIFIED_TOTAL: &str = "procmeter_tracker_events_classified_total";

/// Tracker: 쿨다운을 통과해 집계된 이벤트 수 (counter, label: category)
pub const TRACKER_EVENTS_ACCEPTED_TOTAL: &str = "procmeter_tracker_events_accepted_total";

/// Tracker: 쿨다운으로 억제된 이벤트 수 (counter, label: category)
pub const TRACKER_EVENTS_SUPPRESSED_TOTAL: &str = "procmeter_tracker_events_suppressed_total";

/// Tracker: 억제 규칙에 매칭되어 버려진 라인 수 (counter)
pub const TRACKER_RULE_SUPPRESSED_TOTAL: &str = "procmeter_tracker_rule_suppressed_total";

/// Tracker: 키 리셋 횟수 (counter)
pub const TRACKER_RESETS_TOTAL: &str = "procmeter_tracker_resets_total";

/// Tracker: 키 상한 초과로 버려진 이벤트 수 (counter)
pub const TRACKER_KEYS_DROPPED_TOTAL: &str = "procmeter_tracker_keys_dropped_total";

/// Tracker: 현재 추적 중인 키 수 (gauge)
pub const TRACKER_TRACKED_KEYS: &str = "procmeter_tracker_tracked_keys";

/// Tracker: 라인 하나의 처리 지연 시간 (histogram, 초)
pub const TRACKER_PROCESSING_DURATION_SECONDS: &str =
    "procmeter_tracker_processing_duration_seconds";

// ─── Collector 메트릭 ──────────────────────────────────────────────

/// Collector: 파일에서 읽은 라인 수 (counter)
pub const COLLECTOR_LINES_READ_TOTAL: &str = "procmeter_collector_lines_read_total";

/// Collector: 파일 잘림(truncation) 감지 횟수 (counter)
pub const COLLECTOR_TRUNCATIONS_TOTAL: &str = "procmeter_collector_truncations_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
///
/// ```ignore
/// metrics_exporter_prometheus::PrometheusBuilder::new().install()?;
/// procmeter_core::metrics::describe_all();
/// ```
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Tracker
    describe_counter!(
        TRACKER_LINES_PROCESSED_TOTAL,
        "Total number of log lines fed to the tracker"
    );
    describe_counter!(
        TRACKER_EVENTS_CLASSIFIED_TOTAL,
        "Total number of lines classified per category"
    );
    describe_counter!(
        TRACKER_EVENTS_ACCEPTED_TOTAL,
        "Total number of classified events admitted by the cooldown gate"
    );
    describe_counter!(
        TRACKER_EVENTS_SUPPRESSED_TOTAL,
        "Total number of classified events rejected by the cooldown gate"
    );
    describe_counter!(
        TRACKER_RULE_SUPPRESSED_TOTAL,
        "Total number of lines matched by a suppressing rule"
    );
    describe_counter!(TRACKER_RESETS_TOTAL, "Total number of key resets");
    describe_counter!(
        TRACKER_KEYS_DROPPED_TOTAL,
        "Total number of events dropped because the key limit was reached"
    );
    describe_gauge!(TRACKER_TRACKED_KEYS, "Number of keys currently tracked");
    describe_histogram!(
        TRACKER_PROCESSING_DURATION_SECONDS,
        "Time to process a single log line in seconds"
    );

    // Collector
    describe_counter!(
        COLLECTOR_LINES_READ_TOTAL,
        "Total number of lines read from the watched log file"
    );
    describe_counter!(
        COLLECTOR_TRUNCATIONS_TOTAL,
        "Total number of times the watched log file was truncated"
    );
}
