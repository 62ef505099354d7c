#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::time::{Duration, SystemTime};

use procmeter_core::types::{Category, EventKey};
use procmeter_engine::TrackerBuilder;

#[derive(Arbitrary, Debug)]
enum Step {
    /// 이전 라인으로부터 `delta_ms` 후에 라인 처리
    Line { text: String, delta_ms: u16 },
    /// 키 하나 리셋
    Reset { name: String },
    /// 전체 리셋
    ResetAll,
    /// 만료 항목 정리
    Cleanup,
}

fuzz_target!(|steps: Vec<Step>| {
    let Ok(mut tracker) = TrackerBuilder::new().build() else {
        return;
    };
    let mut now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);

    for step in steps.into_iter().take(64) {
        match step {
            Step::Line { text, delta_ms } => {
                now += Duration::from_millis(u64::from(delta_ms));
                for snapshot in tracker.process_line_at(&text, now) {
                    let record = &snapshot.record;
                    assert!(record.count >= 1);
                    assert!(record.min_value <= record.max_value);
                    assert!(record.max_value <= record.total);
                }
            }
            Step::Reset { name } => {
                for category in Category::ALL {
                    tracker.reset_at(&EventKey::new(category, name.clone()), now);
                }
            }
            Step::ResetAll => {
                tracker.reset_all_at(now);
            }
            Step::Cleanup => {
                tracker.cleanup_expired(now);
            }
        }
    }

    let stats = tracker.tracker_stats();
    assert!(stats.events_accepted + stats.events_suppressed + stats.keys_dropped
        <= stats.events_classified);
});
