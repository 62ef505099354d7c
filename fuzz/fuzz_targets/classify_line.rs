#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

use procmeter_core::types::Category;
use procmeter_engine::RuleClassifier;

static CLASSIFIER: OnceLock<Option<RuleClassifier>> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    // 게임 로그는 손상된 바이트를 포함할 수 있으므로 손실 변환
    let line = String::from_utf8_lossy(data);

    let Some(classifier) = CLASSIFIER
        .get_or_init(|| RuleClassifier::with_builtin_rules().ok())
        .as_ref()
    else {
        return;
    };

    for category in Category::ALL {
        let _ = classifier.evaluate(&line, category);
    }
});
