#![no_main]

use libfuzzer_sys::fuzz_target;
use procmeter_engine::rule::RuleLoader;
use procmeter_engine::RuleClassifier;

fuzz_target!(|data: &[u8]| {
    // YAML 파서는 &str을 받으므로 UTF-8 변환 필요
    let Ok(yaml_str) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(rules) = RuleLoader::parse_yaml(yaml_str, "fuzz-input.yml") else {
        return;
    };

    // 파싱된 규칙의 컴파일도 크래시 없이 Ok/Err 반환해야 함
    let Ok(mut classifier) = RuleClassifier::empty() else {
        return;
    };
    for rule in rules {
        let _ = classifier.add_custom_rule(rule);
    }
});
