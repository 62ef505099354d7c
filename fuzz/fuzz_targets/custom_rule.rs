#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use procmeter_core::types::Category;
use procmeter_engine::rule::{AmountPolicy, ClassificationRule, RuleGuard, RuleOutcome};
use procmeter_engine::RuleClassifier;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    category: FuzzCategory,
    pattern: String,
    key: String,
    guard: Option<FuzzGuard>,
    amount_required: bool,
    suppress: bool,
    /// 평가할 라인 (최대 8개로 제한)
    lines: Vec<String>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzCategory {
    Charm,
    Tier,
    Heal,
    CreatureDamage,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzGuard {
    LocalActor,
    NotReflexive,
    NoCharmAnnotation,
}

impl From<FuzzCategory> for Category {
    fn from(c: FuzzCategory) -> Self {
        match c {
            FuzzCategory::Charm => Category::Charm,
            FuzzCategory::Tier => Category::Tier,
            FuzzCategory::Heal => Category::Heal,
            FuzzCategory::CreatureDamage => Category::CreatureDamage,
        }
    }
}

impl From<FuzzGuard> for RuleGuard {
    fn from(g: FuzzGuard) -> Self {
        match g {
            FuzzGuard::LocalActor => RuleGuard::LocalActor,
            FuzzGuard::NotReflexive => RuleGuard::NotReflexive,
            FuzzGuard::NoCharmAnnotation => RuleGuard::NoCharmAnnotation,
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    // 정규식 크기 제한 (성능)
    if input.pattern.len() > 256 {
        return;
    }

    let category = Category::from(input.category);
    let rule = ClassificationRule {
        id: "fuzz_rule".to_owned(),
        category,
        description: String::new(),
        pattern: input.pattern,
        key: input.key,
        guard: input.guard.map(RuleGuard::from),
        amount: if input.amount_required {
            AmountPolicy::Required
        } else {
            AmountPolicy::Optional
        },
        outcome: if input.suppress {
            RuleOutcome::Suppress
        } else {
            RuleOutcome::Emit
        },
    };

    let Ok(mut classifier) = RuleClassifier::with_builtin_rules() else {
        return;
    };

    // 컴파일이 실패해도 크래시는 안 됨
    if classifier.add_custom_rule(rule).is_err() {
        return;
    }

    for line in input.lines.iter().take(8) {
        let _ = classifier.evaluate(line, category);
    }
});
