//! 규칙 매칭 로직 -- 정규식 사전 컴파일 및 우선순위 평가
//!
//! [`RuleMatcher`]는 카테고리별 규칙 목록을 우선순위 순서로 보관합니다.
//! 정규식 패턴은 규칙 추가 시 한 번만 컴파일하여 캐싱합니다.

use std::collections::{HashMap, HashSet};

use procmeter_core::types::{Category, ClassifiedEvent};
use regex::{Captures, Regex};

use super::types::{AmountPolicy, ClassificationRule, KeyTemplate, RuleOutcome};
use crate::error::ProcEngineError;

/// 수치 캡처 그룹 이름
pub const AMOUNT_GROUP: &str = "amount";

/// 규칙 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOrigin {
    /// 내장 규칙
    Builtin,
    /// 사용자 정의 규칙
    Custom,
}

/// 컴파일된 규칙
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// 원본 규칙 정의
    pub rule: ClassificationRule,
    /// 출처
    pub origin: RuleOrigin,
    regex: Regex,
    template: KeyTemplate,
}

impl CompiledRule {
    /// 규칙을 검증하고 컴파일합니다.
    pub fn compile(rule: ClassificationRule, origin: RuleOrigin) -> Result<Self, ProcEngineError> {
        rule.validate()?;

        let regex = Regex::new(&rule.pattern).map_err(|e| ProcEngineError::RuleValidation {
            rule_id: rule.id.clone(),
            reason: format!("invalid regex: {e}"),
        })?;

        let template =
            KeyTemplate::parse(&rule.key).map_err(|reason| ProcEngineError::RuleValidation {
                rule_id: rule.id.clone(),
                reason,
            })?;

        let groups: HashSet<&str> = regex.capture_names().flatten().collect();
        for group in template.groups() {
            if !groups.contains(group) {
                return Err(ProcEngineError::RuleValidation {
                    rule_id: rule.id.clone(),
                    reason: format!("key template references unknown capture group '{group}'"),
                });
            }
        }

        if rule.amount == AmountPolicy::Required && !groups.contains(AMOUNT_GROUP) {
            return Err(ProcEngineError::RuleValidation {
                rule_id: rule.id.clone(),
                reason: format!("amount is required but pattern has no '{AMOUNT_GROUP}' group"),
            });
        }

        Ok(Self {
            rule,
            origin,
            regex,
            template,
        })
    }

    /// 라인을 평가합니다. 패턴과 조건이 모두 맞으면 키 이름과 수치를 반환합니다.
    pub fn evaluate(&self, line: &str) -> Option<(String, u64)> {
        let caps = self.regex.captures(line)?;

        if let Some(guard) = self.rule.guard {
            if !guard.holds(line, Some(&caps)) {
                tracing::trace!(rule_id = %self.rule.id, ?guard, "guard rejected match");
                return None;
            }
        }

        let name = self.template.render(Some(&caps));
        let value = self.extract_amount(&caps);
        Some((name, value))
    }

    /// 매칭 결과의 처리 방식
    pub fn outcome(&self) -> RuleOutcome {
        self.rule.outcome
    }

    fn extract_amount(&self, caps: &Captures<'_>) -> u64 {
        let Some(raw) = caps.name(AMOUNT_GROUP) else {
            return 0;
        };
        match raw.as_str().parse::<u64>() {
            Ok(value) => value,
            Err(e) => {
                if self.rule.amount == AmountPolicy::Required {
                    tracing::debug!(
                        rule_id = %self.rule.id,
                        raw = raw.as_str(),
                        error = %e,
                        "unparseable amount, using 0"
                    );
                }
                0
            }
        }
    }
}

/// 규칙 매처 -- 카테고리별 우선순위 목록
///
/// 사용자 정의 규칙은 같은 카테고리의 내장 규칙보다 앞에 삽입되며,
/// 사용자 정의 규칙끼리는 추가된 순서를 유지합니다.
pub struct RuleMatcher {
    rules: HashMap<Category, Vec<CompiledRule>>,
    ids: HashSet<String>,
}

impl RuleMatcher {
    /// 새 매처를 생성합니다.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
            ids: HashSet::new(),
        }
    }

    /// 규칙을 컴파일하여 추가합니다.
    pub fn add_rule(
        &mut self,
        rule: ClassificationRule,
        origin: RuleOrigin,
    ) -> Result<(), ProcEngineError> {
        if self.ids.contains(&rule.id) {
            return Err(ProcEngineError::RuleValidation {
                rule_id: rule.id,
                reason: "duplicate rule id".to_owned(),
            });
        }

        let compiled = CompiledRule::compile(rule, origin)?;
        self.ids.insert(compiled.rule.id.clone());

        let list = self.rules.entry(compiled.rule.category).or_default();
        match origin {
            RuleOrigin::Builtin => list.push(compiled),
            RuleOrigin::Custom => {
                let pos = list
                    .iter()
                    .position(|r| r.origin == RuleOrigin::Builtin)
                    .unwrap_or(list.len());
                list.insert(pos, compiled);
            }
        }
        Ok(())
    }

    /// 규칙을 제거합니다.
    pub fn remove_rule(&mut self, rule_id: &str) -> Option<ClassificationRule> {
        if !self.ids.remove(rule_id) {
            return None;
        }
        for list in self.rules.values_mut() {
            if let Some(pos) = list.iter().position(|r| r.rule.id == rule_id) {
                return Some(list.remove(pos).rule);
            }
        }
        None
    }

    /// 카테고리의 규칙을 우선순위 순서로 반환합니다.
    pub fn rules(&self, category: Category) -> &[CompiledRule] {
        self.rules.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    /// 전체 규칙 수
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// 규칙이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// 카테고리의 규칙을 우선순위대로 평가하고 처음 매칭된 규칙을 반환합니다.
    pub fn first_match(&self, line: &str, category: Category) -> Option<RuleHit<'_>> {
        self.rules(category).iter().find_map(|rule| {
            rule.evaluate(line).map(|(name, value)| RuleHit {
                rule,
                event: ClassifiedEvent::new(category, name, value),
            })
        })
    }
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 규칙 매칭 결과
#[derive(Debug)]
pub struct RuleHit<'a> {
    /// 매칭된 규칙
    pub rule: &'a CompiledRule,
    /// 생성된 이벤트
    pub event: ClassifiedEvent,
}

#[cfg(test)]
mod tests {
    use super::super::types::RuleGuard;
    use super::*;

    fn make_rule(id: &str, pattern: &str, key: &str) -> ClassificationRule {
        ClassificationRule {
            id: id.to_owned(),
            category: Category::Heal,
            description: String::new(),
            pattern: pattern.to_owned(),
            key: key.to_owned(),
            guard: None,
            amount: AmountPolicy::Optional,
            outcome: RuleOutcome::Emit,
        }
    }

    #[test]
    fn invalid_regex_fails_compilation() {
        let rule = make_rule("bad", r"[invalid", "X");
        assert!(CompiledRule::compile(rule, RuleOrigin::Custom).is_err());
    }

    #[test]
    fn unknown_template_group_fails_compilation() {
        let rule = make_rule("bad", r"^You heal (?P<player>\w+)", "To_{target}");
        let err = CompiledRule::compile(rule, RuleOrigin::Custom).unwrap_err();
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn required_amount_without_group_fails() {
        let mut rule = make_rule("bad", r"^You heal", "Self");
        rule.amount = AmountPolicy::Required;
        assert!(CompiledRule::compile(rule, RuleOrigin::Custom).is_err());
    }

    #[test]
    fn evaluate_extracts_name_and_amount() {
        let rule = make_rule("ok", r"^You heal (?P<player>\w+) for (?P<amount>\d+)", "To_{player}");
        let compiled = CompiledRule::compile(rule, RuleOrigin::Custom).unwrap();
        assert_eq!(
            compiled.evaluate("You heal Druid for 42 hitpoints."),
            Some(("To_Druid".to_owned(), 42))
        );
    }

    #[test]
    fn overflowing_amount_degrades_to_zero() {
        let mut rule = make_rule("ok", r"for (?P<amount>\d+)", "Big");
        rule.amount = AmountPolicy::Required;
        let compiled = CompiledRule::compile(rule, RuleOrigin::Custom).unwrap();
        assert_eq!(
            compiled.evaluate("for 99999999999999999999999"),
            Some(("Big".to_owned(), 0))
        );
    }

    #[test]
    fn missing_optional_amount_is_zero() {
        let rule = make_rule("ok", r"dodged(?: (?P<amount>\d+))?", "Dodge");
        let compiled = CompiledRule::compile(rule, RuleOrigin::Custom).unwrap();
        assert_eq!(compiled.evaluate("You dodged."), Some(("Dodge".to_owned(), 0)));
    }

    #[test]
    fn guard_blocks_match() {
        let mut rule = make_rule("g", r"^You heal (?P<player>\w+)", "To_{player}");
        rule.guard = Some(RuleGuard::NotReflexive);
        let compiled = CompiledRule::compile(rule, RuleOrigin::Custom).unwrap();
        assert!(compiled.evaluate("You heal yourself").is_none());
        assert!(compiled.evaluate("You heal Druid").is_some());
    }

    #[test]
    fn first_match_wins() {
        let mut matcher = RuleMatcher::new();
        matcher
            .add_rule(make_rule("specific", r"healed for \d+ .*charm", "Charm"), RuleOrigin::Builtin)
            .unwrap();
        matcher
            .add_rule(make_rule("generic", r"healed for \d+", "Generic"), RuleOrigin::Builtin)
            .unwrap();

        let hit = matcher
            .first_match("You were healed for 5 hitpoints. (x charm)", Category::Heal)
            .unwrap();
        assert_eq!(hit.rule.rule.id, "specific");
        assert_eq!(hit.event.key.name, "Charm");
    }

    #[test]
    fn custom_rules_precede_builtins_in_insertion_order() {
        let mut matcher = RuleMatcher::new();
        matcher
            .add_rule(make_rule("builtin", r"x", "B"), RuleOrigin::Builtin)
            .unwrap();
        matcher
            .add_rule(make_rule("custom_1", r"x", "C1"), RuleOrigin::Custom)
            .unwrap();
        matcher
            .add_rule(make_rule("custom_2", r"x", "C2"), RuleOrigin::Custom)
            .unwrap();

        let ids: Vec<_> = matcher
            .rules(Category::Heal)
            .iter()
            .map(|r| r.rule.id.as_str())
            .collect();
        assert_eq!(ids, vec!["custom_1", "custom_2", "builtin"]);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut matcher = RuleMatcher::new();
        matcher
            .add_rule(make_rule("same", r"x", "A"), RuleOrigin::Builtin)
            .unwrap();
        let err = matcher
            .add_rule(make_rule("same", r"y", "B"), RuleOrigin::Custom)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn remove_rule_cleans_up() {
        let mut matcher = RuleMatcher::new();
        matcher
            .add_rule(make_rule("gone", r"x", "A"), RuleOrigin::Custom)
            .unwrap();
        assert_eq!(matcher.len(), 1);
        assert!(matcher.remove_rule("gone").is_some());
        assert!(matcher.is_empty());
        assert!(matcher.rules(Category::Heal).is_empty());
        assert!(matcher.remove_rule("gone").is_none());
    }

    #[test]
    fn no_rules_for_category_is_empty_slice() {
        let matcher = RuleMatcher::new();
        assert!(matcher.rules(Category::Tier).is_empty());
        assert!(matcher.first_match("anything", Category::Tier).is_none());
    }
}
