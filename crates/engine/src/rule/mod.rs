//! 분류 규칙 엔진 -- 우선순위 규칙으로 로그 라인을 이벤트로 변환
//!
//! 카테고리마다 순서가 고정된 규칙 목록을 평가하여 처음 매칭된 규칙의
//! 결과를 사용합니다 (best-match가 아닌 first-match).
//!
//! # 아키텍처
//! - [`RuleClassifier`]: 규칙 관리 및 분류 코디네이터
//! - [`builtin`]: 내장 규칙 테이블과 티어 키워드
//! - [`loader`]: 사용자 YAML 규칙 파일 로딩
//! - [`matcher`]: 정규식 컴파일 및 우선순위 평가
//! - [`types`]: 규칙 데이터 구조 정의

pub mod builtin;
pub mod loader;
pub mod matcher;
pub mod types;

pub use builtin::{TIER_KEYWORDS, TierKeyword, builtin_rules};
pub use loader::{RuleFile, RuleLoader};
pub use matcher::{CompiledRule, RuleMatcher, RuleOrigin};
pub use types::{AmountPolicy, ClassificationRule, KeyTemplate, RuleGuard, RuleOutcome};

use std::path::Path;

use procmeter_core::pipeline::Classifier;
use procmeter_core::types::{Category, ClassifiedEvent};
use regex::Regex;

use crate::error::ProcEngineError;

/// 티어 라인에서 수치를 찾는 패턴
const TIER_AMOUNT_PATTERN: &str = r"(?i)(?P<amount>\d+) (?:damage|hitpoints?|mana)\b";

/// 분류 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// 이벤트로 인정됨
    Matched(ClassifiedEvent),
    /// 규칙에 매칭되었지만 억제됨 (집계 대상 아님)
    Suppressed {
        /// 매칭된 규칙 ID
        rule_id: String,
        /// 억제된 이벤트
        event: ClassifiedEvent,
    },
    /// 매칭된 규칙 없음
    NoMatch,
}

impl Classification {
    /// 인정된 이벤트만 꺼냅니다.
    pub fn into_event(self) -> Option<ClassifiedEvent> {
        match self {
            Self::Matched(event) => Some(event),
            Self::Suppressed { .. } | Self::NoMatch => None,
        }
    }
}

/// 규칙 기반 분류기
///
/// 내장 규칙과 사용자 정의 규칙을 보관하고 라인을 분류합니다.
/// 상태를 변경하지 않으므로 `&self`로 분류합니다.
///
/// # 사용 예시
/// ```ignore
/// let classifier = RuleClassifier::with_builtin_rules()?;
/// let event = classifier.classify("You heal yourself for 12 hitpoints.", Category::Heal);
/// ```
pub struct RuleClassifier {
    matcher: RuleMatcher,
    tier_amount: Regex,
}

impl RuleClassifier {
    /// 규칙이 없는 분류기를 생성합니다. 티어 키워드 검색은 항상 활성입니다.
    pub fn empty() -> Result<Self, ProcEngineError> {
        let tier_amount =
            Regex::new(TIER_AMOUNT_PATTERN).map_err(|e| ProcEngineError::RuleValidation {
                rule_id: "tier_amount".to_owned(),
                reason: format!("invalid regex: {e}"),
            })?;
        Ok(Self {
            matcher: RuleMatcher::new(),
            tier_amount,
        })
    }

    /// 내장 규칙을 로드한 분류기를 생성합니다.
    pub fn with_builtin_rules() -> Result<Self, ProcEngineError> {
        let mut classifier = Self::empty()?;
        for rule in builtin_rules() {
            classifier.matcher.add_rule(rule, RuleOrigin::Builtin)?;
        }
        Ok(classifier)
    }

    /// 사용자 정의 규칙을 추가합니다.
    ///
    /// 같은 카테고리의 내장 규칙보다 먼저 평가됩니다.
    pub fn add_custom_rule(&mut self, rule: ClassificationRule) -> Result<(), ProcEngineError> {
        tracing::debug!(rule_id = %rule.id, category = %rule.category, "adding custom rule");
        self.matcher.add_rule(rule, RuleOrigin::Custom)
    }

    /// YAML 파일에서 사용자 정의 규칙을 로드합니다.
    pub async fn load_custom_rules(
        &mut self,
        path: impl AsRef<Path>,
    ) -> Result<usize, ProcEngineError> {
        let rules = RuleLoader::load_file(path).await?;
        let count = rules.len();
        for rule in rules {
            self.add_custom_rule(rule)?;
        }
        Ok(count)
    }

    /// 규칙을 제거합니다.
    pub fn remove_rule(&mut self, rule_id: &str) -> Option<ClassificationRule> {
        self.matcher.remove_rule(rule_id)
    }

    /// 카테고리의 정규식 규칙을 우선순위 순서로 반환합니다.
    pub fn rules(&self, category: Category) -> &[CompiledRule] {
        self.matcher.rules(category)
    }

    /// 현재 로드된 정규식 규칙 수
    pub fn rule_count(&self) -> usize {
        self.matcher.len()
    }

    /// 라인을 카테고리 규칙으로 평가합니다.
    pub fn evaluate(&self, line: &str, category: Category) -> Classification {
        let line = strip_timestamp(line.trim_end());

        if let Some(hit) = self.matcher.first_match(line, category) {
            return match hit.rule.outcome() {
                RuleOutcome::Emit => Classification::Matched(hit.event),
                RuleOutcome::Suppress => {
                    tracing::debug!(
                        rule_id = %hit.rule.rule.id,
                        key = %hit.event.key,
                        value = hit.event.value,
                        "classified but suppressed"
                    );
                    Classification::Suppressed {
                        rule_id: hit.rule.rule.id.clone(),
                        event: hit.event,
                    }
                }
            };
        }

        if category == Category::Tier {
            if let Some(event) = self.match_tier_keyword(line) {
                return Classification::Matched(event);
            }
        }

        tracing::trace!(category = %category, line, "no rule matched");
        Classification::NoMatch
    }

    /// 티어 키워드 검색
    ///
    /// 참 주석이 붙은 라인은 참 카테고리 몫이므로 건너뜁니다.
    fn match_tier_keyword(&self, line: &str) -> Option<ClassifiedEvent> {
        if types::has_charm_annotation(line) {
            return None;
        }

        let lower = line.to_lowercase();
        let tier = TIER_KEYWORDS.iter().find(|tier| {
            lower.contains(tier.keyword)
                && (!tier.requires_local_attack
                    || types::is_local_actor(line)
                    || lower.contains(&format!("your {}", tier.keyword)))
        })?;

        let value = self
            .tier_amount
            .captures(line)
            .and_then(|caps| caps.name(matcher::AMOUNT_GROUP))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0);

        Some(ClassifiedEvent::new(Category::Tier, tier.name, value))
    }
}

impl Classifier for RuleClassifier {
    fn name(&self) -> &str {
        "rule-classifier"
    }

    fn classify(&self, line: &str, category: Category) -> Option<ClassifiedEvent> {
        self.evaluate(line, category).into_event()
    }
}

/// 선행 클라이언트 타임스탬프(`HH:MM` 또는 `HH:MM:SS` + 공백)를 제거합니다.
pub fn strip_timestamp(line: &str) -> &str {
    let bytes = line.as_bytes();
    let digits = |from: usize, count: usize| {
        bytes.len() >= from + count && bytes[from..from + count].iter().all(u8::is_ascii_digit)
    };

    // HH:MM 또는 H:MM
    let hour_len = if digits(0, 2) {
        2
    } else if digits(0, 1) {
        1
    } else {
        return line;
    };
    if bytes.get(hour_len) != Some(&b':') || !digits(hour_len + 1, 2) {
        return line;
    }
    let mut end = hour_len + 3;

    // 선택적 :SS
    if bytes.get(end) == Some(&b':') && digits(end + 1, 2) {
        end += 3;
    }

    match bytes.get(end) {
        Some(b' ') => line[end..].trim_start(),
        _ => line,
    }
}
