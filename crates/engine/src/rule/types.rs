//! 분류 규칙 데이터 타입
//!
//! 내장 규칙 테이블과 사용자 YAML 규칙 파일이 공유하는 구조체를 정의합니다.

use std::fmt;

use procmeter_core::types::Category;
use regex::Captures;
use serde::{Deserialize, Serialize};

use crate::error::ProcEngineError;

/// 규칙 ID 최대 길이
const MAX_RULE_ID_LEN: usize = 256;

/// 분류 규칙 -- 하나의 패턴과 그 결과 키를 정의합니다.
///
/// # YAML 스키마
/// ```yaml
/// id: heal_from_totem
/// category: heal
/// description: Healing totem ticks
/// pattern: '^You were healed by (?P<totem>\w+) totem for (?P<amount>\d+) hitpoints?'
/// key: "Totem_{totem:title}"
/// amount: required
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// 규칙 고유 ID
    pub id: String,
    /// 규칙이 속한 카테고리
    pub category: Category,
    /// 규칙 설명 (우선순위 이유 등)
    #[serde(default)]
    pub description: String,
    /// 정규식 패턴 (이름 있는 캡처 그룹 사용)
    pub pattern: String,
    /// 키 이름 템플릿 (`{group}` 또는 `{group:title}`)
    pub key: String,
    /// 추가 조건
    #[serde(default)]
    pub guard: Option<RuleGuard>,
    /// 수치 추출 정책
    #[serde(default)]
    pub amount: AmountPolicy,
    /// 매칭 시 결과
    #[serde(default)]
    pub outcome: RuleOutcome,
}

impl ClassificationRule {
    /// 정규식과 무관한 필드의 유효성을 검증합니다.
    ///
    /// 패턴 컴파일과 캡처 그룹 참조 검증은 [`RuleMatcher`](super::RuleMatcher)가 수행합니다.
    pub fn validate(&self) -> Result<(), ProcEngineError> {
        if self.id.trim().is_empty() {
            return Err(ProcEngineError::RuleValidation {
                rule_id: "(empty)".to_owned(),
                reason: "rule id must not be empty".to_owned(),
            });
        }

        if self.id.len() > MAX_RULE_ID_LEN {
            return Err(ProcEngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: format!("rule id must not exceed {MAX_RULE_ID_LEN} characters"),
            });
        }

        if self.pattern.is_empty() {
            return Err(ProcEngineError::RuleValidation {
                rule_id: self.id.clone(),
                reason: "pattern must not be empty".to_owned(),
            });
        }

        KeyTemplate::parse(&self.key).map_err(|reason| ProcEngineError::RuleValidation {
            rule_id: self.id.clone(),
            reason,
        })?;

        Ok(())
    }
}

/// 규칙 추가 조건
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleGuard {
    /// 로컬 플레이어가 행위자인 라인만 ("You ..." 또는 "your attack")
    LocalActor,
    /// `player` 캡처가 재귀 대명사(yourself 등)가 아닐 때만
    NotReflexive,
    /// 참 주석 `(x charm)`이 없는 라인만
    NoCharmAnnotation,
}

impl RuleGuard {
    /// 조건을 평가합니다.
    pub fn holds(&self, line: &str, captures: Option<&Captures<'_>>) -> bool {
        match self {
            Self::LocalActor => is_local_actor(line),
            Self::NotReflexive => captures
                .and_then(|caps| caps.name("player"))
                .is_none_or(|player| !is_reflexive(player.as_str())),
            Self::NoCharmAnnotation => !has_charm_annotation(line),
        }
    }
}

/// 로컬 플레이어가 행위자인지 여부
///
/// "You ..."로 시작하거나 "due to your ..." / "your attack"처럼
/// 로컬 플레이어의 공격이 원인인 라인입니다.
pub(crate) fn is_local_actor(line: &str) -> bool {
    if line.starts_with("You ") {
        return true;
    }
    let lower = line.to_lowercase();
    lower.contains("due to your ") || lower.contains("your attack")
}

/// 라인에 `(x charm)` 주석이 있는지 여부
pub(crate) fn has_charm_annotation(line: &str) -> bool {
    line.to_lowercase().contains(" charm)")
}

fn is_reflexive(word: &str) -> bool {
    matches!(
        word.trim().to_lowercase().as_str(),
        "yourself" | "himself" | "herself" | "itself" | "themselves"
    )
}

/// 수치 추출 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountPolicy {
    /// 패턴에 `amount` 그룹이 반드시 있어야 함 (파싱 실패 시 0, debug 로그)
    Required,
    /// `amount` 그룹이 없거나 비어 있으면 0 (기본값)
    #[default]
    Optional,
}

/// 매칭 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOutcome {
    /// 이벤트 생성 (기본값)
    #[default]
    Emit,
    /// 분류는 하지만 이벤트를 생성하지 않음 (debug 로그 후 "매칭 없음")
    Suppress,
}

/// 키 템플릿 구성 요소
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture { group: String, title: bool },
}

/// 키 이름 템플릿
///
/// `"To_{player}"`, `"By {creature:title}"`처럼 리터럴과 캡처 그룹 참조를 섞어
/// 이벤트 키 이름을 만듭니다. `:title` 수정자는 단어별 첫 글자를 대문자로 바꿉니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTemplate {
    segments: Vec<Segment>,
}

impl KeyTemplate {
    /// 템플릿 문자열을 파싱합니다.
    pub fn parse(template: &str) -> Result<Self, String> {
        if template.trim().is_empty() {
            return Err("key template must not be empty".to_owned());
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars();

        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    let mut inner = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        inner.push(c);
                    }
                    if !closed {
                        return Err(format!("unclosed '{{' in key template '{template}'"));
                    }

                    let (group, modifier) = match inner.split_once(':') {
                        Some((group, modifier)) => (group.trim(), Some(modifier.trim())),
                        None => (inner.trim(), None),
                    };
                    if group.is_empty() {
                        return Err(format!("empty capture reference in key template '{template}'"));
                    }
                    let title = match modifier {
                        None | Some("raw") => false,
                        Some("title") => true,
                        Some(other) => {
                            return Err(format!("unknown key template modifier '{other}'"));
                        }
                    };

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Capture {
                        group: group.to_owned(),
                        title,
                    });
                }
                '}' => return Err(format!("unmatched '}}' in key template '{template}'")),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// 템플릿이 참조하는 캡처 그룹 이름 목록
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Capture { group, .. } => Some(group.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// 캡처 결과로 키 이름을 만듭니다.
    ///
    /// 매칭에 참여하지 않은 그룹은 빈 문자열로 치환됩니다.
    pub fn render(&self, captures: Option<&Captures<'_>>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Capture { group, title } => {
                    let value = captures
                        .and_then(|caps| caps.name(group))
                        .map(|m| m.as_str().trim())
                        .unwrap_or_default();
                    if *title {
                        out.push_str(&title_case(value));
                    } else {
                        out.push_str(value);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Capture { group, title: true } => write!(f, "{{{group}:title}}")?,
                Segment::Capture { group, title: false } => write!(f, "{{{group}}}")?,
            }
        }
        Ok(())
    }
}

/// 단어별 첫 글자를 대문자로, 나머지를 소문자로 바꿉니다.
///
/// `"low blow"` -> `"Low Blow"`, `"void's call"` -> `"Void's Call"`
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn sample_rule() -> ClassificationRule {
        ClassificationRule {
            id: "test_rule".to_owned(),
            category: Category::Heal,
            description: String::new(),
            pattern: r"^You heal (?P<player>.+?) for (?P<amount>\d+)".to_owned(),
            key: "To_{player}".to_owned(),
            guard: Some(RuleGuard::NotReflexive),
            amount: AmountPolicy::Required,
            outcome: RuleOutcome::Emit,
        }
    }

    #[test]
    fn valid_rule_passes_validation() {
        sample_rule().validate().unwrap();
    }

    #[test]
    fn empty_id_fails_validation() {
        let mut rule = sample_rule();
        rule.id = "  ".to_owned();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn too_long_id_fails_validation() {
        let mut rule = sample_rule();
        rule.id = "x".repeat(300);
        assert!(rule.validate().is_err());
    }

    #[test]
    fn empty_pattern_fails_validation() {
        let mut rule = sample_rule();
        rule.pattern = String::new();
        assert!(rule.validate().is_err());
    }

    #[test]
    fn bad_template_fails_validation() {
        let mut rule = sample_rule();
        rule.key = "To_{player".to_owned();
        let err = rule.validate().unwrap_err();
        assert!(err.to_string().contains("unclosed"));
    }

    #[test]
    fn defaults_are_optional_and_emit() {
        assert_eq!(AmountPolicy::default(), AmountPolicy::Optional);
        assert_eq!(RuleOutcome::default(), RuleOutcome::Emit);
    }

    #[test]
    fn template_parse_literal_only() {
        let template = KeyTemplate::parse("Self").unwrap();
        assert_eq!(template.groups().count(), 0);
        assert_eq!(template.render(None), "Self");
    }

    #[test]
    fn template_renders_captures() {
        let re = Regex::new(r"(?P<player>\w+ \w+) and (?P<creature>.+)").unwrap();
        let caps = re.captures("Test Player and giant spider").unwrap();

        let raw = KeyTemplate::parse("To_{player}").unwrap();
        assert_eq!(raw.render(Some(&caps)), "To_Test Player");

        let titled = KeyTemplate::parse("By {creature:title}").unwrap();
        assert_eq!(titled.render(Some(&caps)), "By Giant Spider");
    }

    #[test]
    fn template_missing_group_renders_empty() {
        let template = KeyTemplate::parse("X_{missing}").unwrap();
        assert_eq!(template.render(None), "X_");
    }

    #[test]
    fn template_rejects_unknown_modifier() {
        assert!(KeyTemplate::parse("{name:upper}").is_err());
    }

    #[test]
    fn template_rejects_stray_closing_brace() {
        assert!(KeyTemplate::parse("name}").is_err());
    }

    #[test]
    fn template_display_roundtrips() {
        let source = "Charm_{charm} / {creature:title}";
        let template = KeyTemplate::parse(source).unwrap();
        assert_eq!(template.to_string(), source);
    }

    #[test]
    fn title_case_words() {
        assert_eq!(title_case("low blow"), "Low Blow");
        assert_eq!(title_case("Ruse"), "Ruse");
        assert_eq!(title_case("VOID's CALL"), "Void's Call");
        assert_eq!(title_case("  giant   spider "), "Giant Spider");
    }

    #[test]
    fn local_actor_guard() {
        assert!(RuleGuard::LocalActor.holds("You deal 10 damage. (critical attack)", None));
        assert!(RuleGuard::LocalActor.holds("A rat loses 5 hitpoints due to your attack.", None));
        assert!(!RuleGuard::LocalActor.holds("Knight deals a critical attack.", None));
        assert!(RuleGuard::LocalActor.holds(
            "A dragon loses 512 hitpoints due to your critical attack.",
            None
        ));
        assert!(!RuleGuard::LocalActor.holds(
            "A dragon loses 512 hitpoints due to an attack by Knight.",
            None
        ));
    }

    #[test]
    fn not_reflexive_guard() {
        let re = Regex::new(r"^You heal (?P<player>.+?) for").unwrap();
        let caps = re.captures("You heal yourself for 10").unwrap();
        assert!(!RuleGuard::NotReflexive.holds("", Some(&caps)));
        let caps = re.captures("You heal Druid for 10").unwrap();
        assert!(RuleGuard::NotReflexive.holds("", Some(&caps)));
    }

    #[test]
    fn charm_annotation_guard() {
        assert!(!RuleGuard::NoCharmAnnotation.holds("You dodged an attack. (Ruse charm)", None));
        assert!(RuleGuard::NoCharmAnnotation.holds("You dodged an attack.", None));
    }

    #[test]
    fn rule_from_yaml() {
        let yaml = r#"
id: heal_totem
category: heal
pattern: '^You were healed by (?P<totem>\w+) totem for (?P<amount>\d+)'
key: "Totem_{totem:title}"
amount: required
"#;
        let rule: ClassificationRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.id, "heal_totem");
        assert_eq!(rule.category, Category::Heal);
        assert_eq!(rule.amount, AmountPolicy::Required);
        assert_eq!(rule.outcome, RuleOutcome::Emit);
        assert!(rule.guard.is_none());
    }

    #[test]
    fn rule_serialization_roundtrip() {
        let rule = sample_rule();
        let yaml = serde_yaml::to_string(&rule).unwrap();
        let parsed: ClassificationRule = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, rule);
    }
}
