//! 내장 분류 규칙 테이블
//!
//! 카테고리별 규칙은 우선순위 순서대로 나열되며, 처음 매칭된 규칙이 결과를 결정합니다.
//! 여러 규칙이 의도적으로 겹치므로 (일반 패턴이 구체적 패턴의 부분 문자열),
//! 더 구체적인 규칙이 항상 앞에 옵니다.
//!
//! 패턴은 선행 타임스탬프(`HH:MM` / `HH:MM:SS`)가 제거된 라인에 적용됩니다.

use procmeter_core::types::Category;

use super::types::{AmountPolicy, ClassificationRule, RuleGuard, RuleOutcome};

/// 정적 규칙 정의
struct BuiltinRule {
    id: &'static str,
    category: Category,
    description: &'static str,
    pattern: &'static str,
    key: &'static str,
    guard: Option<RuleGuard>,
    amount: AmountPolicy,
    outcome: RuleOutcome,
}

/// 내장 정규식 규칙 (카테고리 내 우선순위 순서)
const BUILTIN_RULES: &[BuiltinRule] = &[
    // ─── Charm ─────────────────────────────────────────────────────
    // 피해를 준 참. 수치가 있으므로 일반 발동 규칙보다 먼저.
    BuiltinRule {
        id: "charm_damage",
        category: Category::Charm,
        description: "damage dealt by a charm",
        pattern: r"^You deal (?P<amount>\d+) (?:damage|hitpoints?)\b.*\((?P<charm>[^()]+?) charm\)",
        key: "{charm:title}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 참이 회복시킨 체력/마나.
    BuiltinRule {
        id: "charm_resource_healed",
        category: Category::Charm,
        description: "hitpoints or mana restored by a charm",
        pattern: r"^You were healed for (?P<amount>\d+) (?:hitpoints?|mana)\b.*\((?P<charm>[^()]+?) charm\)",
        key: "{charm:title}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 참으로 얻은 마나.
    BuiltinRule {
        id: "charm_resource_gained",
        category: Category::Charm,
        description: "mana or hitpoints gained from a charm",
        pattern: r"^You gained (?P<amount>\d+) (?:mana|hitpoints?)\b.*\((?P<charm>[^()]+?) charm\)",
        key: "{charm:title}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 수치 없는 발동 (회피 등). 모든 참 주석의 부분 문자열이므로 마지막.
    BuiltinRule {
        id: "charm_activation",
        category: Category::Charm,
        description: "charm activation without an amount",
        pattern: r"\((?P<charm>[^()]+?) charm\)",
        key: "{charm:title}",
        guard: None,
        amount: AmountPolicy::Optional,
        outcome: RuleOutcome::Emit,
    },
    // ─── Heal ──────────────────────────────────────────────────────
    // 참 회복. 일반 "You were healed for N"을 포함하므로 가장 먼저.
    BuiltinRule {
        id: "heal_charm",
        category: Category::Heal,
        description: "heal attributed to a charm",
        pattern: r"^You were healed for (?P<amount>\d+) (?:hitpoints?|mana)\b.*\((?P<charm>[^()]+?) charm\)",
        key: "Charm_{charm}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 다른 플레이어에게 받은 회복.
    BuiltinRule {
        id: "heal_received",
        category: Category::Heal,
        description: "heal received from another actor",
        pattern: r"^You were healed by (?P<player>.+?) for (?P<amount>\d+) (?:hitpoints?|mana)\b",
        key: "From_{player}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 다른 플레이어에게 준 회복. "You heal yourself"도 매칭되므로 재귀 대명사는 제외.
    BuiltinRule {
        id: "heal_given",
        category: Category::Heal,
        description: "heal given to another actor",
        pattern: r"^You heal (?P<player>.+?) for (?P<amount>\d+) (?:hitpoints?|mana)\b",
        key: "To_{player}",
        guard: Some(RuleGuard::NotReflexive),
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 자가 회복.
    BuiltinRule {
        id: "heal_self",
        category: Category::Heal,
        description: "self heal",
        pattern: r"^You heal yourself for (?P<amount>\d+) (?:hitpoints?|mana)\b",
        key: "Self",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 출처 없는 회복 (임뷰먼트 등). 위 규칙들의 부분 문자열이므로 뒤에.
    BuiltinRule {
        id: "heal_generic",
        category: Category::Heal,
        description: "heal without a named source",
        pattern: r"^You were healed for (?P<amount>\d+) (?:hitpoints?|mana)\b",
        key: "Imbuement",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    // 제3자의 회복. 분류만 하고 집계하지 않음.
    BuiltinRule {
        id: "heal_other_actor",
        category: Category::Heal,
        description: "another actor was healed",
        pattern: r"^(?P<player>[^.]+?) (?:was healed|healed|heals) .*?for (?P<amount>\d+) (?:hitpoints?|mana)\b",
        key: "Other_{player}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Suppress,
    },
    // ─── CreatureDamage ────────────────────────────────────────────
    // 관사(a/an)가 있어야 크리처로 간주하므로 PvP 라인은 매칭되지 않음.
    BuiltinRule {
        id: "creature_damage_dealt_loses",
        category: Category::CreatureDamage,
        description: "creature loses hitpoints due to the local player's attack",
        pattern: r"(?i)^an? (?P<creature>.+?) loses (?P<amount>\d+) hitpoints? due to your (?:critical )?attack",
        key: "To {creature:title}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    BuiltinRule {
        id: "creature_damage_dealt_deal",
        category: Category::CreatureDamage,
        description: "local player deals damage to a creature",
        pattern: r"(?i)^You deal (?P<amount>\d+) (?:damage|hitpoints?) to an? (?P<creature>[^.(]+?)\s*(?:[.(]|$)",
        key: "To {creature:title}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    BuiltinRule {
        id: "creature_damage_received_hits",
        category: Category::CreatureDamage,
        description: "creature hits the local player",
        pattern: r"(?i)^an? (?P<creature>.+?) hits you for (?P<amount>\d+) hitpoints?",
        key: "By {creature:title}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
    BuiltinRule {
        id: "creature_damage_received_lose",
        category: Category::CreatureDamage,
        description: "local player loses hitpoints or mana to a creature",
        pattern: r"(?i)^You lose (?P<amount>\d+) (?:hitpoints?|mana) due to an attack by an? (?P<creature>[^.(]+?)\s*(?:[.(]|$)",
        key: "By {creature:title}",
        guard: None,
        amount: AmountPolicy::Required,
        outcome: RuleOutcome::Emit,
    },
];

/// 티어 키워드 -- `(키워드, 결과 이름, 로컬 공격 필요 여부)`
///
/// 정규식 대신 소문자 부분 문자열 검색으로 분류합니다. 목록 순서가 우선순위입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierKeyword {
    /// 소문자 검색 키워드
    pub keyword: &'static str,
    /// 이벤트 키 이름
    pub name: &'static str,
    /// 로컬 플레이어가 공격자일 때만 인정
    pub requires_local_attack: bool,
}

/// 내장 티어 키워드 목록
pub const TIER_KEYWORDS: &[TierKeyword] = &[
    TierKeyword {
        keyword: "critical attack",
        name: "Critical Attack",
        requires_local_attack: true,
    },
    TierKeyword {
        keyword: "perfect shot",
        name: "Perfect Shot",
        requires_local_attack: true,
    },
    TierKeyword {
        keyword: "onslaught",
        name: "Onslaught",
        requires_local_attack: true,
    },
    TierKeyword {
        keyword: "dodge",
        name: "Dodge",
        requires_local_attack: false,
    },
    TierKeyword {
        keyword: "transcendence",
        name: "Transcendence",
        requires_local_attack: false,
    },
    TierKeyword {
        keyword: "momentum",
        name: "Momentum",
        requires_local_attack: false,
    },
    TierKeyword {
        keyword: "amplification",
        name: "Amplification",
        requires_local_attack: false,
    },
];

/// 내장 정규식 규칙을 우선순위 순서대로 반환합니다.
pub fn builtin_rules() -> Vec<ClassificationRule> {
    BUILTIN_RULES
        .iter()
        .map(|rule| ClassificationRule {
            id: rule.id.to_owned(),
            category: rule.category,
            description: rule.description.to_owned(),
            pattern: rule.pattern.to_owned(),
            key: rule.key.to_owned(),
            guard: rule.guard,
            amount: rule.amount,
            outcome: rule.outcome,
        })
        .collect()
}
