//! 규칙 파일 로더 -- 사용자 정의 YAML 규칙 파일을 디스크에서 로드합니다.
//!
//! # 파일 형식
//! ```yaml
//! rules:
//!   - id: heal_totem
//!     category: heal
//!     pattern: '^You were healed by (?P<totem>\w+) totem for (?P<amount>\d+)'
//!     key: "Totem_{totem:title}"
//!     amount: required
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProcEngineError;

use super::types::ClassificationRule;

const MAX_RULE_FILE_SIZE: u64 = 1024 * 1024; // 1MB
const MAX_RULES_COUNT: usize = 1_000;

/// 규칙 파일 최상위 구조
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    /// 규칙 목록 (파일 내 순서가 우선순위)
    #[serde(default)]
    pub rules: Vec<ClassificationRule>,
}

/// 규칙 파일 로더
pub struct RuleLoader;

impl RuleLoader {
    /// YAML 규칙 파일을 로드합니다.
    ///
    /// # Errors
    /// - 파일을 읽을 수 없거나 크기 제한을 넘는 경우
    /// - YAML 파싱 또는 규칙 검증에 실패한 경우
    pub async fn load_file(
        path: impl AsRef<Path>,
    ) -> Result<Vec<ClassificationRule>, ProcEngineError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ProcEngineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(ProcEngineError::RuleLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ProcEngineError::RuleLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let rules = Self::parse_yaml(&content, &path.display().to_string())?;

        tracing::info!(
            path = %path.display(),
            count = rules.len(),
            "loaded custom rules"
        );

        Ok(rules)
    }

    /// YAML 문자열을 파싱하여 규칙 목록을 생성합니다.
    pub fn parse_yaml(
        yaml_str: &str,
        source: &str,
    ) -> Result<Vec<ClassificationRule>, ProcEngineError> {
        let file: RuleFile =
            serde_yaml::from_str(yaml_str).map_err(|e| ProcEngineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("YAML parse error: {e}"),
            })?;

        if file.rules.len() > MAX_RULES_COUNT {
            return Err(ProcEngineError::RuleLoad {
                path: source.to_owned(),
                reason: format!("too many rules: max {MAX_RULES_COUNT}"),
            });
        }

        let mut seen_ids = HashSet::new();
        for rule in &file.rules {
            rule.validate()?;
            if !seen_ids.insert(rule.id.as_str()) {
                return Err(ProcEngineError::RuleValidation {
                    rule_id: rule.id.clone(),
                    reason: format!("duplicate rule id in {source}"),
                });
            }
        }

        Ok(file.rules)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use procmeter_core::types::Category;

    use super::*;

    const VALID: &str = r#"
rules:
  - id: heal_totem
    category: heal
    pattern: '^You were healed by (?P<totem>\w+) totem for (?P<amount>\d+)'
    key: "Totem_{totem:title}"
    amount: required
  - id: tier_flurry
    category: tier
    pattern: '(?i)flurry'
    key: Flurry
    guard: local_actor
"#;

    #[test]
    fn parse_valid_yaml() {
        let rules = RuleLoader::parse_yaml(VALID, "rules.yml").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].id, "heal_totem");
        assert_eq!(rules[1].category, Category::Tier);
    }

    #[test]
    fn parse_empty_document_yields_no_rules() {
        let rules = RuleLoader::parse_yaml("rules: []", "empty.yml").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        let result = RuleLoader::parse_yaml("rules: [valid: yaml: {{{", "bad.yml");
        assert!(matches!(result, Err(ProcEngineError::RuleLoad { .. })));
    }

    #[test]
    fn parse_unknown_category_returns_error() {
        let yaml = r#"
rules:
  - id: spells
    category: spell
    pattern: x
    key: X
"#;
        assert!(RuleLoader::parse_yaml(yaml, "bad.yml").is_err());
    }

    #[test]
    fn parse_duplicate_ids_returns_error() {
        let yaml = r#"
rules:
  - id: same
    category: heal
    pattern: a
    key: A
  - id: same
    category: charm
    pattern: b
    key: B
"#;
        let err = RuleLoader::parse_yaml(yaml, "dup.yml").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn parse_empty_id_returns_error() {
        let yaml = r#"
rules:
  - id: ""
    category: heal
    pattern: a
    key: A
"#;
        assert!(matches!(
            RuleLoader::parse_yaml(yaml, "empty_id.yml"),
            Err(ProcEngineError::RuleValidation { .. })
        ));
    }

    #[tokio::test]
    async fn load_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();
        let rules = RuleLoader::load_file(file.path()).await.unwrap();
        assert_eq!(rules.len(), 2);
    }

    #[tokio::test]
    async fn load_nonexistent_file_returns_error() {
        let result = RuleLoader::load_file("/nonexistent/path/rules.yml").await;
        assert!(matches!(result, Err(ProcEngineError::RuleLoad { .. })));
    }
}
