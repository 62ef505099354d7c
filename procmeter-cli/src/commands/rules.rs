//! `procmeter rules` command handler

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use procmeter_core::config::ProcmeterConfig;
use procmeter_core::types::Category;
use procmeter_engine::rule::{RuleOrigin, RuleOutcome, TIER_KEYWORDS};
use procmeter_engine::{RuleClassifier, RuleLoader};

use crate::cli::{DisplayArgs, RulesAction, RulesArgs};
use crate::commands::{build_tracker, parse_category};
use crate::error::CliError;
use crate::output::{OutputWriter, Render, category_label};

/// Execute the `rules` command.
///
/// The configuration is only needed when listing the configured rules,
/// so a load error surfaces there and nowhere else.
pub async fn execute(
    args: RulesArgs,
    config: Result<ProcmeterConfig, CliError>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        RulesAction::List { category, file } => execute_list(config, category, file, writer).await,
        RulesAction::Validate { path } => execute_validate(&path, writer).await,
    }
}

async fn execute_list(
    config: Result<ProcmeterConfig, CliError>,
    category_filter: Option<String>,
    file: Option<PathBuf>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let categories = match category_filter {
        Some(name) => vec![parse_category(&name)?],
        None => Category::ALL.to_vec(),
    };

    // An explicit file must load; the configured one follows tracker startup.
    let report = match file {
        Some(path) => {
            info!(path = %path.display(), "loading custom rules");
            let mut classifier = RuleClassifier::with_builtin_rules()?;
            classifier.load_custom_rules(&path).await?;
            build_list_report(&classifier, &categories)
        }
        None => {
            let tracker = build_tracker(&config?, &DisplayArgs::default()).await?;
            build_list_report(tracker.classifier(), &categories)
        }
    };
    writer.render(&report)?;
    Ok(())
}

/// Collect the rules of the given categories in evaluation order.
pub fn build_list_report(classifier: &RuleClassifier, categories: &[Category]) -> RuleListReport {
    let rules: Vec<RuleEntry> = categories
        .iter()
        .flat_map(|category| {
            classifier.rules(*category).iter().map(|compiled| RuleEntry {
                id: compiled.rule.id.clone(),
                category: compiled.rule.category,
                origin: match compiled.origin {
                    RuleOrigin::Builtin => "builtin".to_owned(),
                    RuleOrigin::Custom => "custom".to_owned(),
                },
                key: compiled.rule.key.clone(),
                outcome: match compiled.rule.outcome {
                    RuleOutcome::Emit => "emit".to_owned(),
                    RuleOutcome::Suppress => "suppress".to_owned(),
                },
            })
        })
        .collect();

    let tier_keywords = if categories.contains(&Category::Tier) {
        TIER_KEYWORDS
            .iter()
            .map(|tier| TierKeywordEntry {
                keyword: tier.keyword.to_owned(),
                name: tier.name.to_owned(),
                requires_local_attack: tier.requires_local_attack,
            })
            .collect()
    } else {
        Vec::new()
    };

    RuleListReport {
        total: rules.len(),
        rules,
        tier_keywords,
    }
}

async fn execute_validate(path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %path.display(), "validating custom rules");

    let report = validate_rule_file(path).await;
    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Rule(format!(
            "{} is invalid",
            path.display()
        )));
    }
    Ok(())
}

/// Load a rules file and compile every rule against the built-in set.
///
/// Compiling catches what YAML parsing cannot: bad regexes, template
/// groups missing from the pattern, and ids that collide with built-ins.
pub async fn validate_rule_file(path: &Path) -> RuleValidationReport {
    let mut report = RuleValidationReport {
        path: path.display().to_string(),
        valid: false,
        rules: 0,
        errors: Vec::new(),
    };

    let rules = match RuleLoader::load_file(path).await {
        Ok(rules) => rules,
        Err(e) => {
            report.errors.push(e.to_string());
            return report;
        }
    };
    report.rules = rules.len();

    let mut classifier = match RuleClassifier::with_builtin_rules() {
        Ok(classifier) => classifier,
        Err(e) => {
            report.errors.push(e.to_string());
            return report;
        }
    };
    for rule in rules {
        if let Err(e) = classifier.add_custom_rule(rule) {
            report.errors.push(e.to_string());
        }
    }

    report.valid = report.errors.is_empty();
    report
}

#[derive(Serialize)]
pub struct RuleListReport {
    pub total: usize,
    pub rules: Vec<RuleEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tier_keywords: Vec<TierKeywordEntry>,
}

#[derive(Serialize)]
pub struct RuleEntry {
    pub id: String,
    pub category: Category,
    pub origin: String,
    pub key: String,
    pub outcome: String,
}

#[derive(Serialize)]
pub struct TierKeywordEntry {
    pub keyword: String,
    pub name: String,
    pub requires_local_attack: bool,
}

impl Render for RuleListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Classification Rules ({} total, priority order)",
            self.total.to_string().bold()
        )?;
        writeln!(w)?;
        writeln!(
            w,
            "{:<18} {:<34} {:<8} {:<9} Key",
            "Category", "ID", "Origin", "Outcome"
        )?;
        writeln!(w, "{}", "-".repeat(90))?;

        for r in &self.rules {
            let origin = match r.origin.as_str() {
                "custom" => r.origin.cyan(),
                _ => r.origin.normal(),
            };
            let outcome = match r.outcome.as_str() {
                "suppress" => r.outcome.yellow(),
                _ => r.outcome.normal(),
            };
            writeln!(
                w,
                "{:<18} {:<34} {:<8} {:<9} {}",
                category_label(r.category),
                r.id,
                origin,
                outcome,
                r.key
            )?;
        }

        if !self.tier_keywords.is_empty() {
            writeln!(w)?;
            writeln!(w, "{}", "Tier keywords".bold())?;
            for tier in &self.tier_keywords {
                let scope = if tier.requires_local_attack {
                    "local attack"
                } else {
                    "observed"
                };
                writeln!(w, "  {:<20} -> {:<18} ({})", tier.keyword, tier.name, scope)?;
            }
        }

        Ok(())
    }
}

#[derive(Serialize)]
pub struct RuleValidationReport {
    pub path: String,
    pub valid: bool,
    pub rules: usize,
    pub errors: Vec<String>,
}

impl Render for RuleValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Rule Validation: {}", self.path.bold())?;
        writeln!(w, "  Rules: {}", self.rules)?;
        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }
        Ok(())
    }
}
