//! `procmeter classify` command handler

use std::io::Write;

use serde::Serialize;
use tracing::debug;

use procmeter_core::config::ProcmeterConfig;
use procmeter_core::types::Category;
use procmeter_engine::{Classification, RuleClassifier};

use crate::cli::{ClassifyArgs, DisplayArgs};
use crate::commands::{build_tracker, parse_category};
use crate::error::CliError;
use crate::output::{OutputWriter, Render, category_label};

/// Execute the `classify` command.
///
/// Runs the classifier only. Cooldown and statistics are not involved,
/// so the same line always gives the same answer.
pub async fn execute(
    args: ClassifyArgs,
    config: &ProcmeterConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let tracker = build_tracker(config, &DisplayArgs::default()).await?;

    let categories = match &args.category {
        Some(name) => vec![parse_category(name)?],
        None => tracker.categories().to_vec(),
    };

    debug!(categories = ?categories, "classifying line");
    let report = classify_line(tracker.classifier(), &args.line, &categories);
    writer.render(&report)?;
    Ok(())
}

/// Classify one line against each category in order.
pub fn classify_line(
    classifier: &RuleClassifier,
    line: &str,
    categories: &[Category],
) -> ClassifyReport {
    let results = categories
        .iter()
        .filter_map(|category| match classifier.evaluate(line, *category) {
            Classification::NoMatch => None,
            Classification::Matched(event) => Some(ClassifyResult {
                category: *category,
                key: event.key.name,
                value: event.value,
                suppressed_by: None,
            }),
            Classification::Suppressed { rule_id, event } => Some(ClassifyResult {
                category: *category,
                key: event.key.name,
                value: event.value,
                suppressed_by: Some(rule_id),
            }),
        })
        .collect();

    ClassifyReport {
        line: line.to_owned(),
        results,
    }
}

/// Classification outcome for one line.
#[derive(Serialize)]
pub struct ClassifyReport {
    pub line: String,
    pub results: Vec<ClassifyResult>,
}

/// One category's classification.
#[derive(Serialize)]
pub struct ClassifyResult {
    pub category: Category,
    pub key: String,
    pub value: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed_by: Option<String>,
}

impl Render for ClassifyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Line: {}", self.line.bold())?;
        if self.results.is_empty() {
            writeln!(w, "  {}", "no match".dimmed())?;
            return Ok(());
        }

        for result in &self.results {
            match &result.suppressed_by {
                None => writeln!(
                    w,
                    "  {} {} = {}",
                    category_label(result.category),
                    result.key.bold(),
                    result.value
                )?,
                Some(rule_id) => writeln!(
                    w,
                    "  {} {} = {} {}",
                    category_label(result.category),
                    result.key,
                    result.value,
                    format!("(suppressed by {rule_id})").dimmed()
                )?,
            }
        }
        Ok(())
    }
}
