//! Command handlers -- one module per subcommand

pub mod classify;
pub mod config;
pub mod replay;
pub mod rules;
pub mod watch;

use std::path::Path;

use procmeter_core::config::ProcmeterConfig;
use procmeter_core::error::{ConfigError, ProcmeterError};
use procmeter_core::types::Category;
use procmeter_engine::{EngineConfig, ProcTracker, TrackerBuilder};

use crate::cli::{DEFAULT_CONFIG_PATH, DisplayArgs};
use crate::error::CliError;

/// Load the effective configuration.
///
/// A missing file at the default location falls back to defaults
/// (with environment overrides); an explicitly given path must exist.
/// Runs once in `main`, before tracing is installed, so it does not log.
pub async fn load_config(config_path: &Path) -> Result<ProcmeterConfig, CliError> {
    match ProcmeterConfig::load(config_path).await {
        Ok(config) => Ok(config),
        Err(ProcmeterError::Config(ConfigError::FileNotFound { .. }))
            if config_path == Path::new(DEFAULT_CONFIG_PATH) =>
        {
            let mut config = ProcmeterConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

/// Parse a category name given on the command line.
pub fn parse_category(name: &str) -> Result<Category, CliError> {
    Category::from_str_loose(name).ok_or_else(|| {
        CliError::Command(format!(
            "unknown category: {name} (expected: charm, tier, heal, creature_damage)"
        ))
    })
}

/// Build a tracker from configuration, load its custom rules and apply display options.
pub async fn build_tracker(
    config: &ProcmeterConfig,
    display: &DisplayArgs,
) -> Result<ProcTracker, CliError> {
    let mut tracker = TrackerBuilder::new()
        .config(EngineConfig::from_core(config))
        .build()?;
    tracker.load_configured_rules().await?;

    if let Some(preset) = &display.preset {
        if !tracker.display_mut().select_preset(preset) {
            let known: Vec<&str> = tracker
                .display()
                .presets()
                .iter()
                .map(|p| p.name.as_str())
                .collect();
            return Err(CliError::Command(format!(
                "unknown preset: {preset} (expected one of: {})",
                known.join(", ")
            )));
        }
    }

    for name in &display.hide {
        let category = parse_category(name)?;
        if tracker.display().is_category_visible(category) {
            tracker.display_mut().toggle_category(category);
        }
    }

    Ok(tracker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_category_accepts_aliases() {
        assert_eq!(parse_category("Heal").unwrap(), Category::Heal);
        assert_eq!(parse_category("creature-damage").unwrap(), Category::CreatureDamage);
        assert!(parse_category("mana").is_err());
    }

    #[tokio::test]
    async fn load_config_explicit_missing_path_fails() {
        let result = load_config(Path::new("/nonexistent/procmeter.toml")).await;
        let err = result.expect_err("missing explicit config should fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    #[serial_test::serial]
    async fn load_config_missing_default_applies_env_overrides() {
        // SAFETY: serial 테스트로 실행되므로 환경변수 조작이 안전합니다.
        unsafe { std::env::set_var("PROCMETER_GENERAL_LOG_LEVEL", "debug") };
        let result = load_config(Path::new(DEFAULT_CONFIG_PATH)).await;
        unsafe { std::env::remove_var("PROCMETER_GENERAL_LOG_LEVEL") };

        let config = result.expect("missing default config falls back to defaults");
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.tracker.categories, Category::ALL.to_vec());
    }

    #[tokio::test]
    async fn build_tracker_applies_display_options() {
        let display = DisplayArgs {
            preset: Some("DamageOnly".to_owned()),
            hide: vec!["tier".to_owned()],
        };
        let tracker = build_tracker(&ProcmeterConfig::default(), &display)
            .await
            .expect("tracker should build");
        assert_eq!(tracker.display().active_preset().name, "DamageOnly");
        assert!(!tracker.display().is_category_visible(Category::Tier));
    }

    #[tokio::test]
    async fn build_tracker_rejects_unknown_preset() {
        let display = DisplayArgs {
            preset: Some("Everything".to_owned()),
            hide: Vec::new(),
        };
        let result = build_tracker(&ProcmeterConfig::default(), &display).await;
        assert!(matches!(result, Err(CliError::Command(_))));
    }
}
