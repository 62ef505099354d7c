//! Integration tests for config loading as the `config` command sees it.

use std::fs;

use procmeter_core::config::ProcmeterConfig;
use procmeter_core::error::{ConfigError, ProcmeterError};
use procmeter_core::types::{Category, StatField};
use procmeter_engine::EngineConfig;
use tempfile::TempDir;

#[tokio::test]
async fn test_config_validate_missing_file() {
    // Given: A path that doesn't exist
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("missing.toml");

    // When: Loading the config
    let result = ProcmeterConfig::load(&config_path).await;

    // Then: Should report the missing file
    match result {
        Err(ProcmeterError::Config(ConfigError::FileNotFound { path })) => {
            assert!(path.contains("missing.toml"));
        }
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_config_validate_malformed_toml() {
    // Given: A file with broken TOML
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("broken.toml");
    fs::write(&config_path, "[tracker\ncategories = [").expect("should write config");

    // When: Loading the config
    let result = ProcmeterConfig::load(&config_path).await;

    // Then: Should fail with a parse error
    assert!(matches!(
        result,
        Err(ProcmeterError::Config(ConfigError::ParseFailed { .. }))
    ));
}

#[tokio::test]
async fn test_config_empty_file_uses_defaults() {
    // Given: An empty config file
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").expect("should write empty config");

    // When: Loading the config
    let config = ProcmeterConfig::load(&config_path)
        .await
        .expect("empty config should use defaults");

    // Then: Every category is enabled with the built-in cooldowns
    assert_eq!(config.tracker.categories, Category::ALL.to_vec());
    assert_eq!(config.display.active_preset, "All");
    assert_eq!(config.cooldown.charm.keys.get("Low Blow"), Some(&500));
}

#[tokio::test]
async fn test_config_show_full_config() {
    // Given: A config touching every section
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("procmeter.toml");

    let full_config = r#"
[general]
log_level = "debug"
log_format = "json"

[tracker]
categories = ["heal", "charm"]
rules_file = "/etc/procmeter/rules.yaml"
max_tracked_keys = 500

[cooldown.charm]
default_ms = 300

[cooldown.charm.keys]
"Low Blow" = 750

[cooldown.heal]
default_ms = 0

[display]
active_preset = "DamageOnly"
hidden_categories = ["creature_damage"]

[[display.presets]]
name = "All"
fields = ["count", "hourly_estimate", "min", "average", "max", "total", "elapsed_time"]

[[display.presets]]
name = "DamageOnly"
fields = ["min", "average", "max", "total"]

[[display.presets]]
name = "ActivationsOnly"
fields = ["count", "hourly_estimate", "elapsed_time"]
"#;
    fs::write(&config_path, full_config).expect("should write config");

    // When: Loading the config
    let config = ProcmeterConfig::load(&config_path)
        .await
        .expect("full config should load");

    // Then: Every section reflects the file
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.tracker.max_tracked_keys, 500);
    assert_eq!(config.cooldown.charm.default_ms, 300);
    assert_eq!(config.cooldown.charm.keys.get("Low Blow"), Some(&750));
    assert_eq!(config.cooldown.heal.default_ms, 0);
    assert_eq!(config.display.active_preset, "DamageOnly");
    assert_eq!(
        config.display.hidden_categories,
        vec![Category::CreatureDamage]
    );

    // And: The engine view normalizes category order
    let engine = EngineConfig::from_core(&config);
    assert_eq!(engine.categories, vec![Category::Charm, Category::Heal]);
    assert_eq!(
        engine.rules_file.as_deref(),
        Some(std::path::Path::new("/etc/procmeter/rules.yaml"))
    );
}

#[tokio::test]
async fn test_config_unknown_active_preset_rejected() {
    // Given: An active preset that isn't defined
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("preset.toml");
    fs::write(&config_path, "[display]\nactive_preset = \"Compact\"\n")
        .expect("should write config");

    // When: Loading the config
    let result = ProcmeterConfig::load(&config_path).await;

    // Then: Validation names the offending field
    match result {
        Err(ProcmeterError::Config(ConfigError::InvalidValue { field, .. })) => {
            assert_eq!(field, "display.active_preset");
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[tokio::test]
async fn test_config_empty_categories_rejected() {
    // Given: A tracker with nothing to classify
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("nothing.toml");
    fs::write(&config_path, "[tracker]\ncategories = []\n").expect("should write config");

    // When: Loading the config
    let result = ProcmeterConfig::load(&config_path).await;

    // Then: Should be rejected
    assert!(result.is_err(), "empty categories should be invalid");
}

#[tokio::test]
async fn test_config_unicode_preset_names() {
    // Given: A custom preset with a non-ASCII name
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("unicode.toml");

    let unicode_config = r#"
[display]
active_preset = "피해량"

[[display.presets]]
name = "All"
fields = ["count"]

[[display.presets]]
name = "DamageOnly"
fields = ["max"]

[[display.presets]]
name = "ActivationsOnly"
fields = ["count"]

[[display.presets]]
name = "피해량"
fields = ["max", "total"]
"#;
    fs::write(&config_path, unicode_config).expect("should write unicode config");

    // When: Loading the config
    let config = ProcmeterConfig::load(&config_path)
        .await
        .expect("unicode preset should load");

    // Then: The preset is kept as written
    assert_eq!(config.display.active_preset, "피해량");
    let preset = config
        .display
        .presets
        .iter()
        .find(|p| p.name == "피해량")
        .expect("preset should exist");
    assert_eq!(preset.fields, vec![StatField::Max, StatField::Total]);
}

#[tokio::test]
async fn test_example_config_loads() {
    // Given: The shipped example config
    let example = concat!(env!("CARGO_MANIFEST_DIR"), "/../procmeter.toml.example");

    // When: Loading it from disk
    let config = ProcmeterConfig::load(example)
        .await
        .expect("example config should load");

    // Then: It matches the defaults
    assert_eq!(config.tracker.categories, Category::ALL.to_vec());
    assert_eq!(config.cooldown.creature_damage.default_ms, 0);
}
