/*!
 * Tests for configuration functionality
 */

use termbridge::app_config::{BackendConfig, Config, LogLevel};
use termbridge::providers::BackendKind;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "sw");
    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.orchestrator.primary, "ollama");
    assert!(config.orchestrator.fallback.is_none());
    assert_eq!(config.orchestrator.confidence_threshold, 0.75);
    assert_eq!(config.scoring.backend_weight, 0.6);
    assert_eq!(config.scoring.glossary_weight, 0.4);
    assert_eq!(config.batch.workers, 4);
    assert!(!config.memory.enabled);

    let primary = config.backend("ollama").expect("default backend should exist");
    assert_eq!(primary.kind, BackendKind::Local);
    assert!(config.validate().is_ok());
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();

    // Invalid source language
    config.source_language = "xyz1".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    // Unknown fallback
    config.orchestrator.fallback = Some("cloud".to_string());
    assert!(config.validate().is_err());

    // Remote fallback without an API key
    config.backends.push(BackendConfig::remote("cloud", "https://mt.example.com/translate", ""));
    assert!(config.validate().is_err());

    config.backends[1].api_key = "secret".to_string();
    assert!(config.validate().is_ok());

    // Threshold out of range
    config.orchestrator.confidence_threshold = 1.5;
    assert!(config.validate().is_err());
    config.orchestrator.confidence_threshold = 0.75;

    // Zero workers
    config.batch.workers = 0;
    assert!(config.validate().is_err());
}

/// Test saving and loading configuration files
#[test]
fn test_config_saveThenLoad_shouldPreserveValues() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("termbridge.json");

    let mut config = Config::default();
    config.domain = Some("medical".to_string());
    config.backends.push(BackendConfig::remote("cloud", "https://mt.example.com/translate", "env:MT_KEY"));
    config.orchestrator.fallback = Some("cloud".to_string());
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded, config);
}

/// Test that partial files fall back to defaults
#[test]
fn test_config_load_withMinimalFile_shouldApplyDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "minimal.json",
        r#"{ "source_language": "en", "target_language": "fr" }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.target_language, "fr");
    assert_eq!(config.backends.len(), 1);
    assert_eq!(config.scoring.span_threshold, 0.6);
    assert!(config.validate().is_ok());
}
