/*!
 * Orchestrated translation with mock backends
 */

use termbridge::app_config::{BackendConfig, Config};
use termbridge::errors::{AppError, BackendError, GlossaryError, TranslationError};
use termbridge::providers::mock::MockBackend;
use termbridge::translation::{
    HybridOrchestrator, ResultWarning, TranslationMemory, TranslationRequest, TranslationStatus,
};

use crate::common;

fn request(text: &str) -> TranslationRequest {
    TranslationRequest::new(text, "en", "sw").with_domain("medical")
}

/// Test that a low-confidence primary hands over to the fallback exactly once
#[tokio::test]
async fn test_translate_primaryBelowThreshold_shouldInvokeFallbackOnce() {
    common::init_test_logging();
    let primary = MockBackend::local("ollama").with_confidence(0.5);
    let fallback = MockBackend::remote("cloud").with_confidence(0.9);
    let orchestrator = HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&primary))
        .with_fallback(common::slot(&fallback))
        .with_threshold(0.75);

    let result = orchestrator.translate(&request("The patient has high blood pressure")).await.unwrap();

    assert_eq!(primary.call_count(), 1);
    assert_eq!(fallback.call_count(), 1);
    assert_eq!(result.engine_used(), "cloud");
    assert_eq!(result.status(), TranslationStatus::Success);
    assert_eq!(result.attempts().len(), 2);
    assert!(result.text().contains("shinikizo la damu"));
}

/// Test that glossary hints reach the backend
#[tokio::test]
async fn test_translate_shouldSendGlossaryHintsToBackend() {
    let primary = MockBackend::remote("cloud").with_confidence(0.9);
    let orchestrator = HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&primary));

    orchestrator.translate(&request("Insulin for hypertension")).await.unwrap();

    let sent = primary.last_request().unwrap();
    assert_eq!(sent.domain.as_deref(), Some("medical"));
    assert_eq!(sent.glossary_hints.len(), 2);
}

/// Test that authentication failures are fatal
#[tokio::test]
async fn test_translate_authFailure_shouldNotRetryOrFallBack() {
    let primary = MockBackend::remote("cloud").failing(BackendError::Auth("invalid key".to_string()));
    let fallback = MockBackend::local("ollama").with_confidence(0.9);
    let orchestrator = HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&primary))
        .with_fallback(common::slot(&fallback));

    let result = orchestrator.translate(&request("blood")).await;

    assert!(matches!(result, Err(TranslationError::Backend(BackendError::Auth(_)))));
    assert_eq!(primary.call_count(), 1);
    assert_eq!(fallback.call_count(), 0);
}

/// Test that a fatal fallback error keeps the low-confidence primary output
#[tokio::test]
async fn test_translate_fallbackAuthFailure_shouldReturnPrimaryPartial() {
    let primary = MockBackend::local("ollama").with_confidence(0.5);
    let fallback = MockBackend::remote("cloud").failing(BackendError::Auth("invalid key".to_string()));
    let orchestrator = HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&primary))
        .with_fallback(common::slot(&fallback));

    let result = orchestrator.translate(&request("blood")).await.unwrap();

    assert_eq!(result.status(), TranslationStatus::Partial);
    assert_eq!(result.engine_used(), "ollama");
    assert_eq!(result.attempts().len(), 2);
    assert_eq!(fallback.call_count(), 1);
}

/// Test that the best low-confidence output is returned as partial
#[tokio::test]
async fn test_translate_bothBelowThreshold_shouldReturnBestPartial() {
    let primary = MockBackend::local("ollama").with_confidence(0.4);
    let fallback = MockBackend::remote("cloud").with_confidence(0.6);
    let orchestrator = HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&primary))
        .with_fallback(common::slot(&fallback));

    let result = orchestrator.translate(&request("blood")).await.unwrap();

    assert_eq!(result.status(), TranslationStatus::Partial);
    assert_eq!(result.engine_used(), "cloud");
    assert!(result.is_low_confidence());
    assert!(result
        .warnings()
        .iter()
        .any(|w| matches!(w, ResultWarning::BelowThreshold { .. })));
}

/// Test that exhausting every backend reports each failure
#[tokio::test]
async fn test_translate_allBackendsFail_shouldBeUnavailableWithoutUsage() {
    let glossary = common::shared_medical_glossary();
    let primary = MockBackend::local("ollama").failing(BackendError::Unavailable("model not loaded".to_string()));
    let fallback = MockBackend::remote("cloud").failing(BackendError::InvalidResponse("empty body".to_string()));
    let orchestrator = HybridOrchestrator::new(glossary.clone(), common::slot(&primary))
        .with_fallback(common::slot(&fallback));

    match orchestrator.translate(&request("blood")).await {
        Err(TranslationError::Unavailable { attempts }) => assert_eq!(attempts.len(), 2),
        other => panic!("expected unavailable, got {:?}", other),
    }
    assert_eq!(glossary.get("blood", "medical").unwrap().usage_count, 0);
}

/// Test confidence and usage bookkeeping on success
#[tokio::test]
async fn test_translate_success_shouldScoreAndRecordUsage() {
    let glossary = common::shared_medical_glossary();
    let primary = MockBackend::remote("cloud").with_confidence(0.9);
    let orchestrator = HybridOrchestrator::new(glossary.clone(), common::slot(&primary));

    let plain = orchestrator.translate(&request("good morning")).await.unwrap();
    assert!(plain.glossary_matches().is_empty());
    assert!((plain.overall_confidence() - 0.94).abs() < 1e-6);

    let termed = orchestrator.translate(&request("blood and more blood")).await.unwrap();
    assert_eq!(termed.glossary_matches().len(), 2);
    assert_eq!(glossary.get("blood", "medical").unwrap().usage_count, 2);

    let report = termed.to_json_report().unwrap();
    assert!(report.contains("\"engine_used\": \"cloud\""));
}

/// Test that translation memory short-circuits repeated requests
#[tokio::test]
async fn test_translate_withMemory_shouldReuseAcceptedResult() {
    let primary = MockBackend::remote("cloud").with_confidence(0.9);
    let orchestrator = HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&primary))
        .with_memory(TranslationMemory::in_memory().unwrap());

    let first = orchestrator.translate(&request("blood test")).await.unwrap();
    let second = orchestrator.translate(&request("blood test")).await.unwrap();

    assert_eq!(primary.call_count(), 1);
    assert_eq!(first.text(), second.text());
}

/// Test building an orchestrator from configuration
#[test]
fn test_fromConfig_withUnknownFallback_shouldFail() {
    let mut config = Config::default();
    config.orchestrator.fallback = Some("cloud".to_string());

    let result = HybridOrchestrator::from_config(&config, common::shared_medical_glossary());
    assert!(matches!(result, Err(AppError::Config(_))));

    config.backends.push(BackendConfig::remote("cloud", "https://mt.example.com/translate", "secret"));
    let orchestrator = HybridOrchestrator::from_config(&config, common::shared_medical_glossary()).unwrap();
    assert_eq!(orchestrator.confidence_threshold(), 0.75);
}

/// Test that the configured glossary, languages and domain drive translation setup
#[test]
fn test_open_withConfiguredGlossary_shouldUseConfigDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("medical.json");
    common::medical_glossary().save(&path).unwrap();

    let mut config = Config::default();
    config.glossary_path = Some(path.to_string_lossy().to_string());
    config.domain = Some("medical".to_string());

    let orchestrator = HybridOrchestrator::open(&config).unwrap();
    assert_eq!(orchestrator.glossary().len(), common::medical_glossary().len());
    assert_eq!(orchestrator.glossary().origin(), Some(path.as_path()));

    let request = TranslationRequest::from_config("high blood pressure", &config);
    assert_eq!(request.source_lang, "en");
    assert_eq!(request.target_lang, "sw");
    assert_eq!(request.domain.as_deref(), Some("medical"));
}

/// Test that a missing glossary file is reported and an unset path starts empty
#[test]
fn test_open_glossaryPath_shouldBeHonoured() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = Config::default();

    let empty = HybridOrchestrator::open(&config).unwrap();
    assert!(empty.glossary().is_empty());
    assert!(TranslationRequest::from_config("text", &config).domain.is_none());

    config.glossary_path = Some(dir.path().join("absent.json").to_string_lossy().to_string());
    let missing = HybridOrchestrator::open(&config);
    assert!(matches!(missing, Err(AppError::Glossary(GlossaryError::NotFound(_)))));
}

/// Test that health checks cover the primary and the fallback
#[test]
fn test_healthCheck_shouldReportEveryBackend() {
    let primary = MockBackend::remote("cloud");
    let fallback = MockBackend::local("ollama").failing(BackendError::Unavailable("not running".to_string()));
    let orchestrator = HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&primary))
        .with_fallback(common::slot(&fallback));

    let report = tokio_test::block_on(orchestrator.health_check());

    assert_eq!(report.len(), 2);
    assert_eq!(report[0].0, "cloud");
    assert!(report[0].1.is_ok());
    assert!(matches!(report[1].1, Err(BackendError::Unavailable(_))));
}
