/*!
 * Tests for error types and conversions
 */

use std::time::Duration;

use termbridge::errors::{AppError, BackendError, GlossaryError, TranslationError};
use termbridge::providers::BackendKind;

#[test]
fn test_backendError_rateLimit_shouldDisplayMessage() {
    let error = BackendError::RateLimit {
        message: "Too many requests".to_string(),
        retry_after: Some(Duration::from_secs(30)),
    };
    let display = format!("{}", error);
    assert!(display.contains("Rate limit exceeded"));
    assert!(display.contains("Too many requests"));
}

#[test]
fn test_backendError_retryability_shouldDependOnBackendKind() {
    let network = BackendError::Network("connection reset".to_string());
    assert!(network.is_retryable(BackendKind::Remote));
    assert!(!network.is_retryable(BackendKind::Local));

    let rate_limit = BackendError::RateLimit {
        message: "slow down".to_string(),
        retry_after: None,
    };
    assert!(rate_limit.is_retryable(BackendKind::Remote));

    let auth = BackendError::Auth("invalid key".to_string());
    assert!(auth.is_fatal());
    assert!(!auth.is_retryable(BackendKind::Remote));
}

#[test]
fn test_translationError_fromBackendError_shouldWrapCorrectly() {
    let error: TranslationError = BackendError::Auth("invalid key".to_string()).into();
    assert!(matches!(error, TranslationError::Backend(BackendError::Auth(_))));
    assert!(format!("{}", error).contains("invalid key"));
}

#[test]
fn test_translationError_unavailable_shouldListAttempts() {
    let error = TranslationError::Unavailable {
        attempts: vec!["cloud: Network error: reset".to_string(), "ollama: Backend unavailable: down".to_string()],
    };
    let display = format!("{}", error);
    assert!(display.contains("cloud"));
    assert!(display.contains("ollama"));
}

#[test]
fn test_glossaryError_conflict_shouldNameEveryKey() {
    let error = GlossaryError::Conflict {
        collisions: vec![
            ("dx".to_string(), "medical".to_string()),
            ("bp".to_string(), "medical/cardiology".to_string()),
        ],
    };
    let display = format!("{}", error);
    assert!(display.contains("'dx' [medical]"));
    assert!(display.contains("'bp' [medical/cardiology]"));
}

#[test]
fn test_appError_fromLayerErrors_shouldWrapCorrectly() {
    let glossary: AppError = GlossaryError::NotFound("glossary.json".to_string()).into();
    assert!(matches!(glossary, AppError::Glossary(_)));

    let translation: AppError = TranslationError::Cancelled.into();
    assert!(matches!(translation, AppError::Translation(TranslationError::Cancelled)));

    let io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
    assert!(matches!(io, AppError::File(_)));

    let other: AppError = anyhow::anyhow!("something odd").into();
    assert!(format!("{}", other).contains("something odd"));
}
