/*!
 * Batch translation over a shared orchestrator
 */

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use termbridge::app_config::BatchConfig;
use termbridge::errors::BackendError;
use termbridge::providers::mock::MockBackend;
use termbridge::translation::{BatchDocument, BatchTranslator, HybridOrchestrator, TranslationRequest};

use crate::common;

fn documents(texts: &[&str]) -> Vec<BatchDocument> {
    texts
        .iter()
        .map(|text| BatchDocument::new(TranslationRequest::new(text, "en", "sw").with_domain("medical")))
        .collect()
}

/// Test that one failing document leaves the rest of the batch intact
#[tokio::test]
async fn test_batch_withOneFailure_shouldReportEveryDocument() {
    common::init_test_logging();
    let backend = MockBackend::remote("cloud")
        .with_confidence(0.9)
        .failing_on("broken", BackendError::Network("connection reset".to_string()));
    let orchestrator = Arc::new(HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&backend)));
    let translator = BatchTranslator::from_config(orchestrator.clone(), &BatchConfig { workers: 3 });

    let docs = documents(&[
        "blood sample",
        "insulin dose",
        "broken record",
        "hypertension check",
        "blood pressure",
    ]);
    let ids: Vec<String> = docs.iter().map(|d| d.id.clone()).collect();

    let report = translator.translate_all(docs, &CancellationToken::new()).await;

    assert_eq!(report.len(), 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);
    assert!(report.items[2].outcome.error().is_some());
    assert_eq!(report.items.iter().map(|i| i.id.clone()).collect::<Vec<_>>(), ids);
    assert_eq!(
        report.items[4].outcome.result().unwrap().text(),
        "[sw] shinikizo la damu"
    );
}

/// Test that usage counters add up across concurrent documents
#[tokio::test]
async fn test_batch_concurrentDocuments_shouldAccumulateUsage() {
    let glossary = common::shared_medical_glossary();
    let backend = MockBackend::remote("cloud").with_confidence(0.9);
    let orchestrator = Arc::new(HybridOrchestrator::new(glossary.clone(), common::slot(&backend)));
    let translator = BatchTranslator::new(orchestrator, 4);

    let texts: Vec<&str> = std::iter::repeat("blood").take(12).collect();
    let report = translator.translate_all(documents(&texts), &CancellationToken::new()).await;

    assert!(report.is_complete_success());
    assert_eq!(glossary.get("blood", "medical").unwrap().usage_count, 12);
}

/// Test that cancelling while documents are in flight lets them finish and skips the rest
#[tokio::test(start_paused = true)]
async fn test_batch_cancelWhileInFlight_shouldSkipQueuedDocuments() {
    let backend = MockBackend::remote("cloud")
        .with_confidence(0.9)
        .slow(Duration::from_millis(100));
    let orchestrator = Arc::new(HybridOrchestrator::new(common::shared_medical_glossary(), common::slot(&backend)));
    let translator = BatchTranslator::new(orchestrator, 2);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let report = translator
        .translate_all(documents(&["one", "two", "three", "four", "five"]), &cancel)
        .await;

    assert_eq!(report.len(), 5);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.cancelled(), 1);
    assert!(report.items[4].outcome.result().is_none());
    assert_eq!(backend.call_count(), 4);
}
