/*!
 * Batch translation processing.
 *
 * Independent documents are translated concurrently over a bounded worker
 * pool. A failure in one document never aborts the batch: every document gets
 * its own outcome, reported in input order. Cancellation stops documents that
 * have not started yet; calls already in flight finish or time out.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use log::{error, info};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::app_config::BatchConfig;
use crate::errors::TranslationError;

use super::orchestrator::{HybridOrchestrator, TranslationRequest};
use super::result::TranslationResult;

/// One document of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDocument {
    /// Caller-visible identifier
    pub id: String,
    pub request: TranslationRequest,
}

impl BatchDocument {
    /// Wrap a request under a generated identifier
    pub fn new(request: TranslationRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request,
        }
    }

    pub fn with_id(id: &str, request: TranslationRequest) -> Self {
        Self {
            id: id.to_string(),
            request,
        }
    }
}

/// Outcome of one document
#[derive(Debug)]
pub enum DocumentOutcome {
    /// A result was produced (possibly a partial, low-confidence one)
    Success(TranslationResult),
    /// The document failed; the rest of the batch was unaffected
    Failed(TranslationError),
    /// The batch was cancelled before this document started
    Cancelled,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn result(&self) -> Option<&TranslationResult> {
        match self {
            Self::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&TranslationError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Per-document record in a batch report
#[derive(Debug)]
pub struct BatchItem {
    /// Position in the input
    pub index: usize,
    pub id: String,
    pub outcome: DocumentOutcome,
}

/// Outcomes of a whole batch, in input order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, DocumentOutcome::Failed(_)))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, DocumentOutcome::Cancelled))
            .count()
    }

    /// True when every document produced a result
    pub fn is_complete_success(&self) -> bool {
        self.succeeded() == self.items.len()
    }
}

/// Batch translator over a shared orchestrator
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    orchestrator: Arc<HybridOrchestrator>,
    /// Maximum number of documents in flight
    workers: usize,
}

impl BatchTranslator {
    pub fn new(orchestrator: Arc<HybridOrchestrator>, workers: usize) -> Self {
        Self {
            orchestrator,
            workers: workers.max(1),
        }
    }

    pub fn from_config(orchestrator: Arc<HybridOrchestrator>, config: &BatchConfig) -> Self {
        Self::new(orchestrator, config.workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Translate all documents
    pub async fn translate_all(&self, documents: Vec<BatchDocument>, cancel: &CancellationToken) -> BatchReport {
        self.translate_all_with_progress(documents, cancel, |_, _| {}).await
    }

    /// Translate all documents, reporting `(completed, total)` after each one
    pub async fn translate_all_with_progress(
        &self,
        documents: Vec<BatchDocument>,
        cancel: &CancellationToken,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> BatchReport {
        let total = documents.len();
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let completed = Arc::new(AtomicUsize::new(0));
        let start_time = Instant::now();

        info!("Translating batch of {} documents with {} workers", total, self.workers);

        let mut items = stream::iter(documents.into_iter().enumerate())
            .map(|(index, document)| {
                let orchestrator = self.orchestrator.clone();
                let semaphore = semaphore.clone();
                let completed = completed.clone();
                let progress_callback = progress_callback.clone();
                let cancel = cancel.clone();

                async move {
                    let outcome = match semaphore.acquire().await {
                        Ok(_permit) if !cancel.is_cancelled() => {
                            match orchestrator.translate_with_cancel(&document.request, &cancel).await {
                                Ok(result) => DocumentOutcome::Success(result),
                                Err(TranslationError::Cancelled) => DocumentOutcome::Cancelled,
                                Err(e) => {
                                    error!("Document {} ({}) failed: {}", index + 1, document.id, e);
                                    DocumentOutcome::Failed(e)
                                }
                            }
                        }
                        _ => DocumentOutcome::Cancelled,
                    };

                    let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total);

                    BatchItem {
                        index,
                        id: document.id,
                        outcome,
                    }
                }
            })
            .buffer_unordered(self.workers)
            .collect::<Vec<_>>()
            .await;

        // Restore input order
        items.sort_by_key(|item| item.index);
        let report = BatchReport { items };

        info!(
            "Batch finished in {:?}: {} succeeded, {} failed, {} cancelled",
            start_time.elapsed(),
            report.succeeded(),
            report.failed(),
            report.cancelled()
        );
        report
    }
}
