/*!
 * Hybrid orchestrator: glossary matching, backend fallback and scoring.
 *
 * Each request runs the same state machine:
 * 1. `Start`: match glossary terms and invoke the primary backend
 * 2. `Done`: a backend answered with confidence at or above the threshold
 * 3. `Fallback`: the primary failed (non-fatally) or answered below the
 *    threshold; the fallback backend is invoked once, if configured
 * 4. `Failed`: no backend reached the threshold; the best output is returned
 *    as a `Partial` result, or `TranslationError::Unavailable` when no
 *    backend produced any output at all
 *
 * Authentication failures are fatal and surface immediately. Engine
 * selection depends only on backend responses, so runs replay identically.
 */

use std::sync::Arc;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::app_config::{BackendConfig, Config};
use crate::errors::{AppError, BackendError, TranslationError};
use crate::glossary::{EntryKey, GlossaryStore, SharedGlossary};
use crate::providers::retry::{RetryPolicy, call_with_retry};
use crate::providers::{BackendRequest, BackendResponse, GlossaryHint, TranslationBackend, build_backend};

use super::matcher::{TermMatcher, apply_terms};
use super::memory::{MemoryKey, TranslationMemory};
use super::quality::{QualityScorer, word_count};
use super::result::{AttemptOutcome, BackendAttempt, MatchSpan, ResultWarning, TranslationResult, TranslationStatus};

/// Confidence threshold used when none is configured
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.75;

/// A text to translate.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub text: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Domain used to resolve glossary contexts
    pub domain: Option<String>,
}

impl TranslationRequest {
    pub fn new(text: &str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            text: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            domain: None,
        }
    }

    /// Request for `text` using the configured language pair and domain.
    pub fn from_config(text: &str, config: &Config) -> Self {
        let request = Self::new(text, &config.source_language, &config.target_language);
        match config.domain.as_deref() {
            Some(domain) => request.with_domain(domain),
            None => request,
        }
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        let domain = domain.trim();
        self.domain = (!domain.is_empty()).then(|| domain.to_string());
        self
    }
}

/// A backend together with its retry policy.
#[derive(Debug, Clone)]
pub struct BackendSlot {
    backend: Arc<dyn TranslationBackend>,
    policy: RetryPolicy,
}

impl BackendSlot {
    pub fn new(backend: Arc<dyn TranslationBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Build the backend and policy described by configuration.
    pub fn from_config(config: &BackendConfig) -> Result<Self, AppError> {
        Ok(Self::new(build_backend(config)?, RetryPolicy::from_config(config)))
    }

    pub fn name(&self) -> &str {
        self.backend.name()
    }

    pub fn backend(&self) -> &Arc<dyn TranslationBackend> {
        &self.backend
    }
}

/// Output of one backend, scored against the threshold
#[derive(Debug)]
struct Candidate {
    engine: String,
    response: BackendResponse,
    confidence: f32,
}

enum Step {
    Accepted(Candidate),
    /// Below threshold or failed; carries the output when there was one
    Rejected(Option<Candidate>),
}

/// Translates texts with glossary enforcement and primary/fallback backends.
#[derive(Debug)]
pub struct HybridOrchestrator {
    glossary: SharedGlossary,
    primary: BackendSlot,
    fallback: Option<BackendSlot>,
    confidence_threshold: f32,
    scorer: QualityScorer,
    memory: Option<TranslationMemory>,
}

impl HybridOrchestrator {
    /// Create an orchestrator with a primary backend and default settings.
    pub fn new(glossary: SharedGlossary, primary: BackendSlot) -> Self {
        Self {
            glossary,
            primary,
            fallback: None,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            scorer: QualityScorer::default(),
            memory: None,
        }
    }

    pub fn with_fallback(mut self, fallback: BackendSlot) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_memory(mut self, memory: TranslationMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Open the configured glossary and build the orchestrator around it.
    pub fn open(config: &Config) -> Result<Self, AppError> {
        config.validate().map_err(|e| AppError::Config(e.to_string()))?;
        let glossary = GlossaryStore::from_config(config)?.shared();
        Self::from_config(config, glossary)
    }

    /// Build an orchestrator from validated configuration.
    pub fn from_config(config: &Config, glossary: SharedGlossary) -> Result<Self, AppError> {
        config.validate().map_err(|e| AppError::Config(e.to_string()))?;

        let slot = |name: &str| -> Result<BackendSlot, AppError> {
            let backend = config
                .backend(name)
                .ok_or_else(|| AppError::Config(format!("Backend '{}' is not configured", name)))?;
            BackendSlot::from_config(backend)
        };

        let mut orchestrator = Self::new(glossary, slot(&config.orchestrator.primary)?)
            .with_threshold(config.orchestrator.confidence_threshold)
            .with_scorer(QualityScorer::new(&config.scoring));
        if let Some(fallback) = &config.orchestrator.fallback {
            orchestrator = orchestrator.with_fallback(slot(fallback)?);
        }
        if let Some(memory) = TranslationMemory::from_config(&config.memory).map_err(|e| AppError::Config(e.to_string()))? {
            orchestrator = orchestrator.with_memory(memory);
        }
        info!(
            "Orchestrator ready: primary '{}', fallback {:?}, threshold {}",
            orchestrator.primary.name(),
            orchestrator.fallback.as_ref().map(BackendSlot::name),
            orchestrator.confidence_threshold
        );
        Ok(orchestrator)
    }

    pub fn glossary(&self) -> &SharedGlossary {
        &self.glossary
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }

    /// Check every configured backend.
    pub async fn health_check(&self) -> Vec<(String, Result<(), BackendError>)> {
        let mut report = vec![(self.primary.name().to_string(), self.primary.backend.health_check().await)];
        if let Some(fallback) = &self.fallback {
            report.push((fallback.name().to_string(), fallback.backend.health_check().await));
        }
        report
    }

    /// Translate one text.
    pub async fn translate(&self, request: &TranslationRequest) -> Result<TranslationResult, TranslationError> {
        self.translate_with_cancel(request, &CancellationToken::new()).await
    }

    /// Translate one text, issuing no new backend call once `cancel` fires.
    pub async fn translate_with_cancel(
        &self,
        request: &TranslationRequest,
        cancel: &CancellationToken,
    ) -> Result<TranslationResult, TranslationError> {
        if cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }

        let spans = self.find_matches(request);
        debug!("Found {} glossary matches in {} chars", spans.len(), request.text.len());

        let memory_key = self.memory.as_ref().map(|_| {
            MemoryKey::new(
                &request.text,
                &request.source_lang,
                &request.target_lang,
                request.domain.as_deref(),
                &spans,
            )
        });
        if let (Some(memory), Some(key)) = (&self.memory, &memory_key) {
            match memory.lookup(key).await {
                Ok(Some(stored)) => match stored.rebased_onto(&spans) {
                    Some(result) => {
                        self.record_usage(&spans);
                        return Ok(result);
                    }
                    None => warn!("Translation memory record does not fit the request matches, translating again"),
                },
                Ok(None) => {}
                Err(e) => warn!("Translation memory lookup failed: {}", e),
            }
        }

        let backend_request = BackendRequest::new(&request.text, &request.source_lang, &request.target_lang)
            .with_domain(request.domain.as_deref())
            .with_hints(GlossaryHint::from_spans(&spans));

        let mut attempts = Vec::new();
        let mut failures = Vec::new();

        // Start
        let primary = self
            .run_slot(&self.primary, &backend_request, cancel, &mut attempts, &mut failures)
            .await?;

        let (chosen, status) = match primary {
            Step::Accepted(candidate) => (candidate, TranslationStatus::Success),
            Step::Rejected(primary_candidate) => {
                // Fallback
                let fallback_step = match &self.fallback {
                    Some(slot) if !cancel.is_cancelled() => {
                        match self.run_slot(slot, &backend_request, cancel, &mut attempts, &mut failures).await {
                            Ok(step) => Some(step),
                            // A usable primary output outlives a fatal fallback error
                            Err(TranslationError::Backend(error)) if primary_candidate.is_some() => {
                                warn!("Fallback '{}' failed fatally, keeping primary output: {}", slot.name(), error);
                                failures.push(format!("{}: {}", slot.name(), error));
                                Some(Step::Rejected(None))
                            }
                            Err(error) => return Err(error),
                        }
                    }
                    _ => None,
                };
                match fallback_step {
                    Some(Step::Accepted(candidate)) => (candidate, TranslationStatus::Success),
                    Some(Step::Rejected(fallback_candidate)) => {
                        (best_of(primary_candidate, fallback_candidate, &failures)?, TranslationStatus::Partial)
                    }
                    None => {
                        if primary_candidate.is_none() && cancel.is_cancelled() {
                            return Err(TranslationError::Cancelled);
                        }
                        (best_of(primary_candidate, None, &failures)?, TranslationStatus::Partial)
                    }
                }
            }
        };

        let result = self.build_result(request, spans, chosen, status, attempts);
        self.record_usage(result.glossary_matches());

        if let (Some(memory), Some(key)) = (&self.memory, &memory_key) {
            if result.status() == TranslationStatus::Success {
                if let Err(e) = memory.store(key, &result).await {
                    warn!("Failed to store translation memory record: {}", e);
                }
            }
        }

        if result.is_low_confidence() {
            warn!(
                "Translation below threshold {} (engine '{}', confidence {:.2})",
                self.confidence_threshold, result.engine_used(), result.raw_confidence()
            );
        }
        Ok(result)
    }

    fn find_matches(&self, request: &TranslationRequest) -> Vec<MatchSpan> {
        let glossary = self.glossary.read();
        TermMatcher::new(&glossary).find_matches(&request.text, request.domain.as_deref())
    }

    async fn run_slot(
        &self,
        slot: &BackendSlot,
        request: &BackendRequest,
        cancel: &CancellationToken,
        attempts: &mut Vec<BackendAttempt>,
        failures: &mut Vec<String>,
    ) -> Result<Step, TranslationError> {
        if cancel.is_cancelled() {
            return Err(TranslationError::Cancelled);
        }

        let engine = slot.name().to_string();
        let outcome = call_with_retry(slot.backend.as_ref(), request, &slot.policy, cancel).await;

        match outcome.result {
            Ok(response) => {
                let confidence = response
                    .confidence
                    .unwrap_or_else(|| slot.backend.default_confidence())
                    .clamp(0.0, 1.0);
                let accepted = confidence >= self.confidence_threshold;
                let outcome = if accepted {
                    AttemptOutcome::Accepted { confidence }
                } else {
                    AttemptOutcome::LowConfidence { confidence }
                };
                debug!("Backend '{}' answered with confidence {:.2}", engine, confidence);
                attempts.push(BackendAttempt { engine: engine.clone(), outcome });

                let candidate = Candidate {
                    engine,
                    response,
                    confidence,
                };
                Ok(if accepted {
                    Step::Accepted(candidate)
                } else {
                    Step::Rejected(Some(candidate))
                })
            }
            Err(error) => {
                attempts.push(BackendAttempt {
                    engine: engine.clone(),
                    outcome: AttemptOutcome::Failed {
                        error: error.to_string(),
                    },
                });
                if error.is_fatal() {
                    return Err(TranslationError::Backend(error));
                }
                warn!("Backend '{}' failed: {}", engine, error);
                failures.push(format!("{}: {}", engine, error));
                Ok(Step::Rejected(None))
            }
        }
    }

    fn build_result(
        &self,
        request: &TranslationRequest,
        spans: Vec<MatchSpan>,
        chosen: Candidate,
        status: TranslationStatus,
        attempts: Vec<BackendAttempt>,
    ) -> TranslationResult {
        let applied = apply_terms(&spans, &chosen.response.text, chosen.response.alignment.as_deref());
        let assessment = self.scorer.assess(
            chosen.confidence,
            &spans,
            &applied.substitutions,
            &request.text,
            &chosen.response.text,
        );

        let mut warnings = Vec::new();
        if status == TranslationStatus::Partial {
            warnings.push(ResultWarning::BelowThreshold {
                threshold: self.confidence_threshold,
            });
        }
        warnings.extend(assessment.warnings);

        TranslationResult {
            text: applied.text,
            engine_used: chosen.engine,
            raw_confidence: chosen.confidence,
            glossary_matches: spans,
            substitutions: applied.substitutions,
            overall_confidence: assessment.overall,
            flagged_spans: assessment.flagged_spans,
            annotations: applied.annotations,
            substitution_mode: applied.mode,
            warnings,
            attempts,
            status,
            word_count: word_count(&request.text),
            source_lang: request.source_lang.clone(),
            target_lang: request.target_lang.clone(),
            domain: request.domain.clone(),
        }
    }

    /// Apply the deferred usage increments in one write.
    fn record_usage(&self, spans: &[MatchSpan]) {
        if spans.is_empty() {
            return;
        }
        let keys: Vec<EntryKey> = spans.iter().map(MatchSpan::key).collect();
        self.glossary.record_usage(&keys);
    }
}

/// Highest-confidence output; ties keep the primary.
fn best_of(
    primary: Option<Candidate>,
    fallback: Option<Candidate>,
    failures: &[String],
) -> Result<Candidate, TranslationError> {
    match (primary, fallback) {
        (Some(p), Some(f)) => Ok(if f.confidence > p.confidence { f } else { p }),
        (Some(c), None) | (None, Some(c)) => Ok(c),
        (None, None) => Err(TranslationError::Unavailable {
            attempts: failures.to_vec(),
        }),
    }
}
