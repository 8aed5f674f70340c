/*!
 * Translation backends.
 *
 * Every backend implements the `TranslationBackend` capability interface and
 * belongs to one of a closed set of kinds, which decides its retry policy:
 * - `remote`: REST translation API (rate limits, auth, network failures)
 * - `ollama`: local model served by Ollama (unavailable, timeouts)
 * - `mock`: scripted backend for tests and dry runs
 *
 * `retry` wraps a single backend call with the per-kind retry policy and a
 * timeout on every attempt.
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app_config::BackendConfig;
use crate::errors::{AppError, BackendError};
use crate::translation::result::{MatchSpan, SpanAlignment};

pub mod mock;
pub mod ollama;
pub mod remote;
pub mod retry;

/// Confidence assumed for remote APIs that do not report one
pub const DEFAULT_REMOTE_CONFIDENCE: f32 = 0.85;

/// Confidence assumed for local models, which never report one
pub const DEFAULT_LOCAL_CONFIDENCE: f32 = 0.7;

/// Closed set of backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Network translation API
    Remote,
    /// Model served on the local machine
    Local,
}

impl BackendKind {
    /// Confidence used when a backend of this kind reports none
    pub fn default_confidence(&self) -> f32 {
        match self {
            Self::Remote => DEFAULT_REMOTE_CONFIDENCE,
            Self::Local => DEFAULT_LOCAL_CONFIDENCE,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote => write!(f, "remote"),
            Self::Local => write!(f, "local"),
        }
    }
}

/// Canonical term the backend should use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryHint {
    pub source_term: String,
    pub target_term: String,
}

impl GlossaryHint {
    /// Hints for the resolved entries of a set of matches, deduplicated
    pub fn from_spans(spans: &[MatchSpan]) -> Vec<Self> {
        let mut hints: Vec<Self> = Vec::new();
        for span in spans {
            let entry = &span.resolved_entry;
            let seen = hints
                .iter()
                .any(|h| h.source_term.eq_ignore_ascii_case(&entry.source_term) && h.target_term == entry.target_term);
            if !seen {
                hints.push(Self {
                    source_term: entry.source_term.clone(),
                    target_term: entry.target_term.clone(),
                });
            }
        }
        hints
    }
}

/// One translation call
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    /// Plain source text
    pub text: String,
    /// ISO code of the source language
    pub source_lang: String,
    /// ISO code of the target language
    pub target_lang: String,
    /// Optional domain context
    pub domain: Option<String>,
    /// Glossary terms found in the source
    pub glossary_hints: Vec<GlossaryHint>,
    /// Deadline for this call
    pub timeout: Duration,
}

impl BackendRequest {
    pub fn new(text: &str, source_lang: &str, target_lang: &str) -> Self {
        Self {
            text: text.to_string(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            domain: None,
            glossary_hints: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_domain(mut self, domain: Option<&str>) -> Self {
        self.domain = domain.map(str::to_string);
        self
    }

    pub fn with_hints(mut self, hints: Vec<GlossaryHint>) -> Self {
        self.glossary_hints = hints;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Raw output of a backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    /// Translated text
    pub text: String,
    /// Confidence reported by the backend, if any
    pub confidence: Option<f32>,
    /// Source-to-target span alignment, if the backend provides it
    pub alignment: Option<Vec<SpanAlignment>>,
}

impl BackendResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
            alignment: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_alignment(mut self, alignment: Vec<SpanAlignment>) -> Self {
        self.alignment = Some(alignment);
        self
    }
}

/// Capability interface shared by all backends
///
/// The orchestrator only sees this trait, so the fallback state machine can be
/// exercised against scripted implementations.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Configured backend name, reported as `engine_used`
    fn name(&self) -> &str;

    /// Kind of backend, which selects the retry policy
    fn kind(&self) -> BackendKind;

    /// Confidence used when a response carries none
    fn default_confidence(&self) -> f32 {
        self.kind().default_confidence()
    }

    /// Translate one text
    async fn translate(&self, request: &BackendRequest) -> Result<BackendResponse, BackendError>;

    /// Check that the backend is reachable and credentials are accepted
    async fn health_check(&self) -> Result<(), BackendError>;
}

/// Build a backend from its configuration
pub fn build_backend(config: &BackendConfig) -> Result<Arc<dyn TranslationBackend>, AppError> {
    let backend: Arc<dyn TranslationBackend> = match config.kind {
        BackendKind::Remote => Arc::new(remote::RemoteBackend::from_config(config)?),
        BackendKind::Local => Arc::new(ollama::OllamaBackend::from_config(config)?),
    };
    Ok(backend)
}
