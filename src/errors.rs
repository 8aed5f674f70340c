/*!
 * Error types for the termbridge library.
 *
 * Errors are grouped by layer, using the thiserror crate for ergonomic
 * definitions:
 * - `GlossaryError`: glossary loading, mutation and persistence
 * - `BackendError`: failures reported by a translation backend
 * - `TranslationError`: failures surfaced by the orchestrator
 * - `AppError`: umbrella type for embedding applications
 */

use std::time::Duration;

use thiserror::Error;

use crate::providers::BackendKind;

/// Errors that can occur when working with glossaries
#[derive(Error, Debug)]
pub enum GlossaryError {
    /// The glossary file (or a record inside it) is malformed
    #[error("Failed to parse glossary: {0}")]
    Parse(String),

    /// The glossary file or the requested entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// One or more `(source_term, context)` keys already exist
    #[error("Conflicting glossary entries: {}", format_collisions(.collisions))]
    Conflict {
        /// Colliding `(source_term, context)` pairs
        collisions: Vec<(String, String)>,
    },

    /// An entry violates a glossary invariant (empty term, confidence out of range)
    #[error("Invalid glossary entry: {0}")]
    InvalidEntry(String),

    /// Underlying filesystem failure
    #[error("Glossary I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_collisions(collisions: &[(String, String)]) -> String {
    collisions
        .iter()
        .map(|(term, context)| format!("'{}' [{}]", term, context))
        .collect::<Vec<_>>()
        .join(", ")
}

impl GlossaryError {
    /// Build a conflict error for a single key
    pub fn conflict(source_term: &str, context: &str) -> Self {
        Self::Conflict {
            collisions: vec![(source_term.to_string(), context.to_string())],
        }
    }
}

/// Errors reported by translation backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The remote API throttled the request
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        /// Message from the API
        message: String,
        /// Server-suggested wait before retrying
        retry_after: Option<Duration>,
    },

    /// Credentials were rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Transport-level failure talking to a remote API
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete within its timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The local model service is unreachable or not loaded
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with something we could not use
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Fatal errors are never retried and never trigger fallback
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Whether a backend of the given kind may retry after this error
    pub fn is_retryable(&self, kind: BackendKind) -> bool {
        match (kind, self) {
            (BackendKind::Remote, Self::RateLimit { .. }) => true,
            (BackendKind::Remote, Self::Network(_)) => true,
            (BackendKind::Remote, Self::Timeout(_)) => true,
            (BackendKind::Local, Self::Timeout(_)) => true,
            _ => false,
        }
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Every configured backend was exhausted without producing output
    #[error("Translation unavailable: no backend produced output ({})", .attempts.join("; "))]
    Unavailable {
        /// One line per failed backend attempt
        attempts: Vec<String>,
    },

    /// A fatal backend error (authentication, configuration)
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// A glossary error surfaced while preparing or recording the translation
    #[error("Glossary error: {0}")]
    Glossary(#[from] GlossaryError),

    /// The request was cancelled before a backend call was issued
    #[error("Translation cancelled")]
    Cancelled,
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the glossary layer
    #[error("Glossary error: {0}")]
    Glossary(#[from] GlossaryError),

    /// Error from a backend
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
