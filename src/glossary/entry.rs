/*!
 * Glossary entries and their lookup keys.
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GlossaryError;

/// A single source → target term mapping with review metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    /// Source-language term, matched case-insensitively
    pub source_term: String,

    /// Canonical target-language translation
    pub target_term: String,

    /// Domain tag such as "medical/cardiology"; empty means general
    #[serde(default)]
    pub context: String,

    /// Author-asserted reliability of the mapping (0.0 - 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f32,

    /// Secondary acceptable translations, surfaced for review only
    #[serde(default)]
    pub alternatives: Vec<String>,

    /// Number of successful matches recorded against this entry
    #[serde(default)]
    pub usage_count: u64,

    /// Last time the entry was created, edited or matched
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

fn default_confidence() -> f32 {
    1.0
}

impl GlossaryEntry {
    /// Create a new entry with full confidence and no alternatives.
    pub fn new(source_term: &str, target_term: &str, context: &str) -> Self {
        Self {
            source_term: source_term.trim().to_string(),
            target_term: target_term.trim().to_string(),
            context: context.trim().to_string(),
            confidence: default_confidence(),
            alternatives: Vec::new(),
            usage_count: 0,
            last_updated: Utc::now(),
        }
    }

    /// Set the confidence.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Add an alternative translation.
    pub fn with_alternative(mut self, alternative: &str) -> Self {
        self.alternatives.push(alternative.to_string());
        self
    }

    /// Set the last-updated stamp (imports, tests).
    pub fn with_last_updated(mut self, last_updated: DateTime<Utc>) -> Self {
        self.last_updated = last_updated;
        self
    }

    /// The `(source_term, context)` key this entry is stored under.
    pub fn key(&self) -> EntryKey {
        EntryKey::new(&self.source_term, &self.context)
    }

    /// Check the entry invariants.
    pub fn validate(&self) -> Result<(), GlossaryError> {
        if self.source_term.trim().is_empty() {
            return Err(GlossaryError::InvalidEntry("source term is empty".to_string()));
        }
        if self.target_term.trim().is_empty() {
            return Err(GlossaryError::InvalidEntry(format!(
                "target term for '{}' is empty",
                self.source_term
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(GlossaryError::InvalidEntry(format!(
                "confidence {} for '{}' is outside [0, 1]",
                self.confidence, self.source_term
            )));
        }
        Ok(())
    }

    /// Whether this entry belongs to the given domain.
    ///
    /// Contexts are hierarchical: domain `medical` covers `medical` and
    /// `medical/cardiology`, but not `medicalese`.
    pub fn matches_domain(&self, domain: &str) -> bool {
        context_matches(&self.context, domain)
    }
}

/// Hierarchical context test shared by entries and glossary views.
pub(crate) fn context_matches(context: &str, domain: &str) -> bool {
    let domain = domain.trim().trim_end_matches('/');
    if domain.is_empty() {
        return true;
    }
    let context = context.trim();
    context.eq_ignore_ascii_case(domain)
        || (context.len() > domain.len()
            && context.is_char_boundary(domain.len())
            && context[..domain.len()].eq_ignore_ascii_case(domain)
            && context[domain.len()..].starts_with('/'))
}

/// Case-insensitive `(source_term, context)` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    /// Lowercased, trimmed source term
    pub source: String,
    /// Trimmed context tag
    pub context: String,
}

impl EntryKey {
    /// Build a key from raw values.
    pub fn new(source_term: &str, context: &str) -> Self {
        Self {
            source: normalize_term(source_term),
            context: context.trim().to_string(),
        }
    }
}

/// Normalise a term for case-insensitive comparison.
pub fn normalize_term(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Partial update applied by `update_term`.
#[derive(Debug, Clone, Default)]
pub struct EntryUpdate {
    /// New canonical translation
    pub target_term: Option<String>,
    /// New confidence
    pub confidence: Option<f32>,
    /// Replacement list of alternatives
    pub alternatives: Option<Vec<String>>,
}

impl EntryUpdate {
    /// Update only the target term.
    pub fn target(target_term: &str) -> Self {
        Self {
            target_term: Some(target_term.to_string()),
            ..Default::default()
        }
    }

    /// Update only the confidence.
    pub fn confidence(confidence: f32) -> Self {
        Self {
            confidence: Some(confidence),
            ..Default::default()
        }
    }

    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.target_term.is_none() && self.confidence.is_none() && self.alternatives.is_none()
    }

    /// Apply to an entry, validating the result before committing it.
    pub(crate) fn apply_to(&self, entry: &GlossaryEntry) -> Result<GlossaryEntry, GlossaryError> {
        let mut updated = entry.clone();
        if let Some(target) = &self.target_term {
            updated.target_term = target.trim().to_string();
        }
        if let Some(confidence) = self.confidence {
            updated.confidence = confidence;
        }
        if let Some(alternatives) = &self.alternatives {
            updated.alternatives = alternatives.clone();
        }
        updated.validate()?;
        updated.last_updated = Utc::now();
        Ok(updated)
    }
}
