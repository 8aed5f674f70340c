/*!
 * Translation results and their structured report.
 *
 * A `TranslationResult` is built once per translation call by the
 * orchestrator and is read-only afterwards. All offsets are byte offsets:
 * `MatchSpan` offsets refer to the source text, substitution offsets to the
 * final translated text.
 */

use serde::{Deserialize, Serialize};

use crate::glossary::{EntryKey, GlossaryEntry};

/// A resolved glossary match over the source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSpan {
    /// Byte offset of the first matched character
    pub start: usize,
    /// Byte offset one past the last matched character
    pub end: usize,
    /// The source text as it appears in the document
    pub source_term: String,
    /// Entry chosen for this span
    pub resolved_entry: GlossaryEntry,
}

impl MatchSpan {
    /// Key of the originating glossary entry.
    pub fn key(&self) -> EntryKey {
        self.resolved_entry.key()
    }

    /// Whether two spans share any byte.
    pub fn overlaps(&self, other: &MatchSpan) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Backend-reported correspondence between a source and a target range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanAlignment {
    pub source_start: usize,
    pub source_end: usize,
    pub target_start: usize,
    pub target_end: usize,
}

/// What happened to a match when glossary terms were applied to the translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    /// Substituted at the aligned target position
    Aligned,
    /// The backend left the source term untranslated; it was replaced
    Verbatim,
    /// The canonical target term already appears in the translation
    AlreadyPresent,
    /// No position could be determined; recorded as an annotation
    Annotated,
}

impl ApplyOutcome {
    /// Whether the canonical term ended up in the translated text.
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Annotated)
    }
}

/// Per-match record of the substitution step, in `glossary_matches` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermSubstitution {
    pub source_start: usize,
    pub source_end: usize,
    pub outcome: ApplyOutcome,
    /// Range of the target term in the final text, when substituted
    pub target_range: Option<(usize, usize)>,
}

/// How glossary terms were merged into the translation as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionMode {
    /// No glossary terms were found in the source
    None,
    /// Every match was placed in the text
    InPlace,
    /// At least one match could not be placed and was annotated instead
    Annotated,
}

/// Glossary term listed for review because it could not be placed in the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermAnnotation {
    pub source_term: String,
    pub target_term: String,
    pub context: String,
    pub alternatives: Vec<String>,
}

impl TermAnnotation {
    pub(crate) fn from_span(span: &MatchSpan) -> Self {
        Self {
            source_term: span.source_term.clone(),
            target_term: span.resolved_entry.target_term.clone(),
            context: span.resolved_entry.context.clone(),
            alternatives: span.resolved_entry.alternatives.clone(),
        }
    }
}

/// Why a span needs human review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    /// The glossary entry itself is below the span threshold
    LowEntryConfidence,
    /// The term could not be placed and the backend confidence is low
    Unapplied,
}

/// A source span flagged for review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlaggedSpan {
    pub start: usize,
    pub end: usize,
    pub source_term: String,
    pub confidence: f32,
    pub reason: FlagReason,
}

/// Whole-result annotations that never fail the operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultWarning {
    /// No backend reached the confidence threshold
    BelowThreshold { threshold: f32 },
    /// Translated/source length ratio is outside the plausible band
    SuspiciousLength { ratio: f32 },
}

/// Outcome of one backend attempt, recorded for replay and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Accepted { confidence: f32 },
    LowConfidence { confidence: f32 },
    Failed { error: String },
}

/// One backend invocation made by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendAttempt {
    pub engine: String,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
}

/// Overall status of a returned result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// A backend met the confidence threshold
    Success,
    /// Best available output, below threshold
    Partial,
}

/// Annotated translation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub(crate) text: String,
    pub(crate) engine_used: String,
    pub(crate) raw_confidence: f32,
    pub(crate) glossary_matches: Vec<MatchSpan>,
    pub(crate) substitutions: Vec<TermSubstitution>,
    pub(crate) overall_confidence: f32,
    pub(crate) flagged_spans: Vec<FlaggedSpan>,
    pub(crate) annotations: Vec<TermAnnotation>,
    pub(crate) substitution_mode: SubstitutionMode,
    pub(crate) warnings: Vec<ResultWarning>,
    pub(crate) attempts: Vec<BackendAttempt>,
    pub(crate) status: TranslationStatus,
    pub(crate) word_count: usize,
    pub(crate) source_lang: String,
    pub(crate) target_lang: String,
    pub(crate) domain: Option<String>,
}

impl TranslationResult {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn engine_used(&self) -> &str {
        &self.engine_used
    }

    pub fn raw_confidence(&self) -> f32 {
        self.raw_confidence
    }

    pub fn glossary_matches(&self) -> &[MatchSpan] {
        &self.glossary_matches
    }

    pub fn substitutions(&self) -> &[TermSubstitution] {
        &self.substitutions
    }

    pub fn overall_confidence(&self) -> f32 {
        self.overall_confidence
    }

    pub fn flagged_spans(&self) -> &[FlaggedSpan] {
        &self.flagged_spans
    }

    pub fn annotations(&self) -> &[TermAnnotation] {
        &self.annotations
    }

    pub fn substitution_mode(&self) -> SubstitutionMode {
        self.substitution_mode
    }

    pub fn warnings(&self) -> &[ResultWarning] {
        &self.warnings
    }

    pub fn attempts(&self) -> &[BackendAttempt] {
        &self.attempts
    }

    pub fn status(&self) -> TranslationStatus {
        self.status
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn source_lang(&self) -> &str {
        &self.source_lang
    }

    pub fn target_lang(&self) -> &str {
        &self.target_lang
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// True when the result is below threshold and needs review.
    pub fn is_low_confidence(&self) -> bool {
        self.status == TranslationStatus::Partial
    }

    /// Move source offsets onto `spans` found in an equivalent request text.
    ///
    /// Spans pair up by position with the stored matches. Returns `None` when
    /// the two sequences do not resolve to the same entries.
    pub(crate) fn rebased_onto(mut self, spans: &[MatchSpan]) -> Option<Self> {
        if spans.len() != self.glossary_matches.len()
            || spans.len() != self.substitutions.len()
            || spans
                .iter()
                .zip(&self.glossary_matches)
                .any(|(fresh, stored)| fresh.resolved_entry.key() != stored.resolved_entry.key())
        {
            return None;
        }

        for flag in &mut self.flagged_spans {
            let idx = self
                .glossary_matches
                .iter()
                .position(|m| m.start == flag.start && m.end == flag.end)?;
            flag.start = spans[idx].start;
            flag.end = spans[idx].end;
            flag.source_term = spans[idx].source_term.clone();
        }
        for (substitution, span) in self.substitutions.iter_mut().zip(spans) {
            substitution.source_start = span.start;
            substitution.source_end = span.end;
        }
        self.glossary_matches = spans.to_vec();
        Some(self)
    }

    /// Build the structured report for the output layer.
    pub fn to_report(&self) -> TranslationReport<'_> {
        let matches = self
            .glossary_matches
            .iter()
            .zip(&self.substitutions)
            .map(|(span, substitution)| ReportMatch {
                start: span.start,
                end: span.end,
                source_term: &span.source_term,
                target_term: &span.resolved_entry.target_term,
                context: &span.resolved_entry.context,
                confidence: span.resolved_entry.confidence,
                alternatives: &span.resolved_entry.alternatives,
                outcome: substitution.outcome,
            })
            .collect();

        TranslationReport {
            text: &self.text,
            engine_used: &self.engine_used,
            status: self.status,
            source_lang: &self.source_lang,
            target_lang: &self.target_lang,
            domain: self.domain.as_deref(),
            word_count: self.word_count,
            raw_confidence: self.raw_confidence,
            overall_confidence: self.overall_confidence,
            substitution_mode: self.substitution_mode,
            matches,
            flagged_spans: &self.flagged_spans,
            annotations: &self.annotations,
            warnings: &self.warnings,
            attempts: &self.attempts,
        }
    }

    /// Render the report as pretty-printed JSON.
    pub fn to_json_report(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_report())
    }
}

/// JSON-shaped view of a result.
#[derive(Debug, Serialize)]
pub struct TranslationReport<'a> {
    pub text: &'a str,
    pub engine_used: &'a str,
    pub status: TranslationStatus,
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<&'a str>,
    pub word_count: usize,
    pub raw_confidence: f32,
    pub overall_confidence: f32,
    pub substitution_mode: SubstitutionMode,
    pub matches: Vec<ReportMatch<'a>>,
    pub flagged_spans: &'a [FlaggedSpan],
    pub annotations: &'a [TermAnnotation],
    pub warnings: &'a [ResultWarning],
    pub attempts: &'a [BackendAttempt],
}

/// One glossary match in the report.
#[derive(Debug, Serialize)]
pub struct ReportMatch<'a> {
    pub start: usize,
    pub end: usize,
    pub source_term: &'a str,
    pub target_term: &'a str,
    pub context: &'a str,
    pub confidence: f32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    pub alternatives: &'a [String],
    pub outcome: ApplyOutcome,
}
