/*!
 * Confidence scoring for translated text.
 *
 * The overall confidence is a weighted average of two dimensions:
 * - Backend: the confidence reported (or assumed) for the raw translation
 * - Glossary: the share of glossary matches whose canonical term made it
 *   into the output
 *
 * Individual spans scoring below the span threshold are flagged for review,
 * and an implausible length ratio adds a warning. Scoring never fails.
 */

use crate::app_config::ScoringConfig;

use super::result::{FlagReason, FlaggedSpan, MatchSpan, ResultWarning, TermSubstitution};

/// Score for one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionScore {
    /// Score value (0.0 - 1.0)
    pub score: f32,
    /// Weight for overall calculation
    pub weight: f32,
}

impl DimensionScore {
    pub fn new(score: f32, weight: f32) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            weight,
        }
    }

    /// Weighted contribution to the overall score.
    pub fn weighted(&self) -> f32 {
        self.score * self.weight
    }
}

/// Outcome of scoring one translation.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityAssessment {
    /// Weighted overall confidence (0.0 - 1.0)
    pub overall: f32,
    pub backend: DimensionScore,
    pub glossary: DimensionScore,
    /// Spans needing review, in source order
    pub flagged_spans: Vec<FlaggedSpan>,
    /// Non-fatal observations
    pub warnings: Vec<ResultWarning>,
}

/// Glossary coverage: placed matches over candidate matches.
///
/// A source without glossary terms has full coverage, since the absence of
/// domain terms is not a quality defect.
pub fn coverage_ratio(substitutions: &[TermSubstitution]) -> f32 {
    if substitutions.is_empty() {
        return 1.0;
    }
    let applied = substitutions.iter().filter(|s| s.outcome.is_applied()).count();
    applied as f32 / substitutions.len() as f32
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Scores translations with configured weights and thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityScorer {
    backend_weight: f32,
    glossary_weight: f32,
    span_threshold: f32,
    min_length_ratio: f32,
    max_length_ratio: f32,
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

impl QualityScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            backend_weight: config.backend_weight.max(0.0),
            glossary_weight: config.glossary_weight.max(0.0),
            span_threshold: config.span_threshold,
            min_length_ratio: config.min_length_ratio,
            max_length_ratio: config.max_length_ratio,
        }
    }

    pub fn span_threshold(&self) -> f32 {
        self.span_threshold
    }

    /// Weighted average of backend confidence and glossary coverage.
    pub fn overall_confidence(&self, raw_confidence: f32, coverage: f32) -> f32 {
        let backend = DimensionScore::new(raw_confidence, self.backend_weight);
        let glossary = DimensionScore::new(coverage, self.glossary_weight);
        combine(&backend, &glossary)
    }

    /// Score a translation.
    ///
    /// `spans` and `substitutions` are parallel, in source order.
    pub fn assess(
        &self,
        raw_confidence: f32,
        spans: &[MatchSpan],
        substitutions: &[TermSubstitution],
        source_text: &str,
        translated_text: &str,
    ) -> QualityAssessment {
        let backend = DimensionScore::new(raw_confidence, self.backend_weight);
        let glossary = DimensionScore::new(coverage_ratio(substitutions), self.glossary_weight);
        let overall = combine(&backend, &glossary);

        let flagged_spans = spans
            .iter()
            .zip(substitutions)
            .filter_map(|(span, substitution)| self.flag_span(span, substitution, backend.score))
            .collect();

        let mut warnings = Vec::new();
        if let Some(ratio) = self.suspicious_length_ratio(source_text, translated_text) {
            warnings.push(ResultWarning::SuspiciousLength { ratio });
        }

        QualityAssessment {
            overall,
            backend,
            glossary,
            flagged_spans,
            warnings,
        }
    }

    fn flag_span(&self, span: &MatchSpan, substitution: &TermSubstitution, raw_confidence: f32) -> Option<FlaggedSpan> {
        let entry_confidence = span.resolved_entry.confidence;
        let confidence = if substitution.outcome.is_applied() {
            entry_confidence
        } else {
            entry_confidence * raw_confidence
        };
        if confidence >= self.span_threshold {
            return None;
        }
        let reason = if entry_confidence < self.span_threshold {
            FlagReason::LowEntryConfidence
        } else {
            FlagReason::Unapplied
        };
        Some(FlaggedSpan {
            start: span.start,
            end: span.end,
            source_term: span.source_term.clone(),
            confidence,
            reason,
        })
    }

    /// Character length ratio when it falls outside the plausible band.
    fn suspicious_length_ratio(&self, source_text: &str, translated_text: &str) -> Option<f32> {
        let source_len = source_text.trim().chars().count();
        if source_len == 0 {
            return None;
        }
        let ratio = translated_text.trim().chars().count() as f32 / source_len as f32;
        (ratio < self.min_length_ratio || ratio > self.max_length_ratio).then_some(ratio)
    }
}

fn combine(backend: &DimensionScore, glossary: &DimensionScore) -> f32 {
    let total_weight = backend.weight + glossary.weight;
    if total_weight > 0.0 {
        ((backend.weighted() + glossary.weighted()) / total_weight).clamp(0.0, 1.0)
    } else {
        backend.score
    }
}
