/*!
 * Glossary-aware translation.
 *
 * - `matcher`: finds glossary terms in source text and places their targets
 * - `orchestrator`: primary/fallback backend selection and result assembly
 * - `quality`: confidence scoring and span flagging
 * - `memory`: SQLite store of accepted results
 * - `batch`: concurrent translation of independent documents
 * - `result`: the translation result and its report form
 */

pub mod batch;
pub mod matcher;
pub mod memory;
pub mod orchestrator;
pub mod quality;
pub mod result;

// Re-export main types for easier usage
pub use self::batch::{BatchDocument, BatchReport, BatchTranslator, DocumentOutcome};
pub use self::matcher::{AppliedTerms, TermMatcher, apply_terms};
pub use self::memory::{MemoryKey, TranslationMemory};
pub use self::orchestrator::{BackendSlot, HybridOrchestrator, TranslationRequest};
pub use self::quality::{QualityAssessment, QualityScorer};
pub use self::result::{
    ApplyOutcome, FlaggedSpan, MatchSpan, ResultWarning, SpanAlignment, SubstitutionMode, TranslationResult,
    TranslationStatus,
};
