/*!
 * # termbridge
 *
 * Glossary-driven machine translation for specialised domains.
 *
 * ## Features
 *
 * - Domain glossaries with contextual entries, merge and conflict reporting
 * - Longest-match term detection with domain-aware resolution
 * - Remote and local translation backends with retry and fallback
 * - Canonical term placement in the translated text
 * - Confidence scoring with per-span review flags
 * - Batch translation and an optional translation memory
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `glossary`: Glossary entries, collection, persistence and shared store
 * - `translation`: Matching, orchestration, scoring, memory and batches
 * - `providers`: Translation backends:
 *   - `providers::remote`: HTTP translation service client
 *   - `providers::ollama`: Local Ollama model client
 *   - `providers::mock`: Scriptable backend for tests
 * - `language_utils`: ISO language code utilities
 * - `logging`: Console logger
 * - `errors`: Error types for the library
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod errors;
pub mod glossary;
pub mod language_utils;
pub mod logging;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, BackendError, GlossaryError, TranslationError};
pub use glossary::{Glossary, GlossaryEntry, GlossaryStore, SharedGlossary};
pub use language_utils::{get_language_name, language_codes_match, normalize_to_part2t};
pub use providers::{BackendKind, TranslationBackend};
pub use translation::{
    BatchTranslator, HybridOrchestrator, TermMatcher, TranslationRequest, TranslationResult, TranslationStatus,
};
