/*!
 * Common test utilities for the termbridge test suite
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;

use termbridge::glossary::{Glossary, GlossaryEntry, GlossaryStore, SharedGlossary};
use termbridge::providers::TranslationBackend;
use termbridge::providers::retry::RetryPolicy;
use termbridge::translation::BackendSlot;

/// Route library logs through env_logger; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    std::fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Medical English → Swahili glossary used across tests
pub fn medical_glossary() -> Glossary {
    Glossary::from_entries(vec![
        GlossaryEntry::new("blood", "damu", "medical"),
        GlossaryEntry::new("blood pressure", "shinikizo la damu", "medical/cardiology"),
        GlossaryEntry::new("hypertension", "shinikizo la damu la juu", "medical").with_confidence(0.95),
        GlossaryEntry::new("insulin", "insulini", "medical").with_confidence(0.5),
    ])
    .expect("fixture glossary is valid")
}

/// Shared store over the medical glossary
pub fn shared_medical_glossary() -> SharedGlossary {
    GlossaryStore::new(medical_glossary()).shared()
}

/// Retry policy without retries or meaningful backoff
pub fn no_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        backoff_base: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
    }
}

/// Orchestrator slot around a test backend
pub fn slot<B: TranslationBackend + 'static>(backend: &B) -> BackendSlot
where
    B: Clone,
{
    BackendSlot::new(Arc::new(backend.clone()), no_retry_policy())
}
