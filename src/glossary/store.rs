/*!
 * Shared, single-writer glossary store.
 *
 * Translation tasks read the glossary concurrently; every mutation
 * (`add_term`, `update_term`, usage increments, `save`) goes through the
 * write side of one lock per store so updates are never lost. The store is
 * passed around explicitly as a `SharedGlossary` rather than living in a
 * process-wide global.
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::app_config::Config;
use crate::errors::GlossaryError;

use super::entry::{EntryKey, EntryUpdate, GlossaryEntry};
use super::model::{ConflictResolution, Glossary};

/// Reference-counted handle shared between translation tasks
pub type SharedGlossary = Arc<GlossaryStore>;

/// Glossary guarded by a single-writer lock.
#[derive(Debug, Default)]
pub struct GlossaryStore {
    glossary: RwLock<Glossary>,
    /// File the glossary was opened from, used by `persist`
    origin: Option<PathBuf>,
    /// Serialises saves so renames land in mutation order
    save_lock: Mutex<()>,
}

impl GlossaryStore {
    /// Wrap an in-memory glossary.
    pub fn new(glossary: Glossary) -> Self {
        Self {
            glossary: RwLock::new(glossary),
            origin: None,
            save_lock: Mutex::new(()),
        }
    }

    /// Load a glossary file and remember its path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GlossaryError> {
        let path = path.as_ref();
        let glossary = Glossary::load(path)?;
        Ok(Self {
            glossary: RwLock::new(glossary),
            origin: Some(path.to_path_buf()),
            save_lock: Mutex::new(()),
        })
    }

    /// Open the configured glossary file, or start empty when none is set.
    pub fn from_config(config: &Config) -> Result<Self, GlossaryError> {
        match config.glossary_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Self::open(path),
            _ => {
                debug!("No glossary path configured, starting with an empty glossary");
                Ok(Self::new(Glossary::new()))
            }
        }
    }

    /// Convert into a shared handle.
    pub fn shared(self) -> SharedGlossary {
        Arc::new(self)
    }

    /// Path the store was opened from, if any.
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    /// Read access for matching. Hold the guard only for the scan.
    pub fn read(&self) -> RwLockReadGuard<'_, Glossary> {
        self.glossary.read()
    }

    /// Owned copy of the current glossary.
    pub fn snapshot(&self) -> Glossary {
        self.glossary.read().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.glossary.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.glossary.read().is_empty()
    }

    /// Look up an entry.
    pub fn get(&self, source_term: &str, context: &str) -> Option<GlossaryEntry> {
        self.glossary.read().get(source_term, context).cloned()
    }

    /// Add a term; see `Glossary::add_term`.
    pub fn add_term(&self, entry: GlossaryEntry, overwrite: bool) -> Result<(), GlossaryError> {
        self.glossary.write().add_term(entry, overwrite)
    }

    /// Add terms atomically; see `Glossary::add_terms_batch`.
    pub fn add_terms_batch(&self, entries: Vec<GlossaryEntry>, overwrite: bool) -> Result<(), GlossaryError> {
        self.glossary.write().add_terms_batch(entries, overwrite)
    }

    /// Update a term and return the stored result.
    pub fn update_term(
        &self,
        source_term: &str,
        context: &str,
        update: &EntryUpdate,
    ) -> Result<GlossaryEntry, GlossaryError> {
        self.glossary
            .write()
            .update_term(source_term, context, update)
            .cloned()
    }

    /// Remove a term explicitly.
    pub fn remove_term(&self, source_term: &str, context: &str) -> Result<GlossaryEntry, GlossaryError> {
        self.glossary.write().remove_term(source_term, context)
    }

    /// Case-insensitive substring search; see `Glossary::search_source`.
    pub fn search_source(&self, substring: &str) -> Vec<GlossaryEntry> {
        self.glossary
            .read()
            .search_source(substring)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Detached copy of the entries in a context.
    pub fn filter_by_context(&self, context: &str) -> Glossary {
        self.glossary.read().filter_by_context(context)
    }

    /// Merge other glossaries into this store under the given policy.
    ///
    /// The store's own entries come first, so ties keep them.
    pub fn merge_from(&self, others: &[&Glossary], resolution: ConflictResolution) -> Result<(), GlossaryError> {
        let mut guard = self.glossary.write();
        let mut sources: Vec<&Glossary> = Vec::with_capacity(others.len() + 1);
        sources.push(&*guard);
        sources.extend_from_slice(others);
        let merged = Glossary::merge(&sources, resolution)?;
        drop(sources);
        *guard = merged;
        Ok(())
    }

    /// Apply deferred usage increments collected during a translation.
    pub fn record_usage(&self, keys: &[EntryKey]) -> usize {
        if keys.is_empty() {
            return 0;
        }
        let recorded = self.glossary.write().record_usage(keys);
        debug!("Recorded usage for {} glossary matches", recorded);
        recorded
    }

    /// Save atomically to a path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GlossaryError> {
        let _serialised = self.save_lock.lock();
        let snapshot = self.snapshot();
        snapshot.save(path.as_ref())?;
        info!("Glossary saved to {:?}", path.as_ref());
        Ok(())
    }

    /// Save back to the file the store was opened from.
    pub fn persist(&self) -> Result<(), GlossaryError> {
        let path = self
            .origin
            .clone()
            .ok_or_else(|| GlossaryError::NotFound("store was not opened from a file".to_string()))?;
        self.save(path)
    }
}
