/*!
 * Ordered, indexed collection of glossary entries.
 *
 * A `Glossary` keeps entries in insertion order (search results and merges
 * depend on it) and maintains a key index so that `(source_term, context)`
 * stays unique.
 */

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::GlossaryError;

use super::entry::{EntryKey, EntryUpdate, GlossaryEntry, context_matches, normalize_term};

/// Policy applied to colliding keys when merging glossaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Keep the entry with the greater confidence; ties keep the earlier glossary
    #[default]
    HighestConfidence,
    /// Refuse to merge and report every collision
    Manual,
}

/// Terminology glossary.
#[derive(Debug, Clone, Default)]
pub struct Glossary {
    entries: Vec<GlossaryEntry>,
    index: HashMap<EntryKey, usize>,
}

impl PartialEq for Glossary {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Glossary {
    /// Create a new empty glossary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a glossary from entries, rejecting invalid or duplicate ones.
    pub fn from_entries(entries: Vec<GlossaryEntry>) -> Result<Self, GlossaryError> {
        let mut glossary = Self::new();
        glossary.add_terms_batch(entries, false)?;
        Ok(glossary)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the glossary is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &GlossaryEntry> {
        self.entries.iter()
    }

    /// Entries as a slice, in insertion order.
    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    /// Look up an entry by its key.
    pub fn get(&self, source_term: &str, context: &str) -> Option<&GlossaryEntry> {
        self.index
            .get(&EntryKey::new(source_term, context))
            .map(|&idx| &self.entries[idx])
    }

    /// Check whether a key is present.
    pub fn contains(&self, source_term: &str, context: &str) -> bool {
        self.index.contains_key(&EntryKey::new(source_term, context))
    }

    /// Distinct contexts in first-seen order.
    pub fn contexts(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.context.clone()))
            .map(|e| e.context.clone())
            .collect()
    }

    /// Add a term.
    ///
    /// Fails with `Conflict` when the key exists and `overwrite` is false.
    /// An overwritten entry keeps its position in the glossary.
    pub fn add_term(&mut self, entry: GlossaryEntry, overwrite: bool) -> Result<(), GlossaryError> {
        entry.validate()?;
        let key = entry.key();
        match self.index.get(&key) {
            Some(&idx) if overwrite => {
                debug!("Overwriting glossary entry '{}' [{}]", entry.source_term, entry.context);
                self.entries[idx] = entry;
                Ok(())
            }
            Some(_) => Err(GlossaryError::conflict(&entry.source_term, &entry.context)),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    /// Add several terms atomically.
    ///
    /// Either every entry is added or the glossary is left untouched. Without
    /// `overwrite`, the conflict error lists every colliding key, including
    /// duplicates inside the batch itself.
    pub fn add_terms_batch(
        &mut self,
        entries: Vec<GlossaryEntry>,
        overwrite: bool,
    ) -> Result<(), GlossaryError> {
        let mut batch_keys = HashSet::new();
        let mut collisions = Vec::new();
        for entry in &entries {
            entry.validate()?;
            let key = entry.key();
            let duplicate_in_batch = !batch_keys.insert(key.clone());
            if duplicate_in_batch || (!overwrite && self.index.contains_key(&key)) {
                collisions.push((entry.source_term.clone(), entry.context.clone()));
            }
        }
        if !collisions.is_empty() {
            return Err(GlossaryError::Conflict { collisions });
        }

        let count = entries.len();
        for entry in entries {
            self.add_term(entry, overwrite)?;
        }
        debug!("Added {} glossary entries in batch", count);
        Ok(())
    }

    /// Update fields of an existing term.
    pub fn update_term(
        &mut self,
        source_term: &str,
        context: &str,
        update: &EntryUpdate,
    ) -> Result<&GlossaryEntry, GlossaryError> {
        let idx = *self
            .index
            .get(&EntryKey::new(source_term, context))
            .ok_or_else(|| not_found(source_term, context))?;
        let updated = update.apply_to(&self.entries[idx])?;
        self.entries[idx] = updated;
        Ok(&self.entries[idx])
    }

    /// Remove a term. Removal is always an explicit caller action.
    pub fn remove_term(&mut self, source_term: &str, context: &str) -> Result<GlossaryEntry, GlossaryError> {
        let idx = self
            .index
            .remove(&EntryKey::new(source_term, context))
            .ok_or_else(|| not_found(source_term, context))?;
        let removed = self.entries.remove(idx);
        self.rebuild_index();
        Ok(removed)
    }

    /// Case-insensitive substring search over source terms.
    ///
    /// Results are ordered by descending confidence; equal confidences keep
    /// insertion order.
    pub fn search_source(&self, substring: &str) -> Vec<&GlossaryEntry> {
        let needle = normalize_term(substring);
        let mut found: Vec<&GlossaryEntry> = self
            .entries
            .iter()
            .filter(|e| e.source_term.to_lowercase().contains(&needle))
            .collect();
        // Stable sort keeps insertion order for ties
        found.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        found
    }

    /// Entries belonging to a context (hierarchically), as a detached copy.
    ///
    /// The copy shares nothing with this glossary, so edits to it can never
    /// reach the parent.
    pub fn filter_by_context(&self, context: &str) -> Glossary {
        let mut filtered = Glossary::new();
        for entry in self.entries.iter().filter(|e| context_matches(&e.context, context)) {
            filtered.index.insert(entry.key(), filtered.entries.len());
            filtered.entries.push(entry.clone());
        }
        filtered
    }

    /// Increment usage counters for matched keys and stamp them.
    ///
    /// Keys that no longer exist (removed concurrently) are skipped.
    pub fn record_usage<'a>(&mut self, keys: impl IntoIterator<Item = &'a EntryKey>) -> usize {
        let now = Utc::now();
        let mut recorded = 0;
        for key in keys {
            if let Some(&idx) = self.index.get(key) {
                let entry = &mut self.entries[idx];
                entry.usage_count += 1;
                entry.last_updated = now;
                recorded += 1;
            }
        }
        recorded
    }

    /// Merge glossaries in order.
    ///
    /// With `HighestConfidence`, a colliding key keeps the entry with strictly
    /// greater confidence, so ties favour the earlier glossary. With `Manual`,
    /// any collision fails the whole merge and no partial result is returned.
    pub fn merge(glossaries: &[&Glossary], resolution: ConflictResolution) -> Result<Glossary, GlossaryError> {
        let mut merged = Glossary::new();
        let mut collisions = Vec::new();
        let mut reported = HashSet::new();

        for glossary in glossaries {
            for entry in &glossary.entries {
                let key = entry.key();
                match merged.index.get(&key) {
                    None => {
                        merged.index.insert(key, merged.entries.len());
                        merged.entries.push(entry.clone());
                    }
                    Some(&idx) => match resolution {
                        ConflictResolution::HighestConfidence => {
                            if entry.confidence > merged.entries[idx].confidence {
                                merged.entries[idx] = entry.clone();
                            }
                        }
                        ConflictResolution::Manual => {
                            if reported.insert(key) {
                                collisions.push((entry.source_term.clone(), entry.context.clone()));
                            }
                        }
                    },
                }
            }
        }

        if !collisions.is_empty() {
            return Err(GlossaryError::Conflict { collisions });
        }
        Ok(merged)
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.key(), idx))
            .collect();
    }
}

fn not_found(source_term: &str, context: &str) -> GlossaryError {
    GlossaryError::NotFound(format!("glossary entry '{}' [{}]", source_term, context))
}
