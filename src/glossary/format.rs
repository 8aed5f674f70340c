/*!
 * Glossary file format.
 *
 * The canonical on-disk layout is a versioned JSON document holding a
 * sequence of entry records:
 *
 * ```json
 * { "version": 1, "entries": [ { "source_term": "dx", "target_term": "utambuzi", ... } ] }
 * ```
 *
 * A bare array of records is accepted as well, and so is the older
 * category-grouped layout where each key is a category holding
 * `{source, target, context?, confidence?, alternatives?}` objects.
 */

use std::fs;
use std::io::Write;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::errors::GlossaryError;

use super::entry::GlossaryEntry;
use super::model::Glossary;

/// Current on-disk format version
pub const GLOSSARY_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct GlossaryFile {
    version: u32,
    entries: Vec<GlossaryEntry>,
}

/// Record shape of the category-grouped layout
#[derive(Debug, Deserialize)]
struct CategoryTerm {
    source: String,
    target: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    alternatives: Vec<String>,
}

impl Glossary {
    /// Load a glossary file.
    ///
    /// Fails with `NotFound` when the path is absent and with `Parse` on
    /// malformed content, including duplicate keys.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GlossaryError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(GlossaryError::NotFound(format!("glossary file {:?}", path)));
        }
        let content = fs::read_to_string(path)?;
        let glossary = parse_glossary(&content)?;
        info!("Loaded glossary with {} terms from {:?}", glossary.len(), path);
        Ok(glossary)
    }

    /// Save atomically: write a sibling temporary file, flush it, then rename
    /// it over the target. An interrupted save leaves the old file intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GlossaryError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let json = serialize_glossary(self)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| GlossaryError::Io(e.error))?;

        debug!("Saved glossary with {} terms to {:?}", self.len(), path);
        Ok(())
    }
}

/// Parse glossary content in any supported layout.
pub fn parse_glossary(content: &str) -> Result<Glossary, GlossaryError> {
    let value: Value = serde_json::from_str(content).map_err(|e| GlossaryError::Parse(e.to_string()))?;

    let versioned = matches!(&value, Value::Object(map) if map.contains_key("entries"));

    let entries = match value {
        Value::Array(_) => from_value::<Vec<GlossaryEntry>>(value)?,
        Value::Object(_) if versioned => {
            let file = from_value::<GlossaryFile>(value)?;
            if file.version > GLOSSARY_FORMAT_VERSION {
                return Err(GlossaryError::Parse(format!(
                    "unsupported glossary format version {}",
                    file.version
                )));
            }
            file.entries
        }
        Value::Object(map) => {
            let mut entries = Vec::new();
            for (category, terms) in map {
                let terms = from_value::<Vec<CategoryTerm>>(terms)
                    .map_err(|e| GlossaryError::Parse(format!("category '{}': {}", category, e)))?;
                entries.extend(terms.into_iter().map(|term| {
                    let context = term.context.filter(|c| !c.trim().is_empty()).unwrap_or_else(|| category.clone());
                    let mut entry = GlossaryEntry::new(&term.source, &term.target, &context);
                    entry.confidence = term.confidence.unwrap_or(1.0);
                    entry.alternatives = term.alternatives;
                    entry
                }));
            }
            entries
        }
        _ => return Err(GlossaryError::Parse("expected a JSON object or array".to_string())),
    };

    // Invariant violations in a file are a parse problem, not a caller conflict
    Glossary::from_entries(entries).map_err(|e| GlossaryError::Parse(e.to_string()))
}

/// Serialize a glossary in the canonical layout.
pub fn serialize_glossary(glossary: &Glossary) -> Result<String, GlossaryError> {
    let file = GlossaryFile {
        version: GLOSSARY_FORMAT_VERSION,
        entries: glossary.entries().to_vec(),
    };
    serde_json::to_string_pretty(&file).map_err(|e| GlossaryError::Parse(e.to_string()))
}

fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, GlossaryError> {
    serde_json::from_value(value).map_err(|e| GlossaryError::Parse(e.to_string()))
}
