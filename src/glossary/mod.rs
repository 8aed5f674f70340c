/*!
 * Domain glossaries.
 *
 * - `entry`: term mappings and their `(source_term, context)` keys
 * - `model`: the ordered `Glossary` collection with add/update/search/merge
 * - `format`: JSON load/save with atomic replacement
 * - `store`: the shared single-writer `GlossaryStore`
 */

pub mod entry;
pub mod format;
pub mod model;
pub mod store;

pub use entry::{EntryKey, EntryUpdate, GlossaryEntry};
pub use model::{ConflictResolution, Glossary};
pub use store::{GlossaryStore, SharedGlossary};
