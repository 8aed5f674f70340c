/*!
 * Glossary files on disk: round trips, legacy layouts and store persistence
 */

use termbridge::errors::GlossaryError;
use termbridge::glossary::{ConflictResolution, Glossary, GlossaryEntry, GlossaryStore};

use crate::common;

fn sorted_entries(glossary: &Glossary) -> Vec<GlossaryEntry> {
    let mut entries = glossary.entries().to_vec();
    entries.sort_by_key(|e| e.key());
    entries
}

/// Test that saving then loading yields the same entries
#[test]
fn test_glossary_saveThenLoad_shouldPreserveEveryEntry() {
    common::init_test_logging();
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("nested").join("medical.json");

    let mut glossary = common::medical_glossary();
    glossary
        .add_term(GlossaryEntry::new("dx", "utambuzi", "medical").with_alternative("uchunguzi"), false)
        .unwrap();
    glossary.save(&path).unwrap();

    let loaded = Glossary::load(&path).unwrap();
    assert_eq!(sorted_entries(&loaded), sorted_entries(&glossary));
}

/// Test that saving over an existing file replaces it completely
#[test]
fn test_glossary_saveOverExisting_shouldReplaceFile() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("glossary.json");

    common::medical_glossary().save(&path).unwrap();
    let small = Glossary::from_entries(vec![GlossaryEntry::new("fever", "homa", "medical")]).unwrap();
    small.save(&path).unwrap();

    let loaded = Glossary::load(&path).unwrap();
    assert_eq!(loaded.len(), 1);
    let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

/// Test loading the category-grouped layout
#[test]
fn test_glossary_load_withCategoryLayout_shouldUseCategoryAsContext() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "legacy.json",
        r#"{
            "cardiology": [
                { "source": "blood pressure", "target": "shinikizo la damu", "confidence": 0.9 }
            ],
            "general": [
                { "source": "patient", "target": "mgonjwa", "context": "medical", "alternatives": ["mteja"] }
            ]
        }"#,
    )
    .unwrap();

    let glossary = Glossary::load(&path).unwrap();
    assert_eq!(glossary.get("blood pressure", "cardiology").unwrap().confidence, 0.9);
    let patient = glossary.get("patient", "medical").unwrap();
    assert_eq!(patient.alternatives, vec!["mteja".to_string()]);
    assert_eq!(patient.confidence, 1.0);
}

/// Test load failures
#[test]
fn test_glossary_load_withBadInput_shouldReportKind() {
    let dir = common::create_temp_dir().unwrap();

    let missing = Glossary::load(dir.path().join("absent.json"));
    assert!(matches!(missing, Err(GlossaryError::NotFound(_))));

    let malformed = common::create_test_file(dir.path(), "bad.json", "{ not json").unwrap();
    assert!(matches!(Glossary::load(&malformed), Err(GlossaryError::Parse(_))));

    let duplicated = common::create_test_file(
        dir.path(),
        "dup.json",
        r#"[
            { "source_term": "dx", "target_term": "utambuzi", "context": "medical" },
            { "source_term": "DX", "target_term": "uchunguzi", "context": "medical" }
        ]"#,
    )
    .unwrap();
    assert!(matches!(Glossary::load(&duplicated), Err(GlossaryError::Parse(_))));
}

/// Test merging files through the store and persisting the result
#[test]
fn test_store_mergeThenPersist_shouldWriteMergedGlossary() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("store.json");
    Glossary::from_entries(vec![GlossaryEntry::new("dx", "utambuzi", "medical").with_confidence(0.9)])
        .unwrap()
        .save(&path)
        .unwrap();

    let store = GlossaryStore::open(&path).unwrap();
    let update = Glossary::from_entries(vec![
        GlossaryEntry::new("dx", "uchunguzi", "medical").with_confidence(0.95),
        GlossaryEntry::new("fever", "homa", "medical"),
    ])
    .unwrap();
    store.merge_from(&[&update], ConflictResolution::HighestConfidence).unwrap();
    store.persist().unwrap();

    let reloaded = Glossary::load(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.get("dx", "medical").unwrap().target_term, "uchunguzi");
}

/// Test that a store without an origin refuses to persist
#[test]
fn test_store_persist_withoutOrigin_shouldFail() {
    let store = GlossaryStore::new(common::medical_glossary());
    assert!(store.origin().is_none());
    assert!(matches!(store.persist(), Err(GlossaryError::NotFound(_))));
}
