/*!
 * Tests for the glossary model and shared store
 */

use std::sync::Arc;
use std::thread;

use termbridge::errors::GlossaryError;
use termbridge::glossary::{ConflictResolution, EntryUpdate, Glossary, GlossaryEntry, GlossaryStore};

use crate::common;

#[test]
fn test_glossary_get_shouldBeCaseInsensitiveOnSourceTerm() {
    let glossary = common::medical_glossary();
    let entry = glossary.get("Blood Pressure", "medical/cardiology").unwrap();
    assert_eq!(entry.target_term, "shinikizo la damu");
    assert!(glossary.get("blood pressure", "medical").is_none());
}

#[test]
fn test_glossary_addTerm_withInvalidEntry_shouldReject() {
    let mut glossary = Glossary::new();
    let empty = glossary.add_term(GlossaryEntry::new("  ", "x", "medical"), false);
    assert!(matches!(empty, Err(GlossaryError::InvalidEntry(_))));

    let out_of_range = glossary.add_term(GlossaryEntry::new("dx", "x", "medical").with_confidence(1.2), false);
    assert!(matches!(out_of_range, Err(GlossaryError::InvalidEntry(_))));
    assert!(glossary.is_empty());
}

#[test]
fn test_glossary_addTermsBatch_withCollisions_shouldLeaveGlossaryUntouched() {
    let mut glossary = common::medical_glossary();
    let before = glossary.len();

    let result = glossary.add_terms_batch(
        vec![
            GlossaryEntry::new("fever", "homa", "medical"),
            GlossaryEntry::new("BLOOD", "damu", "medical"),
        ],
        false,
    );

    match result {
        Err(GlossaryError::Conflict { collisions }) => assert_eq!(collisions.len(), 1),
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(glossary.len(), before);
    assert!(!glossary.contains("fever", "medical"));
}

#[test]
fn test_glossary_updateTerm_shouldValidateBeforeCommitting() {
    let mut glossary = common::medical_glossary();
    glossary
        .update_term("insulin", "medical", &EntryUpdate::target("insulini ya binadamu"))
        .unwrap();
    assert_eq!(glossary.get("insulin", "medical").unwrap().target_term, "insulini ya binadamu");

    let invalid = glossary.update_term("insulin", "medical", &EntryUpdate::confidence(-0.1));
    assert!(invalid.is_err());
    assert_eq!(glossary.get("insulin", "medical").unwrap().confidence, 0.5);

    let missing = glossary.update_term("fever", "medical", &EntryUpdate::target("homa"));
    assert!(matches!(missing, Err(GlossaryError::NotFound(_))));
}

#[test]
fn test_glossary_searchSource_shouldOrderByConfidence() {
    let glossary = Glossary::from_entries(vec![
        GlossaryEntry::new("blood", "damu", "medical").with_confidence(0.7),
        GlossaryEntry::new("blood pressure", "shinikizo la damu", "medical").with_confidence(0.9),
        GlossaryEntry::new("blood sugar", "sukari ya damu", "medical").with_confidence(0.7),
    ])
    .unwrap();

    let found: Vec<_> = glossary.search_source("BLOOD").iter().map(|e| e.source_term.clone()).collect();
    assert_eq!(found, vec!["blood pressure", "blood", "blood sugar"]);
}

#[test]
fn test_glossary_filterByContext_shouldBeHierarchicalAndDetached() {
    let glossary = common::medical_glossary();
    let mut cardiology = glossary.filter_by_context("medical/cardiology");
    assert_eq!(cardiology.len(), 1);

    cardiology.remove_term("blood pressure", "medical/cardiology").unwrap();
    assert!(glossary.contains("blood pressure", "medical/cardiology"));

    assert_eq!(glossary.filter_by_context("medical").len(), glossary.len());
    assert!(glossary.filter_by_context("medic").is_empty());
}

#[test]
fn test_glossary_merge_highestConfidence_shouldKeepStrongerEntry() {
    let a = Glossary::from_entries(vec![GlossaryEntry::new("dx", "utambuzi", "medical").with_confidence(0.9)]).unwrap();
    let b = Glossary::from_entries(vec![GlossaryEntry::new("dx", "uchunguzi", "medical").with_confidence(0.95)]).unwrap();

    let merged = Glossary::merge(&[&a, &b], ConflictResolution::HighestConfidence).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged.get("dx", "medical").unwrap().target_term, "uchunguzi");

    let tie = Glossary::from_entries(vec![GlossaryEntry::new("dx", "tambuzi", "medical").with_confidence(0.9)]).unwrap();
    let merged = Glossary::merge(&[&a, &tie], ConflictResolution::HighestConfidence).unwrap();
    assert_eq!(merged.get("dx", "medical").unwrap().target_term, "utambuzi");
}

#[test]
fn test_glossary_merge_manual_shouldReportEveryCollision() {
    let a = common::medical_glossary();
    let b = common::medical_glossary();

    match Glossary::merge(&[&a, &b], ConflictResolution::Manual) {
        Err(GlossaryError::Conflict { collisions }) => assert_eq!(collisions.len(), a.len()),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[test]
fn test_store_concurrentWriters_shouldNotLoseUpdates() {
    let store = Arc::new(GlossaryStore::new(Glossary::new()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                for j in 0..25 {
                    store
                        .add_term(GlossaryEntry::new(&format!("term-{}-{}", i, j), "lengo", "general"), false)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.len(), 200);
}

#[test]
fn test_store_recordUsage_shouldIncrementMatchedEntries() {
    let store = GlossaryStore::new(common::medical_glossary());
    let key = store.get("blood", "medical").unwrap().key();

    assert_eq!(store.record_usage(&[key.clone(), key]), 2);
    assert_eq!(store.get("blood", "medical").unwrap().usage_count, 2);
}
