/*!
 * Tests for glossary term matching and placement
 */

use termbridge::glossary::{Glossary, GlossaryEntry};
use termbridge::translation::{ApplyOutcome, SpanAlignment, SubstitutionMode, TermMatcher};

use crate::common;

#[test]
fn test_findMatches_withOverlappingTerms_shouldPreferLongest() {
    let glossary = common::medical_glossary();
    let matcher = TermMatcher::new(&glossary);

    let spans = matcher.find_matches("The patient has high blood pressure", Some("medical"));

    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].source_term, "blood pressure");
    assert_eq!(spans[0].resolved_entry.target_term, "shinikizo la damu");
    assert_eq!(&"The patient has high blood pressure"[spans[0].start..spans[0].end], "blood pressure");
}

#[test]
fn test_findMatches_shouldRespectWordBoundariesAndCase() {
    let glossary = common::medical_glossary();
    let matcher = TermMatcher::new(&glossary);

    let spans = matcher.find_matches("Bloodstream, BLOOD and hypertensions; Insulin.", None);
    let terms: Vec<_> = spans.iter().map(|s| s.source_term.as_str()).collect();

    assert_eq!(terms, vec!["BLOOD", "Insulin"]);
}

#[test]
fn test_findMatches_withSeveralContexts_shouldResolveByDomain() {
    let glossary = Glossary::from_entries(vec![
        GlossaryEntry::new("discharge", "kutokwa", "medical"),
        GlossaryEntry::new("discharge", "kuruhusiwa", "medical/hospital"),
        GlossaryEntry::new("discharge", "kutoa", "electrical").with_confidence(0.99),
    ])
    .unwrap();
    let matcher = TermMatcher::new(&glossary);

    let exact = matcher.find_matches("discharge", Some("medical/hospital"));
    assert_eq!(exact[0].resolved_entry.target_term, "kuruhusiwa");

    let electrical = matcher.find_matches("discharge", Some("electrical"));
    assert_eq!(electrical[0].resolved_entry.target_term, "kutoa");

    let undomained = matcher.find_matches("discharge", None);
    assert_eq!(undomained[0].resolved_entry.target_term, "kutoa");
}

#[test]
fn test_findMatches_repeatedCalls_shouldBeDeterministic() {
    let glossary = common::medical_glossary();
    let matcher = TermMatcher::new(&glossary);
    let text = "blood, blood pressure and insulin with hypertension";

    let first = matcher.find_matches(text, Some("medical"));
    for _ in 0..10 {
        assert_eq!(matcher.find_matches(text, Some("medical")), first);
    }
    for (a, b) in first.iter().zip(first.iter().skip(1)) {
        assert!(!a.overlaps(b));
        assert!(a.end <= b.start);
    }
}

#[test]
fn test_applyToTarget_withAlignment_shouldSubstituteInPlace() {
    let glossary = common::medical_glossary();
    let matcher = TermMatcher::new(&glossary);
    let source = "high blood pressure";
    let spans = matcher.find_matches(source, None);
    let alignment = [SpanAlignment {
        source_start: spans[0].start,
        source_end: spans[0].end,
        target_start: 0,
        target_end: 8,
    }];

    let applied = matcher.apply_to_target(&spans, "pressure juu", Some(&alignment));

    assert_eq!(applied.substitutions[0].outcome, ApplyOutcome::Aligned);
    assert!(applied.text.starts_with("shinikizo la damu"));
    assert_eq!(applied.mode, SubstitutionMode::InPlace);
}

#[test]
fn test_applyToTarget_withoutAlignment_shouldFallBackInOrder() {
    let glossary = common::medical_glossary();
    let matcher = TermMatcher::new(&glossary);
    let spans = matcher.find_matches("high blood pressure", None);

    let verbatim = matcher.apply_to_target(&spans, "ana blood pressure ya juu", None);
    assert_eq!(verbatim.substitutions[0].outcome, ApplyOutcome::Verbatim);
    assert_eq!(verbatim.text, "ana shinikizo la damu ya juu");

    let present = matcher.apply_to_target(&spans, "ana shinikizo la damu ya juu", None);
    assert_eq!(present.substitutions[0].outcome, ApplyOutcome::AlreadyPresent);

    let annotated = matcher.apply_to_target(&spans, "ana presha", None);
    assert_eq!(annotated.substitutions[0].outcome, ApplyOutcome::Annotated);
    assert_eq!(annotated.mode, SubstitutionMode::Annotated);
    assert_eq!(annotated.text, "ana presha");
    assert_eq!(annotated.annotations[0].target_term, "shinikizo la damu");
}
