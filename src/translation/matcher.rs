/*!
 * Glossary term matching.
 *
 * `TermMatcher` indexes every source term of a glossary in a
 * character trie, scans a document left to right and resolves each position
 * to at most one entry:
 *
 * 1. the longest term starting at a position wins ("blood pressure" over "blood");
 * 2. a match must start and end on word boundaries;
 * 3. entries sharing a source term are ranked by domain fit, then confidence,
 *    then earliest `last_updated`, then glossary order.
 *
 * After translation, `apply_to_target` places canonical target terms into the
 * raw output using backend alignment when present, and records an explicit
 * annotation for every span it cannot place.
 */

use std::cmp::Ordering;
use std::collections::HashMap;

use log::debug;

use crate::glossary::{Glossary, GlossaryEntry};
use crate::glossary::entry::context_matches;

use super::result::{
    ApplyOutcome, MatchSpan, SpanAlignment, SubstitutionMode, TermAnnotation, TermSubstitution,
};

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, usize>,
    /// Index into `TermMatcher::groups` when a term ends here
    terminal: Option<usize>,
}

/// Entries that share one normalised source term
#[derive(Debug)]
struct TermGroup {
    /// Glossary positions, in glossary order
    entries: Vec<usize>,
}

/// Case-insensitive, word-bounded glossary matcher.
#[derive(Debug)]
pub struct TermMatcher<'g> {
    glossary: &'g Glossary,
    nodes: Vec<TrieNode>,
    groups: Vec<TermGroup>,
}

/// Glossary terms merged into a translation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedTerms {
    /// Translation with canonical terms substituted where possible
    pub text: String,
    /// One record per span, in span order
    pub substitutions: Vec<TermSubstitution>,
    /// Spans that could not be placed in the text
    pub annotations: Vec<TermAnnotation>,
    /// Summary of how terms were merged
    pub mode: SubstitutionMode,
}

impl AppliedTerms {
    /// Number of spans whose canonical term is present in the text.
    pub fn applied_count(&self) -> usize {
        self.substitutions.iter().filter(|s| s.outcome.is_applied()).count()
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn lowercase_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().flat_map(char::to_lowercase)
}

impl<'g> TermMatcher<'g> {
    /// Build the search index over all source terms of a glossary.
    pub fn new(glossary: &'g Glossary) -> Self {
        let mut matcher = Self {
            glossary,
            nodes: vec![TrieNode::default()],
            groups: Vec::new(),
        };
        for (position, entry) in glossary.iter().enumerate() {
            matcher.insert(&entry.source_term, position);
        }
        debug!(
            "Indexed {} glossary entries into {} trie nodes",
            glossary.len(),
            matcher.nodes.len()
        );
        matcher
    }

    fn insert(&mut self, term: &str, position: usize) {
        let mut node = 0;
        for c in lowercase_chars(term.trim()) {
            node = match self.nodes[node].children.get(&c) {
                Some(&next) => next,
                None => {
                    let next = self.nodes.len();
                    self.nodes.push(TrieNode::default());
                    self.nodes[node].children.insert(c, next);
                    next
                }
            };
        }
        if node == 0 {
            return;
        }
        match self.nodes[node].terminal {
            Some(group) => self.groups[group].entries.push(position),
            None => {
                self.nodes[node].terminal = Some(self.groups.len());
                self.groups.push(TermGroup {
                    entries: vec![position],
                });
            }
        }
    }

    /// Find non-overlapping glossary matches in `text`.
    ///
    /// The result is fully determined by the glossary, the text and the
    /// domain filter.
    pub fn find_matches(&self, text: &str, domain: Option<&str>) -> Vec<MatchSpan> {
        let mut spans = Vec::new();
        let mut prev: Option<char> = None;
        let mut skip_until = 0;

        for (start, c) in text.char_indices() {
            if start < skip_until {
                prev = Some(c);
                continue;
            }
            let starts_word = !is_word_char(c) || !prev.is_some_and(is_word_char);
            if starts_word {
                if let Some((end, group)) = self.longest_at(text, start) {
                    let entry = self.resolve(group, domain);
                    spans.push(MatchSpan {
                        start,
                        end,
                        source_term: text[start..end].to_string(),
                        resolved_entry: entry.clone(),
                    });
                    skip_until = end;
                }
            }
            prev = Some(c);
        }
        spans
    }

    /// Longest word-bounded term starting at byte `start`.
    fn longest_at(&self, text: &str, start: usize) -> Option<(usize, usize)> {
        let mut node = 0;
        let mut best = None;
        let mut chars = text[start..].char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            let mut dead = false;
            for lower in c.to_lowercase() {
                match self.nodes[node].children.get(&lower) {
                    Some(&next) => node = next,
                    None => {
                        dead = true;
                        break;
                    }
                }
            }
            if dead {
                break;
            }
            if let Some(group) = self.nodes[node].terminal {
                let end = start + offset + c.len_utf8();
                let next = chars.peek().map(|&(_, n)| n);
                let ends_word = !is_word_char(c) || !next.is_some_and(is_word_char);
                if ends_word {
                    best = Some((end, group));
                }
            }
        }
        best
    }

    /// Pick one entry among those sharing a source term.
    fn resolve(&self, group: usize, domain: Option<&str>) -> &'g GlossaryEntry {
        let entries = self.glossary.entries();
        let positions = &self.groups[group].entries;
        let mut best = positions[0];
        for &candidate in &positions[1..] {
            if compare_candidates(&entries[candidate], &entries[best], domain) == Ordering::Greater {
                best = candidate;
            }
        }
        &entries[best]
    }

    /// Merge canonical target terms into a raw translation.
    ///
    /// With alignment, each span is substituted at its aligned target range.
    /// Spans without a usable alignment fall back, in order, to replacing a
    /// verbatim (untranslated) occurrence of the source term, to accepting a
    /// target term the backend already produced, and finally to an explicit
    /// annotation. Nothing is dropped silently.
    pub fn apply_to_target(
        &self,
        spans: &[MatchSpan],
        target: &str,
        alignment: Option<&[SpanAlignment]>,
    ) -> AppliedTerms {
        apply_terms(spans, target, alignment)
    }
}

/// Ranking used to choose between entries with the same source term.
fn compare_candidates(a: &GlossaryEntry, b: &GlossaryEntry, domain: Option<&str>) -> Ordering {
    domain_rank(a, domain)
        .cmp(&domain_rank(b, domain))
        .then_with(|| a.confidence.total_cmp(&b.confidence))
        .then_with(|| b.last_updated.cmp(&a.last_updated))
}

fn domain_rank(entry: &GlossaryEntry, domain: Option<&str>) -> u8 {
    match domain.map(str::trim).filter(|d| !d.is_empty()) {
        None => 0,
        Some(domain) if entry.context.trim().eq_ignore_ascii_case(domain) => 2,
        Some(domain) if context_matches(&entry.context, domain) => 1,
        Some(_) => 0,
    }
}

struct Placement {
    span_idx: usize,
    start: usize,
    end: usize,
    outcome: ApplyOutcome,
}

/// Merge canonical target terms for `spans` into `target`; see `TermMatcher::apply_to_target`.
pub fn apply_terms(spans: &[MatchSpan], target: &str, alignment: Option<&[SpanAlignment]>) -> AppliedTerms {
    if spans.is_empty() {
        return AppliedTerms {
            text: target.to_string(),
            substitutions: Vec::new(),
            annotations: Vec::new(),
            mode: SubstitutionMode::None,
        };
    }

    let mut outcomes: Vec<ApplyOutcome> = vec![ApplyOutcome::Annotated; spans.len()];
    let mut placements: Vec<Placement> = Vec::new();

    let overlaps_placed = |placements: &[Placement], start: usize, end: usize| {
        placements.iter().any(|p| start < p.end && p.start < end)
    };

    // Aligned substitutions
    if let Some(alignment) = alignment {
        for (idx, span) in spans.iter().enumerate() {
            let aligned = alignment
                .iter()
                .find(|a| a.source_start == span.start && a.source_end == span.end);
            if let Some(a) = aligned {
                // Empty ranges carry no position to substitute at
                let valid = a.target_start < a.target_end
                    && a.target_end <= target.len()
                    && target.is_char_boundary(a.target_start)
                    && target.is_char_boundary(a.target_end);
                if valid && !overlaps_placed(&placements, a.target_start, a.target_end) {
                    placements.push(Placement {
                        span_idx: idx,
                        start: a.target_start,
                        end: a.target_end,
                        outcome: ApplyOutcome::Aligned,
                    });
                    outcomes[idx] = ApplyOutcome::Aligned;
                }
            }
        }
    }

    // Untranslated source terms left in the output
    for (idx, span) in spans.iter().enumerate() {
        if outcomes[idx] != ApplyOutcome::Annotated {
            continue;
        }
        let mut from = 0;
        while let Some((start, end)) = find_word_ci(target, &span.resolved_entry.source_term, from) {
            if !overlaps_placed(&placements, start, end) {
                placements.push(Placement {
                    span_idx: idx,
                    start,
                    end,
                    outcome: ApplyOutcome::Verbatim,
                });
                outcomes[idx] = ApplyOutcome::Verbatim;
                break;
            }
            from = end;
        }
    }

    // Target terms the backend already used
    for (idx, span) in spans.iter().enumerate() {
        if outcomes[idx] == ApplyOutcome::Annotated
            && find_word_ci(target, &span.resolved_entry.target_term, 0).is_some()
        {
            outcomes[idx] = ApplyOutcome::AlreadyPresent;
        }
    }

    // Rebuild the text left to right so final ranges are known
    placements.sort_by_key(|p| p.start);
    let mut text = String::with_capacity(target.len());
    let mut ranges: Vec<Option<(usize, usize)>> = vec![None; spans.len()];
    let mut cursor = 0;
    for placement in &placements {
        text.push_str(&target[cursor..placement.start]);
        let begin = text.len();
        text.push_str(&spans[placement.span_idx].resolved_entry.target_term);
        ranges[placement.span_idx] = Some((begin, text.len()));
        cursor = placement.end;
        debug_assert_eq!(outcomes[placement.span_idx], placement.outcome);
    }
    text.push_str(&target[cursor..]);

    let substitutions = spans
        .iter()
        .enumerate()
        .map(|(idx, span)| TermSubstitution {
            source_start: span.start,
            source_end: span.end,
            outcome: outcomes[idx],
            target_range: ranges[idx],
        })
        .collect::<Vec<_>>();

    let annotations: Vec<TermAnnotation> = spans
        .iter()
        .zip(&outcomes)
        .filter(|(_, outcome)| **outcome == ApplyOutcome::Annotated)
        .map(|(span, _)| TermAnnotation::from_span(span))
        .collect();

    let mode = if annotations.is_empty() {
        SubstitutionMode::InPlace
    } else {
        SubstitutionMode::Annotated
    };
    if mode == SubstitutionMode::Annotated {
        debug!(
            "{} of {} glossary terms could not be placed and were annotated",
            annotations.len(),
            spans.len()
        );
    }

    AppliedTerms {
        text,
        substitutions,
        annotations,
        mode,
    }
}

/// Case-insensitive, word-bounded search for `needle` in `haystack` from byte `from`.
fn find_word_ci(haystack: &str, needle: &str, from: usize) -> Option<(usize, usize)> {
    let needle: Vec<char> = lowercase_chars(needle.trim()).collect();
    let first = *needle.first()?;
    let last = *needle.last()?;
    let mut prev: Option<char> = haystack[..from].chars().next_back();

    for (start, c) in haystack[from..].char_indices().map(|(i, c)| (i + from, c)) {
        let bounded_start = !is_word_char(first) || !prev.is_some_and(is_word_char);
        prev = Some(c);
        if !bounded_start {
            continue;
        }

        let mut expected = needle.iter();
        let mut end = None;
        let mut chars = haystack[start..].char_indices().peekable();
        'scan: while let Some((offset, hc)) = chars.next() {
            for lower in hc.to_lowercase() {
                match expected.next() {
                    Some(&e) if e == lower => {}
                    _ => break 'scan,
                }
            }
            if expected.len() == 0 {
                let next = chars.peek().map(|&(_, n)| n);
                if is_word_char(last) && next.is_some_and(is_word_char) {
                    break 'scan;
                }
                end = Some(start + offset + hc.len_utf8());
                break;
            }
        }
        if let Some(end) = end {
            return Some((start, end));
        }
    }
    None
}
