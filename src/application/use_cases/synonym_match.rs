//! Header text to canonical column matching
//!
//! Shared by the header locator (scoring rows) and the column mapper
//! (assigning cells). Input text is expected to be normalized with
//! [`crate::shared::text::normalize`].

use crate::domain::columns::CanonicalColumn;
use crate::shared::text::{bounded_edit_distance, contains_words};

/// Synonyms shorter than this only match on word boundaries
const SHORT_SYNONYM_LEN: usize = 5;
/// Fuzzy matching applies to synonyms at least this long
const FUZZY_MIN_LEN: usize = 5;
const FUZZY_MAX_DISTANCE: usize = 2;
const SUBSTRING_CAP: f64 = 0.95;
const FUZZY_CAP: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Substring,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynonymMatch {
    pub column: CanonicalColumn,
    pub kind: MatchKind,
    pub confidence: f64,
}

/// Best match of a normalized cell against one canonical column
pub fn match_column(cell: &str, column: CanonicalColumn) -> Option<SynonymMatch> {
    if cell.is_empty() {
        return None;
    }

    let mut best: Option<SynonymMatch> = None;

    for synonym in column.synonyms() {
        let Some((kind, confidence)) = match_synonym(cell, synonym) else {
            continue;
        };

        if best.map(|b| confidence > b.confidence).unwrap_or(true) {
            best = Some(SynonymMatch {
                column,
                kind,
                confidence,
            });
        }
    }

    best
}

/// Every column the cell matches, strongest first.
/// Ties keep canonical column order so results are deterministic.
pub fn candidates(cell: &str) -> Vec<SynonymMatch> {
    let mut matches: Vec<SynonymMatch> = CanonicalColumn::ALL
        .iter()
        .filter_map(|column| match_column(cell, *column))
        .collect();

    // stable sort keeps ALL order on ties
    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches
}

pub fn best_match(cell: &str) -> Option<SynonymMatch> {
    candidates(cell).into_iter().next()
}

fn match_synonym(cell: &str, synonym: &str) -> Option<(MatchKind, f64)> {
    if cell == synonym {
        return Some((MatchKind::Exact, 1.0));
    }

    let cell_len = cell.chars().count();
    let syn_len = synonym.chars().count();

    if contains(cell, synonym) || (cell_len >= 3 && contains(synonym, cell)) {
        let ratio = cell_len.min(syn_len) as f64 / cell_len.max(syn_len) as f64;
        let confidence = (0.5 + 0.45 * ratio).min(SUBSTRING_CAP);
        return Some((MatchKind::Substring, confidence));
    }

    if syn_len >= FUZZY_MIN_LEN {
        if let Some(distance) = bounded_edit_distance(cell, synonym, FUZZY_MAX_DISTANCE) {
            let confidence = (1.0 - distance as f64 / syn_len as f64).min(FUZZY_CAP);
            return Some((MatchKind::Fuzzy, confidence));
        }
    }

    None
}

fn contains(haystack: &str, needle: &str) -> bool {
    if needle.chars().count() < SHORT_SYNONYM_LEN {
        contains_words(haystack, needle)
    } else {
        haystack.contains(needle)
    }
}
