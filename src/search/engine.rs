//! Query engine.
//!
//! Scores every index entry against a prepared query and returns ranked hits with
//! highlight spans. Pure and synchronous: the same index and query always produce the
//! same output.
//!
//! ## Scoring
//! Name and description are scored independently and the name score is weighted
//! three times. Within a field:
//! - the whole query found verbatim earns a phrase bonus (multi-word queries only),
//!   more if the field starts with it, more again if the field is exactly the query;
//! - every query token found as a substring earns a token score, plus a bonus when it
//!   starts a word;
//! - tokens of four or more chars without a substring hit may fuzzy-match a whole word;
//! - a field that contains every token earns a completeness bonus.
//!
//! Tokens found only in the searchable blob (the category name) add a small amount.

use super::tokenizer::{FoldedText, fold_with_offsets, tokenize_query, word_spans};
use super::types::{
    FieldHighlights, HighlightSpan, IndexEntry, SearchHit, SearchIndex, SearchOutcome,
};

use std::cmp::Ordering;

const EXACT_BONUS: u32 = 40;
const PHRASE_BONUS: u32 = 30;
const PREFIX_BONUS: u32 = 20;
const ALL_TOKENS_BONUS: u32 = 15;
const TOKEN_SCORE: u32 = 10;
const FUZZY_SCORE: u32 = 6;
const WORD_START_BONUS: u32 = 5;
const BLOB_ONLY_SCORE: u32 = 2;
const NAME_WEIGHT: u32 = 3;

const FUZZY_MIN_CHARS: usize = 4;
const FUZZY_WIDE_CHARS: usize = 8;

/// A query that passed the length check, folded and split into tokens.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub text: String,
    tokens: Vec<Token>,
    full: Vec<char>,
}

#[derive(Debug, Clone)]
struct Token {
    text: String,
    chars: Vec<char>,
}

/// Returns `None` for queries shorter than `min_chars` (after trimming) or without any
/// word characters. Callers must not consult the index in that case.
pub fn prepare_query(raw: &str, min_chars: usize) -> Option<PreparedQuery> {
    let text = raw.trim();
    if text.chars().count() < min_chars {
        return None;
    }

    let tokens: Vec<Token> = tokenize_query(text)
        .into_iter()
        .map(|text| Token {
            chars: text.chars().collect(),
            text,
        })
        .collect();
    if tokens.is_empty() {
        return None;
    }

    let full = tokens
        .iter()
        .map(|token| token.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .collect();

    Some(PreparedQuery {
        text: text.to_string(),
        tokens,
        full,
    })
}

/// Parses a raw `limit` parameter. Missing or malformed values fall back to
/// `default`; numbers are clamped to `1..=max`, including ones too large to parse.
pub fn clamp_limit(raw: Option<&str>, default: usize, max: usize) -> usize {
    let max = max.max(1);
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => default.clamp(1, max),
        Some(value) => match value.parse::<i64>() {
            Ok(n) => n.clamp(1, max as i64) as usize,
            Err(_) if is_integer(value) => {
                if value.starts_with('-') { 1 } else { max }
            }
            Err(_) => {
                tracing::debug!("Ignoring malformed limit '{}', using {}", value, default);
                default.clamp(1, max)
            }
        },
    }
}

fn is_integer(value: &str) -> bool {
    let digits = value.strip_prefix(['+', '-']).unwrap_or(value);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn search(index: &SearchIndex, query: &PreparedQuery, limit: usize) -> SearchOutcome {
    let mut hits: Vec<SearchHit> = index
        .entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| score_entry(position, entry, query))
        .collect();

    hits.sort_by(rank);

    let total = hits.len();
    hits.truncate(limit);

    SearchOutcome { total, hits }
}

fn rank(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.name_matched.cmp(&a.name_matched))
        .then_with(|| a.position.cmp(&b.position))
}

fn score_entry(position: usize, entry: &IndexEntry, query: &PreparedQuery) -> Option<SearchHit> {
    let fuzzy_possible = query
        .tokens
        .iter()
        .any(|token| token.chars.len() >= FUZZY_MIN_CHARS);
    let in_blob = query
        .tokens
        .iter()
        .any(|token| entry.searchable.contains(token.text.as_str()));
    if !in_blob && !fuzzy_possible {
        return None;
    }

    let name = prepare_field(&entry.name);
    let description = prepare_field(&entry.description);
    let name_match = match_field(&name, query);
    let description_match = match_field(&description, query);

    let blob_only = query
        .tokens
        .iter()
        .enumerate()
        .filter(|(idx, token)| {
            !name_match.matched[*idx]
                && !description_match.matched[*idx]
                && entry.searchable.contains(token.text.as_str())
        })
        .count() as u32;

    let score =
        name_match.score * NAME_WEIGHT + description_match.score + blob_only * BLOB_ONLY_SCORE;
    if score == 0 {
        return None;
    }

    Some(SearchHit {
        position,
        entry: entry.clone(),
        score,
        name_matched: name_match.score > 0,
        highlights: FieldHighlights {
            name: to_highlights(&name, name_match.spans),
            description: to_highlights(&description, description_match.spans),
        },
    })
}

/// Folds a field and collapses whitespace runs to a single space so multi-word
/// queries match regardless of spacing.
fn prepare_field(text: &str) -> FoldedText {
    let folded = fold_with_offsets(text);
    let mut collapsed = FoldedText::default();

    for (c, origin) in folded.chars.into_iter().zip(folded.origin) {
        if c.is_whitespace() {
            if collapsed.chars.last().is_none_or(|&last| last == ' ') {
                continue;
            }
            collapsed.chars.push(' ');
        } else {
            collapsed.chars.push(c);
        }
        collapsed.origin.push(origin);
    }
    if collapsed.chars.last() == Some(&' ') {
        collapsed.chars.pop();
        collapsed.origin.pop();
    }

    collapsed
}

struct FieldMatch {
    score: u32,
    /// Half-open ranges in folded coordinates.
    spans: Vec<(usize, usize)>,
    /// Per query token: found in this field (substring or fuzzy).
    matched: Vec<bool>,
}

fn match_field(field: &FoldedText, query: &PreparedQuery) -> FieldMatch {
    let mut result = FieldMatch {
        score: 0,
        spans: Vec::new(),
        matched: vec![false; query.tokens.len()],
    };
    if field.is_empty() {
        return result;
    }

    let full_hits = find_all(&field.chars, &query.full);
    if let Some(&first) = full_hits.first() {
        if query.tokens.len() > 1 {
            result.score += PHRASE_BONUS;
        }
        if first == 0 {
            result.score += PREFIX_BONUS;
        }
        if field.chars == query.full {
            result.score += EXACT_BONUS;
        }
        result
            .spans
            .extend(full_hits.iter().map(|&start| (start, start + query.full.len())));
    }

    let words = word_spans(&field.chars);
    for (idx, token) in query.tokens.iter().enumerate() {
        let hits = find_all(&field.chars, &token.chars);
        if !hits.is_empty() {
            result.matched[idx] = true;
            result.score += TOKEN_SCORE;
            if hits
                .iter()
                .any(|&start| words.iter().any(|&(word_start, _)| word_start == start))
            {
                result.score += WORD_START_BONUS;
            }
            result
                .spans
                .extend(hits.iter().map(|&start| (start, start + token.chars.len())));
        } else if let Some(span) = fuzzy_word(&field.chars, &words, token) {
            result.matched[idx] = true;
            result.score += FUZZY_SCORE;
            result.spans.push(span);
        }
    }

    if result.matched.iter().all(|&found| found) {
        result.score += ALL_TOKENS_BONUS;
    }

    result
}

/// Start offsets of non-overlapping occurrences of `needle`.
fn find_all(haystack: &[char], needle: &[char]) -> Vec<usize> {
    let mut starts = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return starts;
    }

    let mut idx = 0;
    while idx + needle.len() <= haystack.len() {
        if haystack[idx..idx + needle.len()] == *needle {
            starts.push(idx);
            idx += needle.len();
        } else {
            idx += 1;
        }
    }

    starts
}

/// Closest word within the edit budget for this token length, first one wins ties.
fn fuzzy_word(chars: &[char], words: &[(usize, usize)], token: &Token) -> Option<(usize, usize)> {
    let len = token.chars.len();
    if len < FUZZY_MIN_CHARS {
        return None;
    }
    let budget = if len >= FUZZY_WIDE_CHARS { 2 } else { 1 };

    let mut best: Option<((usize, usize), usize)> = None;
    for &(start, end) in words {
        // Words much longer or shorter than the token can never be within budget.
        if (end - start).abs_diff(len) > budget {
            continue;
        }
        let word: String = chars[start..end].iter().collect();
        let distance = strsim::damerau_levenshtein(&token.text, &word);
        if distance <= budget && best.is_none_or(|(_, d)| distance < d) {
            best = Some(((start, end), distance));
        }
    }

    best.map(|(span, _)| span)
}

/// Maps folded half-open ranges to merged, inclusive ranges over the original chars.
fn to_highlights(field: &FoldedText, spans: Vec<(usize, usize)>) -> Vec<HighlightSpan> {
    let mut mapped: Vec<HighlightSpan> = spans
        .into_iter()
        .filter(|&(start, end)| start < end && end <= field.origin.len())
        .map(|(start, end)| HighlightSpan(field.origin[start], field.origin[end - 1]))
        .collect();
    mapped.sort();

    let mut merged: Vec<HighlightSpan> = Vec::with_capacity(mapped.len());
    for span in mapped {
        match merged.last_mut() {
            Some(last) if span.0 <= last.1 + 1 => last.1 = last.1.max(span.1),
            _ => merged.push(span),
        }
    }

    merged
}
