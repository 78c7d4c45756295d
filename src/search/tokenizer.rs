use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("word pattern is valid"));

/// Folded text that remembers, for every folded char, which original char produced it.
///
/// Folding can expand one char into several (`İ` lowercases to two chars) or drop
/// marks entirely, so highlight offsets found in folded text are mapped back through
/// `origin` before they reach a caller.
#[derive(Debug, Clone, Default)]
pub struct FoldedText {
    pub chars: Vec<char>,
    pub origin: Vec<usize>,
}

impl FoldedText {
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

/// Lowercases and strips diacritics from a single char.
fn fold_char(c: char, out: &mut impl FnMut(char)) {
    // Letters with a stroke have no canonical decomposition.
    let base = match c {
        'đ' | 'Đ' => Some('d'),
        'ł' | 'Ł' => Some('l'),
        'ø' | 'Ø' => Some('o'),
        _ => None,
    };
    if let Some(base) = base {
        out(base);
        return;
    }

    for decomposed in std::iter::once(c).nfd() {
        if is_combining_mark(decomposed) {
            continue;
        }
        for lower in decomposed.to_lowercase() {
            out(lower);
        }
    }
}

/// Folds text for comparison: NFD, combining marks removed, lowercased.
pub fn fold(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars() {
        fold_char(c, &mut |f| folded.push(f));
    }
    folded
}

pub fn fold_with_offsets(text: &str) -> FoldedText {
    let mut folded = FoldedText::default();
    for (idx, c) in text.chars().enumerate() {
        fold_char(c, &mut |f| {
            folded.chars.push(f);
            folded.origin.push(idx);
        });
    }
    folded
}

/// Folds and collapses whitespace, the form stored in the index's searchable blob.
pub fn normalize(text: &str) -> String {
    fold(text).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Half-open `[start, end)` ranges of alphanumeric runs.
pub fn word_spans(chars: &[char]) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = None;

    for (idx, c) in chars.iter().enumerate() {
        match (c.is_alphanumeric(), start) {
            (true, None) => start = Some(idx),
            (false, Some(s)) => {
                spans.push((s, idx));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, chars.len()));
    }

    spans
}

/// Folded query words in order, punctuation dropped, duplicates removed.
pub fn tokenize_query(query: &str) -> Vec<String> {
    let folded = fold(query);
    let mut tokens: Vec<String> = Vec::new();

    for word in WORD.find_iter(&folded) {
        let word = word.as_str().to_string();
        if !tokens.contains(&word) {
            tokens.push(word);
        }
    }

    tokens
}
