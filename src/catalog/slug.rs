//! URL slugs.
//!
//! Slugs are derived from display names with the same folding the search index uses,
//! so `Áo thun basic` becomes `ao-thun-basic`.

use crate::search::tokenizer::{fold, word_spans};

const FALLBACK_SLUG: &str = "item";

pub fn slugify(text: &str) -> String {
    let folded: Vec<char> = fold(text).chars().collect();
    let slug = word_spans(&folded)
        .into_iter()
        .map(|(start, end)| folded[start..end].iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// A requested slug is accepted only if it is already in canonical form.
pub fn is_canonical(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug) == slug
}

/// Returns `base`, or `base-2`, `base-3`, ... whichever is free first.
pub fn unique_slug(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }

    let mut suffix = 2u32;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
