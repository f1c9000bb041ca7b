use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // ASCII letters, extended Latin (Latin-1 letters through Latin Extended-B, minus × and ÷),
    // Cyrillic, digits.
    static ref RE: Regex = Regex::new(
        r"[0-9A-Za-z\x{00C0}-\x{00D6}\x{00D8}-\x{00F6}\x{00F8}-\x{024F}\x{0400}-\x{04FF}]+"
    )
    .expect("valid regex");
}

/// Tokenize text into (term, position) using NFKC normalization and lowercasing.
pub fn tokenize(text: &str) -> Vec<(String, usize)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .enumerate()
        .map(|(pos, mat)| (mat.as_str().to_string(), pos))
        .collect()
}

/// Query-side view of [`tokenize`]: terms in order, duplicates kept.
pub fn terms(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|(t, _)| t).collect()
}

/// Occurrence count per distinct term, ordered by term text.
pub fn term_frequencies(text: &str) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for (term, _pos) in tokenize(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}
