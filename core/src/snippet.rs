//! Result snippets with query terms wrapped in `<em>`.

use regex::{Regex, RegexBuilder};

const LEAD: usize = 100;
const WINDOW: usize = 200;

/// Case-insensitive matcher for a set of query terms, applied in a single pass.
pub struct Highlighter {
    pattern: Option<Regex>,
}

impl Highlighter {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Self {
        let mut terms: Vec<&str> = terms.iter().map(|t| t.as_ref().trim()).filter(|t| !t.is_empty()).collect();
        // longest first so the alternation prefers "searching" over "search"
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();
        if terms.is_empty() {
            return Self { pattern: None };
        }
        let alternation = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
        let pattern = RegexBuilder::new(&format!("(?:{alternation})")).case_insensitive(true).build();
        if let Err(e) = &pattern {
            tracing::warn!(error = %e, "highlight pattern rejected; snippets will not be highlighted");
        }
        Self { pattern: pattern.ok() }
    }

    /// A window of `text` around the first term occurrence, or its opening characters when
    /// no term occurs. `None` for empty text.
    pub fn snippet(&self, text: &str) -> Option<String> {
        if text.is_empty() {
            return None;
        }
        let first = self.pattern.as_ref().and_then(|p| p.find(text)).map(|m| m.start());
        let window = match first {
            Some(idx) => {
                let start = floor_boundary(text, idx.saturating_sub(LEAD));
                let end = floor_boundary(text, (idx + WINDOW).min(text.len()));
                &text[start..end]
            }
            None => &text[..floor_boundary(text, WINDOW.min(text.len()))],
        };
        Some(self.highlight(window))
    }

    pub fn highlight(&self, text: &str) -> String {
        match &self.pattern {
            Some(p) => p.replace_all(text, "<em>$0</em>").into_owned(),
            None => text.to_string(),
        }
    }
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_respects_char_boundaries() {
        let text = format!("{}Поиск и ранжирование", "я".repeat(120));
        let snippet = Highlighter::new(&["поиск"]).snippet(&text).unwrap();
        assert!(snippet.contains("<em>Поиск</em>"));
    }

    #[test]
    fn snippet_falls_back_to_prefix() {
        let h = Highlighter::new(&["absent"]);
        assert_eq!(h.snippet("plain text here").unwrap(), "plain text here");
        assert!(h.snippet("").is_none());
        let long = "ж".repeat(300);
        assert_eq!(h.snippet(&long).unwrap().chars().count(), 100);
    }

    #[test]
    fn markup_is_never_rewrapped() {
        let h = Highlighter::new(&["rust", "em"]);
        assert_eq!(h.snippet("Rust is great").unwrap(), "<em>Rust</em> is great");
        assert_eq!(h.highlight("them"), "th<em>em</em>");
    }

    #[test]
    fn longer_terms_win_overlaps() {
        let h = Highlighter::new(&["search", "searching"]);
        assert_eq!(h.highlight("Searching"), "<em>Searching</em>");
    }

    #[test]
    fn no_terms_leaves_text_untouched() {
        let h = Highlighter::new::<&str>(&[]);
        assert_eq!(h.snippet("a < b").unwrap(), "a < b");
    }
}
