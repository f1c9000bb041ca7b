use minisearch_core::tokenizer::{terms, tokenize};

#[test]
fn it_lowercases_latin_and_cyrillic() {
    let words = terms("Поисковая СИСТЕМА and Café Ñandú");
    assert_eq!(words, vec!["поисковая", "система", "and", "café", "ñandú"]);
}

#[test]
fn it_keeps_digits_and_splits_on_punctuation() {
    let words = terms("web-2.0 (page_rank) 1998×2");
    assert_eq!(words, vec!["web", "2", "0", "page", "rank", "1998", "2"]);
}

#[test]
fn it_reports_positions_in_token_order() {
    let toks = tokenize("one, two; three");
    let positions: Vec<usize> = toks.iter().map(|(_, p)| *p).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn empty_text_has_no_tokens() {
    assert!(tokenize("").is_empty());
    assert!(tokenize("  ... !!! ").is_empty());
}
