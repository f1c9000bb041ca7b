//! Query answering over the inverted index.
//!
//! Both strategies start from the same [`QueryPostings`] (normalized terms and their posting
//! lists) and finish through the same blend-and-sort step, so they differ only in how
//! candidates are collected:
//!
//! - **intersect** (document-at-a-time): merge-joins the sorted lists; a document must contain
//!   every query term.
//! - **union** (term-at-a-time): accumulates frequencies list by list; one matching term is
//!   enough.
//!
//! Ties on the final score keep retrieval order. For intersect that is ascending document id,
//! for union it is the order in which documents were first seen walking the lists in query
//! order.

use crate::rank::RankVector;
use crate::store::IndexStore;
use crate::tokenizer;
use crate::{DocId, Posting, Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Intersect,
    Union,
}

impl std::str::FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "intersect" | "and" | "documents" => Ok(SearchMode::Intersect),
            "union" | "or" | "terms" => Ok(SearchMode::Union),
            other => Err(SearchError::InvalidParameter(format!("unknown search mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOptions {
    /// Weight of the authority score added to the term-frequency score.
    pub alpha: f64,
    /// Keep only the first `limit` results.
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { alpha: DEFAULT_ALPHA, limit: None }
    }
}

impl SearchOptions {
    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(SearchError::InvalidParameter(format!("alpha must be finite and >= 0, got {}", self.alpha)));
        }
        Ok(())
    }
}

/// Ranked (document, score) pairs, best first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResult {
    entries: Vec<(DocId, f64)>,
}

impl SearchResult {
    pub fn entries(&self) -> &[(DocId, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn doc_ids(&self) -> Vec<DocId> {
        self.entries.iter().map(|&(id, _)| id).collect()
    }

    pub fn score(&self, doc_id: DocId) -> Option<f64> {
        self.entries.iter().find(|(id, _)| *id == doc_id).map(|&(_, s)| s)
    }

    pub fn truncate(&mut self, limit: usize) {
        self.entries.truncate(limit);
    }

    /// How many of the first `k` documents the two results share.
    pub fn top_overlap(&self, other: &SearchResult, k: usize) -> usize {
        let theirs: Vec<DocId> = other.entries.iter().take(k).map(|&(id, _)| id).collect();
        self.entries.iter().take(k).filter(|(id, _)| theirs.contains(id)).count()
    }

    pub fn into_entries(self) -> Vec<(DocId, f64)> {
        self.entries
    }
}

/// Normalized query terms with their posting lists, in query order. Repeated terms are kept
/// and count once per occurrence.
#[derive(Debug, Clone, Default)]
pub struct QueryPostings {
    terms: Vec<String>,
    lists: Vec<Vec<Posting>>,
}

impl QueryPostings {
    /// Tokenizes raw query text the same way documents are tokenized.
    pub fn from_query<S: IndexStore + ?Sized>(store: &S, query: &str) -> Result<Self> {
        Self::fetch(store, tokenizer::terms(query))
    }

    /// Uses already-split terms; they are trimmed and lower-cased, empty ones dropped.
    pub fn fetch<S, I, T>(store: &S, terms: I) -> Result<Self>
    where
        S: IndexStore + ?Sized,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        let lists = terms.iter().map(|t| store.fetch_postings(t)).collect::<Result<Vec<_>>>()?;
        Ok(Self { terms, lists })
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Document-at-a-time AND retrieval.
pub fn search_intersect(query: &QueryPostings, authority: Option<&RankVector>, alpha: f64) -> SearchResult {
    let lists = &query.lists;
    if lists.is_empty() || lists.iter().any(Vec::is_empty) {
        return SearchResult::default();
    }

    let mut cursors = vec![0usize; lists.len()];
    let mut matches: Vec<(DocId, f64)> = Vec::new();
    'merge: loop {
        let mut max_id = 0;
        let mut min_id = DocId::MAX;
        for (plist, &cur) in lists.iter().zip(&cursors) {
            let Some(p) = plist.get(cur) else { break 'merge };
            max_id = max_id.max(p.doc_id);
            min_id = min_id.min(p.doc_id);
        }

        if max_id == min_id {
            let score: f64 = lists.iter().zip(&cursors).map(|(plist, &cur)| plist[cur].tf as f64).sum();
            matches.push((max_id, score));
            for cur in cursors.iter_mut() {
                *cur += 1;
            }
        } else {
            for (plist, cur) in lists.iter().zip(cursors.iter_mut()) {
                while *cur < plist.len() && plist[*cur].doc_id < max_id {
                    *cur += 1;
                }
            }
        }
    }

    finish(matches, authority, alpha)
}

/// Term-at-a-time OR retrieval.
pub fn search_union(query: &QueryPostings, authority: Option<&RankVector>, alpha: f64) -> SearchResult {
    let capacity = query.lists.iter().map(Vec::len).sum();
    let mut slot: HashMap<DocId, usize> = HashMap::with_capacity(capacity);
    let mut scores: Vec<(DocId, f64)> = Vec::with_capacity(capacity);
    for plist in &query.lists {
        for p in plist {
            let idx = *slot.entry(p.doc_id).or_insert_with(|| {
                scores.push((p.doc_id, 0.0));
                scores.len() - 1
            });
            scores[idx].1 += p.tf as f64;
        }
    }
    finish(scores, authority, alpha)
}

/// Adds `alpha * authority` and sorts by descending score. The sort is stable, so ties keep
/// the order candidates were produced in.
fn finish(mut candidates: Vec<(DocId, f64)>, authority: Option<&RankVector>, alpha: f64) -> SearchResult {
    if let Some(ranks) = authority {
        if alpha != 0.0 {
            for (doc_id, score) in candidates.iter_mut() {
                *score += alpha * ranks.get(*doc_id).unwrap_or(0.0);
            }
        }
    }
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
    SearchResult { entries: candidates }
}

/// Retrieval bound to one index store.
pub struct Retriever<'a, S: IndexStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: IndexStore + ?Sized> Retriever<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn search(
        &self,
        mode: SearchMode,
        query: &str,
        authority: Option<&RankVector>,
        opts: SearchOptions,
    ) -> Result<SearchResult> {
        opts.validate()?;
        let postings = QueryPostings::from_query(self.store, query)?;
        let mut result = match mode {
            SearchMode::Intersect => search_intersect(&postings, authority, opts.alpha),
            SearchMode::Union => search_union(&postings, authority, opts.alpha),
        };
        if let Some(limit) = opts.limit {
            result.truncate(limit);
        }
        tracing::debug!(?mode, terms = postings.terms().len(), hits = result.len(), "query answered");
        Ok(result)
    }
}
