use crate::store::IndexStore;
use crate::tokenizer::term_frequencies;
use crate::{Document, Result, SearchError};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub postings_written: usize,
    pub terms: usize,
}

/// Rebuilds the inverted index from scratch.
///
/// Each call clears all terms and postings before repopulating them, so running it again
/// over an unchanged corpus yields the same posting set. Term ids are not preserved across
/// rebuilds.
pub struct IndexBuilder<'a, S: IndexStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: IndexStore + ?Sized> IndexBuilder<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn build(&self, documents: &[Document]) -> Result<BuildReport> {
        self.store.clear_postings_and_terms()?;

        let mut report = BuildReport::default();
        for doc in documents {
            let content = match indexable_content(doc) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping record");
                    report.documents_skipped += 1;
                    continue;
                }
            };
            let term_freqs: Vec<(String, u32)> = term_frequencies(content).into_iter().collect();
            self.store.upsert_postings(doc.id, &term_freqs)?;
            report.postings_written += term_freqs.len();
            report.documents_indexed += 1;
        }
        report.terms = self.store.term_count()?;

        tracing::info!(
            indexed = report.documents_indexed,
            skipped = report.documents_skipped,
            postings = report.postings_written,
            terms = report.terms,
            "index build complete"
        );
        Ok(report)
    }
}

/// A record needs both its locator and its content to be indexed.
fn indexable_content(doc: &Document) -> Result<&str> {
    if doc.url.is_none() {
        return Err(SearchError::MalformedRecord { id: doc.id, reason: "missing url".into() });
    }
    doc.content
        .as_deref()
        .ok_or_else(|| SearchError::MalformedRecord { id: doc.id, reason: "missing content".into() })
}
