//! Storage collaborators.
//!
//! The ranking and retrieval code never talks to a database directly. It sees the corpus
//! through [`GraphSource`], the term index through [`IndexStore`], and loaders write through
//! [`CorpusSink`]. Any failure of the backing store surfaces as
//! [`SearchError::StorageUnavailable`](crate::SearchError::StorageUnavailable).

mod memory;
mod sled_store;

pub use memory::MemoryStore;
pub use sled_store::SledStore;

use crate::{DocId, Document, Link, Posting, Result};

/// Read side of the corpus: documents and the links between them.
pub trait GraphSource {
    /// All documents, ordered by id.
    fn list_documents(&self) -> Result<Vec<Document>>;
    fn list_links(&self) -> Result<Vec<Link>>;
    fn fetch_document(&self, id: DocId) -> Result<Option<Document>>;
}

/// Terms and postings. Written only by the index builder.
pub trait IndexStore {
    fn clear_postings_and_terms(&self) -> Result<()>;

    /// Creates the term if unseen, else reuses its id. Replaces an existing posting for the
    /// same (term, document) pair.
    fn upsert_posting(&self, term: &str, doc_id: DocId, tf: u32) -> Result<()>;

    fn upsert_postings(&self, doc_id: DocId, term_freqs: &[(String, u32)]) -> Result<()> {
        for (term, tf) in term_freqs {
            self.upsert_posting(term, doc_id, *tf)?;
        }
        Ok(())
    }

    /// Postings for `term`, sorted by document id ascending. Unknown terms yield an empty list.
    fn fetch_postings(&self, term: &str) -> Result<Vec<Posting>>;

    fn term_count(&self) -> Result<usize>;
    fn posting_count(&self) -> Result<usize>;
}

/// Write side of the corpus, used by dataset loaders.
pub trait CorpusSink {
    /// Inserts or updates the document with this url and returns its id.
    fn upsert_document(&self, url: &str, title: &str, content: &str) -> Result<DocId>;

    /// Adds one link per url, creating empty placeholder documents for urls not seen yet.
    /// Returns the number of links written.
    fn insert_links(&self, from: DocId, to_urls: &[String]) -> Result<usize>;

    /// Removes documents, links, terms and postings.
    fn clear_corpus(&self) -> Result<()>;
}

/// Everything the engine needs from one storage substrate.
pub trait Store: GraphSource + IndexStore + CorpusSink + Send + Sync {}

impl<T: GraphSource + IndexStore + CorpusSink + Send + Sync> Store for T {}
