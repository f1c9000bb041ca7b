use serde::{Deserialize, Serialize};

pub type TermId = u32;
pub type DocId = u32;

/// A corpus record as handed out by the graph source.
///
/// `url` and `content` are optional on the wire so that a damaged row can still be listed
/// and skipped by the index build instead of failing the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    pub content: Option<String>,
}

impl Document {
    pub fn new(id: DocId, url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id, url: Some(url.into()), title: title.into(), content: Some(content.into()) }
    }

    /// Placeholder for a document that is linked to but has not been fetched yet.
    pub fn placeholder(id: DocId, url: impl Into<String>) -> Self {
        Self::new(id, url, "", "")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub from: DocId,
    pub to: DocId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32, // raw occurrence count, always >= 1
}

/// One ranked document with its display metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub title: String,
    pub url: Option<String>,
    /// Content window with query terms wrapped in `<em>`; absent for documents with no text.
    pub snippet: Option<String>,
}
