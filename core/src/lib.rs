//! Core of a small link-aware search engine: PageRank-style authority over the document
//! graph, an inverted term index, and AND/OR retrieval that blends both signals.

pub mod builder;
pub mod engine;
pub mod error;
pub mod index;
pub mod loader;
pub mod persist;
pub mod rank;
pub mod retrieval;
pub mod snippet;
pub mod store;
pub mod tokenizer;

pub use engine::SearchEngine;
pub use error::{Result, SearchError};
pub use index::{DocId, Document, Link, Posting, SearchHit, TermId};
