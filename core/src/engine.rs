use crate::builder::{BuildReport, IndexBuilder};
use crate::rank::{LinkGraph, RankParams, RankVector, Strategy};
use crate::retrieval::{Retriever, SearchMode, SearchOptions, SearchResult};
use crate::snippet::Highlighter;
use crate::store::Store;
use crate::tokenizer;
use crate::{Result, SearchHit};
use parking_lot::RwLock;
use std::sync::Arc;

/// Entry point for the outer surfaces: ranking, index rebuilds and queries over one store.
///
/// Rebuilds hold the index gate exclusively for their whole run and queries hold it shared,
/// so a query never sees a partially cleared index.
pub struct SearchEngine {
    store: Arc<dyn Store>,
    index_gate: RwLock<()>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store, index_gate: RwLock::new(()) }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn compute_rank(&self, strategy: Strategy, params: RankParams) -> Result<RankVector> {
        let graph = LinkGraph::from_source(self.store.as_ref())?;
        Ok(strategy.compute(&graph, params))
    }

    pub fn compute_rank_batch(&self, params: RankParams) -> Result<RankVector> {
        self.compute_rank(Strategy::Batch, params)
    }

    pub fn compute_rank_step(&self, params: RankParams) -> Result<RankVector> {
        self.compute_rank(Strategy::Step, params)
    }

    pub fn build_index(&self) -> Result<BuildReport> {
        let _writer = self.index_gate.write();
        let documents = self.store.list_documents()?;
        IndexBuilder::new(self.store.as_ref()).build(&documents)
    }

    pub fn search(
        &self,
        mode: SearchMode,
        query: &str,
        authority: Option<&RankVector>,
        opts: SearchOptions,
    ) -> Result<SearchResult> {
        let _reader = self.index_gate.read();
        Retriever::new(self.store.as_ref()).search(mode, query, authority, opts)
    }

    pub fn search_intersect(&self, query: &str, authority: Option<&RankVector>, opts: SearchOptions) -> Result<SearchResult> {
        self.search(SearchMode::Intersect, query, authority, opts)
    }

    pub fn search_union(&self, query: &str, authority: Option<&RankVector>, opts: SearchOptions) -> Result<SearchResult> {
        self.search(SearchMode::Union, query, authority, opts)
    }

    /// Attaches title, url and a highlighted snippet to the first `limit` results. The
    /// snippet marks the same terms `query` was searched with. Ids that no longer resolve
    /// are left out.
    pub fn hydrate(&self, result: &SearchResult, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let highlighter = Highlighter::new(&tokenizer::terms(query));
        let mut hits = Vec::with_capacity(limit.min(result.len()));
        for &(doc_id, score) in result.entries().iter().take(limit) {
            if let Some(doc) = self.store.fetch_document(doc_id)? {
                let snippet = doc.content.as_deref().and_then(|text| highlighter.snippet(text));
                hits.push(SearchHit { doc_id, score, title: doc.title, url: doc.url, snippet });
            }
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CorpusSink, MemoryStore};

    fn engine() -> (Arc<MemoryStore>, SearchEngine) {
        let store = Arc::new(MemoryStore::new());
        let a = store.upsert_document("http://a", "Alpha", "search engine basics").unwrap();
        let b = store.upsert_document("http://b", "Beta", "search ranking").unwrap();
        store.insert_links(a, &["http://b".into()]).unwrap();
        store.insert_links(b, &["http://a".into()]).unwrap();
        let engine = SearchEngine::new(store.clone());
        (store, engine)
    }

    #[test]
    fn end_to_end_query_with_authority() {
        let (_store, engine) = engine();
        engine.build_index().unwrap();
        let ranks = engine.compute_rank_batch(RankParams::default()).unwrap();
        let both = engine.search_intersect("search engine", Some(&ranks), SearchOptions::default()).unwrap();
        assert_eq!(both.doc_ids(), vec![1]);
        let either = engine.search_union("search engine", Some(&ranks), SearchOptions::default()).unwrap();
        assert_eq!(either.doc_ids(), vec![1, 2]);

        let hits = engine.hydrate(&either, "search engine", 10).unwrap();
        assert_eq!(hits[0].title, "Alpha");
        assert_eq!(hits[0].snippet.as_deref(), Some("<em>search</em> <em>engine</em> basics"));
        assert_eq!(hits[1].url.as_deref(), Some("http://b"));
    }

    #[test]
    fn empty_store_ranks_to_empty_vectors() {
        let engine = SearchEngine::new(Arc::new(MemoryStore::new()));
        assert!(engine.compute_rank_batch(RankParams::default()).unwrap().is_empty());
        assert!(engine.compute_rank_step(RankParams::default()).unwrap().is_empty());
        let report = engine.build_index().unwrap();
        assert_eq!(report.documents_indexed, 0);
        assert!(engine.search_union("anything", None, SearchOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn snippet_highlights_punctuated_query_terms() {
        let (_store, engine) = engine();
        engine.build_index().unwrap();
        let result = engine.search_union("search,", None, SearchOptions::default()).unwrap();
        let hits = engine.hydrate(&result, "search,", 1).unwrap();
        assert_eq!(hits[0].snippet.as_deref(), Some("<em>search</em> engine basics"));
    }

    #[test]
    fn storage_failure_aborts_the_call() {
        let (store, engine) = engine();
        store.set_offline(true);
        assert!(engine.build_index().unwrap_err().is_storage());
        assert!(engine.compute_rank_step(RankParams::default()).unwrap_err().is_storage());
        assert!(engine.search_union("search", None, SearchOptions::default()).unwrap_err().is_storage());
    }

    #[test]
    fn concurrent_queries_during_rebuild_see_full_index() {
        let (_store, engine) = engine();
        engine.build_index().unwrap();
        let engine = Arc::new(engine);
        let writer = {
            let engine = engine.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    engine.build_index().unwrap();
                }
            })
        };
        for _ in 0..200 {
            let r = engine.search_union("search", None, SearchOptions::default()).unwrap();
            assert_eq!(r.len(), 2);
        }
        writer.join().unwrap();
    }
}
