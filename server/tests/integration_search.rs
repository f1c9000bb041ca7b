use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use minisearch_core::persist::{try_load_ranks, DataPaths};
use minisearch_core::rank::{RankParams, RankVector};
use minisearch_core::store::{CorpusSink, GraphSource, IndexStore, MemoryStore};
use minisearch_core::{DocId, Document, Link, Posting};
use serde_json::Value;
use server::{build_app, AppState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tower::ServiceExt;

fn tiny_corpus() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let a = store.upsert_document("http://a", "Doc A", "Rust is great. rust systems programming.").unwrap();
    let b = store.upsert_document("http://b", "Doc B", "Learning rust and search.").unwrap();
    store.insert_links(a, &["http://b".into()]).unwrap();
    store.insert_links(b, &["http://b".into()]).unwrap();
    store
}

fn state_with(store: Arc<MemoryStore>, authority: Option<RankVector>) -> AppState {
    let state = AppState::new(store, authority, RankParams::default());
    state.engine.build_index().unwrap();
    state
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let app = build_app(state_with(tiny_corpus(), None));

    let (status, json) = get(app, "/search?q=rust&k=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"].as_u64().unwrap(), 1);
    assert_eq!(arr[1]["doc_id"].as_u64().unwrap(), 2);
    assert!(arr[0]["snippet"].as_str().unwrap().contains("<em>Rust</em>"));
}

#[tokio::test]
async fn punctuated_query_terms_are_highlighted() {
    let app = build_app(state_with(tiny_corpus(), None));

    let (status, json) = get(app, "/search?q=rust%2C&k=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"].as_u64().unwrap(), 2);
    let snippet = json["results"][1]["snippet"].as_str().unwrap();
    assert_eq!(snippet, "Learning <em>rust</em> and search.");
}

#[tokio::test]
async fn modes_diverge_on_multi_term_queries() {
    let store = tiny_corpus();
    let state = state_with(store, None);

    let (_, and) = get(build_app(state.clone()), "/search?q=rust+search&mode=intersect").await;
    let (_, or) = get(build_app(state), "/search?q=rust+search&mode=union").await;
    assert_eq!(and["total_hits"].as_u64().unwrap(), 1);
    assert_eq!(or["total_hits"].as_u64().unwrap(), 2);
}

#[tokio::test]
async fn authority_reorders_frequency_ties() {
    let store = Arc::new(MemoryStore::new());
    store.upsert_document("http://a", "A", "search").unwrap();
    store.upsert_document("http://b", "B", "search").unwrap();
    let mut ranks = RankVector::new();
    ranks.insert(1, 0.1);
    ranks.insert(2, 0.9);
    let state = state_with(store, Some(ranks));

    let (_, with) = get(build_app(state.clone()), "/search?q=search&alpha=0.5").await;
    assert_eq!(with["results"][0]["doc_id"].as_u64().unwrap(), 2);
    let (_, without) = get(build_app(state), "/search?q=search&authority=false").await;
    assert_eq!(without["results"][0]["doc_id"].as_u64().unwrap(), 1);
}

#[tokio::test]
async fn bad_alpha_is_a_client_error() {
    let app = build_app(state_with(tiny_corpus(), None));
    let (status, _) = get(app, "/search?q=rust&alpha=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_document_is_not_found() {
    let app = build_app(state_with(tiny_corpus(), None));
    let (status, _) = get(app.clone(), "/doc/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, json) = get(app, "/doc/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "Doc B");
}

#[tokio::test]
async fn admin_endpoints_require_token_and_swap_ranks() {
    let dir = tempdir().unwrap();
    let mut state = state_with(tiny_corpus(), None);
    state.admin_token = Some("secret".into());
    state.data_root = Some(dir.path().to_path_buf());
    let app = build_app(state.clone());

    let denied = Request::post("/rank/recompute").body(Body::empty()).unwrap();
    let (status, _) = send(app.clone(), denied).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::post("/rank/recompute?strategy=step")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["documents"].as_u64().unwrap(), 2);
    assert!((json["total"].as_f64().unwrap() - 1.0).abs() < 1e-6);
    assert!(state.authority.read().is_some());
    assert!(try_load_ranks(&DataPaths::new(dir.path())).unwrap().is_some());

    let req = Request::post("/index/rebuild")
        .header("X-ADMIN-TOKEN", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["documents_indexed"].as_u64().unwrap(), 2);
}

/// Delegates to a `MemoryStore`, but once armed each index clear stalls for `delay`.
struct SlowRebuildStore {
    inner: MemoryStore,
    delay: Duration,
    armed: AtomicBool,
    clearing: AtomicBool,
}

impl GraphSource for SlowRebuildStore {
    fn list_documents(&self) -> minisearch_core::Result<Vec<Document>> {
        self.inner.list_documents()
    }
    fn list_links(&self) -> minisearch_core::Result<Vec<Link>> {
        self.inner.list_links()
    }
    fn fetch_document(&self, id: DocId) -> minisearch_core::Result<Option<Document>> {
        self.inner.fetch_document(id)
    }
}

impl IndexStore for SlowRebuildStore {
    fn clear_postings_and_terms(&self) -> minisearch_core::Result<()> {
        if self.armed.load(Ordering::SeqCst) {
            self.clearing.store(true, Ordering::SeqCst);
            std::thread::sleep(self.delay);
        }
        self.inner.clear_postings_and_terms()
    }
    fn upsert_posting(&self, term: &str, doc_id: DocId, tf: u32) -> minisearch_core::Result<()> {
        self.inner.upsert_posting(term, doc_id, tf)
    }
    fn fetch_postings(&self, term: &str) -> minisearch_core::Result<Vec<Posting>> {
        self.inner.fetch_postings(term)
    }
    fn term_count(&self) -> minisearch_core::Result<usize> {
        self.inner.term_count()
    }
    fn posting_count(&self) -> minisearch_core::Result<usize> {
        self.inner.posting_count()
    }
}

impl CorpusSink for SlowRebuildStore {
    fn upsert_document(&self, url: &str, title: &str, content: &str) -> minisearch_core::Result<DocId> {
        self.inner.upsert_document(url, title, content)
    }
    fn insert_links(&self, from: DocId, to_urls: &[String]) -> minisearch_core::Result<usize> {
        self.inner.insert_links(from, to_urls)
    }
    fn clear_corpus(&self) -> minisearch_core::Result<()> {
        self.inner.clear_corpus()
    }
}

// Single-threaded runtime: a search that blocked its worker while waiting on a rebuild would
// stall every other request, /health included.
#[tokio::test]
async fn search_waiting_on_rebuild_leaves_runtime_responsive() {
    let store = Arc::new(SlowRebuildStore {
        inner: MemoryStore::new(),
        delay: Duration::from_millis(1500),
        armed: AtomicBool::new(false),
        clearing: AtomicBool::new(false),
    });
    store.upsert_document("http://a", "Doc A", "rust search").unwrap();
    store.upsert_document("http://b", "Doc B", "rust systems").unwrap();
    let mut state = AppState::new(store.clone(), None, RankParams::default());
    state.engine.build_index().unwrap();
    state.admin_token = Some("secret".into());
    store.armed.store(true, Ordering::SeqCst);
    let app = build_app(state);

    let rebuild = Request::post("/index/rebuild").header("X-ADMIN-TOKEN", "secret").body(Body::empty()).unwrap();
    let rebuild = tokio::spawn(send(app.clone(), rebuild));
    while !store.clearing.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = Instant::now();
    let search = tokio::spawn(get(app.clone(), "/search?q=rust"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (status, _) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(started.elapsed() < Duration::from_millis(750), "health took {:?}", started.elapsed());

    let (status, json) = search.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_hits"].as_u64().unwrap(), 2);
    let (status, _) = rebuild.await.unwrap();
    assert_eq!(status, StatusCode::OK);
}
