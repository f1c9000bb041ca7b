use anyhow::Result;
use axum::{extract::{Path, Query, State}, http::{HeaderMap, StatusCode}, routing::{get, post}, Json, Router};
use minisearch_core::persist::{save_ranks, try_load_ranks, DataPaths, MetaFile};
use minisearch_core::rank::{RankParams, RankVector, Strategy};
use minisearch_core::retrieval::{SearchMode, SearchOptions, DEFAULT_ALPHA};
use minisearch_core::store::{GraphSource, SledStore, Store};
use minisearch_core::{DocId, SearchEngine, SearchError, SearchHit};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_mode")]
    pub mode: SearchMode,
    pub alpha: Option<f64>,
    /// Blend in the current authority scores.
    #[serde(default = "default_true")]
    pub authority: bool,
}
fn default_k() -> usize { 10 }
fn default_mode() -> SearchMode { SearchMode::Union }
fn default_true() -> bool { true }

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub mode: SearchMode,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Deserialize)]
pub struct RecomputeParams {
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
}
fn default_strategy() -> Strategy { Strategy::Batch }

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    /// Swapped whole on recompute; readers keep the vector they started with.
    pub authority: Arc<RwLock<Option<Arc<RankVector>>>>,
    pub rank_params: RankParams,
    /// Where recomputed ranks are persisted, if anywhere.
    pub data_root: Option<PathBuf>,
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, authority: Option<RankVector>, rank_params: RankParams) -> Self {
        Self {
            engine: Arc::new(SearchEngine::new(store)),
            authority: Arc::new(RwLock::new(authority.map(Arc::new))),
            rank_params,
            data_root: None,
            admin_token: None,
        }
    }

    fn current_authority(&self) -> Option<Arc<RankVector>> {
        self.authority.read().clone()
    }
}

/// Opens the data directory written by the indexer and builds the router over it.
pub fn build_app_from_dir(data_dir: &str, rank_params: RankParams) -> Result<Router> {
    let paths = DataPaths::new(data_dir);
    let store = SledStore::open(paths.db())?;
    let authority = try_load_ranks(&paths)?;
    if authority.is_none() {
        tracing::warn!(data_dir, "no stored rank vector; results are ranked by term frequency only");
    }
    let mut state = AppState::new(Arc::new(store), authority, rank_params);
    state.data_root = Some(paths.root);
    state.admin_token = std::env::var("ADMIN_TOKEN").ok();
    Ok(build_app(state))
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .route("/index/rebuild", post(rebuild_handler))
        .route("/rank/recompute", post(recompute_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

type ApiError = (StatusCode, String);

fn api_error(e: SearchError) -> ApiError {
    let status = match &e {
        SearchError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        SearchError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub async fn search_handler(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let authority = if params.authority { state.current_authority() } else { None };
    let opts = SearchOptions { alpha: params.alpha.unwrap_or(DEFAULT_ALPHA), limit: None };
    let k = params.k.clamp(1, 100);
    let engine = state.engine.clone();
    let query = params.q.clone();
    // waits on the index gate while a rebuild runs
    let (total_hits, results) = tokio::task::spawn_blocking(move || {
        let result = engine.search(params.mode, &query, authority.as_deref(), opts)?;
        let hits = engine.hydrate(&result, &query, k)?;
        Ok::<_, SearchError>((result.len(), hits))
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(api_error)?;

    let elapsed = start.elapsed();
    Ok(Json(SearchResponse { query: params.q, mode: params.mode, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(State(state): State<AppState>, Path(doc_id): Path<DocId>) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(doc) = state.engine.store().fetch_document(doc_id).map_err(api_error)? else {
        return Err((StatusCode::NOT_FOUND, "not found".into()));
    };
    let authority = state.current_authority().and_then(|r| r.get(doc_id));
    Ok(Json(serde_json::json!({
        "doc_id": doc_id,
        "title": doc.title,
        "url": doc.url,
        "text": doc.content,
        "authority": authority,
    })))
}

async fn rebuild_handler(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let engine = state.engine.clone();
    let report = tokio::task::spawn_blocking(move || engine.build_index())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(api_error)?;
    Ok(Json(serde_json::to_value(report).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?))
}

async fn recompute_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<RecomputeParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    authorize(&state, &headers)?;
    let engine = state.engine.clone();
    let rank_params = state.rank_params;
    let ranks = tokio::task::spawn_blocking(move || engine.compute_rank(params.strategy, rank_params))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(api_error)?;

    if let Some(root) = &state.data_root {
        let meta = MetaFile::new(ranks.len() as u32, params.strategy, rank_params);
        save_ranks(&DataPaths::new(root), &ranks, &meta).map_err(api_error)?;
    }
    let documents = ranks.len();
    let total = ranks.total();
    *state.authority.write() = Some(Arc::new(ranks));
    tracing::info!(strategy = ?params.strategy, documents, "authority scores replaced");
    Ok(Json(serde_json::json!({ "strategy": params.strategy, "documents": documents, "total": total })))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let required = match &state.admin_token {
        Some(t) => t,
        None => return Err((StatusCode::UNAUTHORIZED, "ADMIN_TOKEN not set".into())),
    };
    let provided = headers.get("X-ADMIN-TOKEN").and_then(|v| v.to_str().ok()).unwrap_or("");
    if provided == required {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid admin token".into()))
    }
}
