//! Indexer configuration, build, search and suggest endpoints
//!
//! Search and suggest are called speculatively by the UI (suggest on every
//! keystroke), so an indexer without a completed artifact answers with an
//! explicit not-ready result instead of an error, and neither endpoint ever
//! waits on an in-progress build.

use crate::api::error_response;
use crate::config::validate_indexer;
use crate::context::AppContext;
use crate::query::SearchHit;
use crate::storage::{IndexerRecord, Storage};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

/// Body for `POST /indexers/start`
#[derive(Debug, Deserialize)]
pub struct StartBuild {
    pub id: i64,
}

/// Body for `POST /indexers/{id}/search`
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub q: String,
}

/// Ranked search response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// False when the indexer has no completed artifact yet
    pub ready: bool,
    pub headers: Vec<String>,
    pub docs: Vec<SearchHit>,
}

/// Query string for `GET /indexers/suggest`
#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    pub id: i64,
    #[serde(default)]
    pub q: String,
}

/// Autosuggest response
#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<String>,
}

pub async fn list(
    State(context): State<AppContext>,
) -> Result<Json<Vec<IndexerRecord>>, (StatusCode, String)> {
    let indexers = context
        .storage
        .lock()
        .unwrap()
        .list_indexers()
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(indexers))
}

pub async fn get_one(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<IndexerRecord>, (StatusCode, String)> {
    let indexer = context
        .storage
        .lock()
        .unwrap()
        .get_indexer(id)
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(indexer))
}

pub async fn create(
    State(context): State<AppContext>,
    Json(payload): Json<IndexerRecord>,
) -> Result<(StatusCode, Json<IndexerRecord>), (StatusCode, String)> {
    validate_indexer(&payload).map_err(|e| error_response(e.into()))?;

    let mut storage = context.storage.lock().unwrap();
    let id = storage
        .insert_indexer(&payload)
        .map_err(|e| error_response(e.into()))?;
    let created = storage.get_indexer(id).map_err(|e| error_response(e.into()))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(mut payload): Json<IndexerRecord>,
) -> Result<Json<IndexerRecord>, (StatusCode, String)> {
    payload.id = id;
    validate_indexer(&payload).map_err(|e| error_response(e.into()))?;

    let mut storage = context.storage.lock().unwrap();
    storage
        .update_indexer(&payload)
        .map_err(|e| error_response(e.into()))?;
    let updated = storage.get_indexer(id).map_err(|e| error_response(e.into()))?;
    Ok(Json(updated))
}

/// Triggers the build pipeline for an indexer
pub async fn start(
    State(context): State<AppContext>,
    Json(payload): Json<StartBuild>,
) -> Result<StatusCode, (StatusCode, String)> {
    // Refuse synchronously while a feeding runner is still running; the
    // build re-checks before touching the status machine
    {
        let storage = context.storage.lock().unwrap();
        let indexer = storage
            .get_indexer(payload.id)
            .map_err(|e| error_response(e.into()))?;
        let running = storage
            .any_runner_running_for_inspectors(&indexer.inspector_ids)
            .map_err(|e| error_response(e.into()))?;
        if running {
            return Err((
                StatusCode::CONFLICT,
                "a runner feeding this indexer is still running".to_string(),
            ));
        }
    }

    context.start_index_build(payload.id).map_err(error_response)?;
    Ok(StatusCode::ACCEPTED)
}

/// Lists indexers whose artifact is completed and servable
pub async fn available(
    State(context): State<AppContext>,
) -> Result<Json<Vec<IndexerRecord>>, (StatusCode, String)> {
    let published = context.available_indexers();
    let indexers = context
        .storage
        .lock()
        .unwrap()
        .list_indexers()
        .map_err(|e| error_response(e.into()))?;
    let available = indexers
        .into_iter()
        .filter(|indexer| published.contains(&indexer.id))
        .collect();
    Ok(Json(available))
}

/// Ranked search over the last completed artifact
pub async fn search(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    match context.search(id, &payload.q) {
        Some(results) => Ok(Json(SearchResponse {
            ready: true,
            headers: results.headers,
            docs: results.docs,
        })),
        None => Ok(Json(SearchResponse {
            ready: false,
            headers: Vec::new(),
            docs: Vec::new(),
        })),
    }
}

/// Autosuggest over the last completed artifact
pub async fn suggest(
    State(context): State<AppContext>,
    Query(params): Query<SuggestParams>,
) -> Json<SuggestResponse> {
    Json(SuggestResponse {
        suggestions: context.suggest(params.id, &params.q),
    })
}
