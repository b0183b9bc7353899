//! Runner lifecycle endpoints
//!
//! The UI polls `GET /runners` every few seconds for status and
//! statistics; the rows carry the last snapshot written by the run.

use crate::api::error_response;
use crate::context::AppContext;
use crate::storage::{DocumentExport, RunnerRecord, Storage};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

/// Body for creating a runner
#[derive(Debug, Deserialize)]
pub struct CreateRunner {
    pub crawler_id: i64,
}

/// Body for updating a runner (soft delete only)
#[derive(Debug, Deserialize)]
pub struct UpdateRunner {
    #[serde(default)]
    pub deleted: bool,
}

pub async fn list(
    State(context): State<AppContext>,
) -> Result<Json<Vec<RunnerRecord>>, (StatusCode, String)> {
    let runners = context
        .storage
        .lock()
        .unwrap()
        .list_runners()
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(runners))
}

pub async fn get_one(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<RunnerRecord>, (StatusCode, String)> {
    let runner = context
        .storage
        .lock()
        .unwrap()
        .get_runner(id)
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(runner))
}

/// Creates a runner without starting it
pub async fn create(
    State(context): State<AppContext>,
    Json(payload): Json<CreateRunner>,
) -> Result<(StatusCode, Json<RunnerRecord>), (StatusCode, String)> {
    let mut storage = context.storage.lock().unwrap();
    // The crawler must exist; a dangling runner row helps nobody
    storage
        .get_crawler(payload.crawler_id)
        .map_err(|e| error_response(e.into()))?;
    let id = storage
        .create_runner(payload.crawler_id)
        .map_err(|e| error_response(e.into()))?;
    let created = storage.get_runner(id).map_err(|e| error_response(e.into()))?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Creates a runner and starts its crawl
pub async fn submit(
    State(context): State<AppContext>,
    Json(payload): Json<CreateRunner>,
) -> Result<(StatusCode, Json<RunnerRecord>), (StatusCode, String)> {
    let id = {
        let mut storage = context.storage.lock().unwrap();
        storage
            .get_crawler(payload.crawler_id)
            .map_err(|e| error_response(e.into()))?;
        storage
            .create_runner(payload.crawler_id)
            .map_err(|e| error_response(e.into()))?
    };

    context.start_runner(id).map_err(error_response)?;

    let runner = context
        .storage
        .lock()
        .unwrap()
        .get_runner(id)
        .map_err(|e| error_response(e.into()))?;
    Ok((StatusCode::CREATED, Json(runner)))
}

/// Signals a running crawl to stop
pub async fn stop(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    context.stop_runner(id).map_err(error_response)?;
    Ok(StatusCode::ACCEPTED)
}

/// Soft-deletes a runner row
pub async fn update(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRunner>,
) -> Result<Json<RunnerRecord>, (StatusCode, String)> {
    let mut storage = context.storage.lock().unwrap();
    if payload.deleted {
        storage
            .mark_runner_deleted(id)
            .map_err(|e| error_response(e.into()))?;
    }
    let runner = storage.get_runner(id).map_err(|e| error_response(e.into()))?;
    Ok(Json(runner))
}

/// Exports the documents a run collected as a flat record list
pub async fn download(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DocumentExport>>, (StatusCode, String)> {
    let storage = context.storage.lock().unwrap();
    // 404 for runners that never existed rather than an empty export
    storage.get_runner(id).map_err(|e| error_response(e.into()))?;
    let documents = storage
        .export_runner_documents(id)
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(documents))
}
