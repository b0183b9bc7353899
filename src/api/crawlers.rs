//! Crawler configuration endpoints

use crate::api::error_response;
use crate::config::validate_crawler;
use crate::context::AppContext;
use crate::storage::{CrawlerRecord, Storage};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

pub async fn list(
    State(context): State<AppContext>,
) -> Result<Json<Vec<CrawlerRecord>>, (StatusCode, String)> {
    let crawlers = context
        .storage
        .lock()
        .unwrap()
        .list_crawlers()
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(crawlers))
}

pub async fn get_one(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<CrawlerRecord>, (StatusCode, String)> {
    let crawler = context
        .storage
        .lock()
        .unwrap()
        .get_crawler(id)
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(crawler))
}

pub async fn create(
    State(context): State<AppContext>,
    Json(payload): Json<CrawlerRecord>,
) -> Result<(StatusCode, Json<CrawlerRecord>), (StatusCode, String)> {
    validate_crawler(&payload).map_err(|e| error_response(e.into()))?;

    let mut storage = context.storage.lock().unwrap();
    let id = storage
        .insert_crawler(&payload)
        .map_err(|e| error_response(e.into()))?;
    let created = storage.get_crawler(id).map_err(|e| error_response(e.into()))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(mut payload): Json<CrawlerRecord>,
) -> Result<Json<CrawlerRecord>, (StatusCode, String)> {
    payload.id = id;
    validate_crawler(&payload).map_err(|e| error_response(e.into()))?;

    let mut storage = context.storage.lock().unwrap();
    storage
        .update_crawler(&payload)
        .map_err(|e| error_response(e.into()))?;
    let updated = storage.get_crawler(id).map_err(|e| error_response(e.into()))?;
    Ok(Json(updated))
}
