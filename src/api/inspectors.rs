//! Inspector (extraction rule) endpoints

use crate::api::error_response;
use crate::config::validate_inspector;
use crate::context::AppContext;
use crate::storage::{InspectorRecord, Storage};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Restrict the listing to one template (schema)
    pub template: Option<i64>,
}

pub async fn list(
    State(context): State<AppContext>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<InspectorRecord>>, (StatusCode, String)> {
    let inspectors = context
        .storage
        .lock()
        .unwrap()
        .list_inspectors(params.template)
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(inspectors))
}

pub async fn get_one(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
) -> Result<Json<InspectorRecord>, (StatusCode, String)> {
    let inspector = context
        .storage
        .lock()
        .unwrap()
        .get_inspector(id)
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(inspector))
}

pub async fn create(
    State(context): State<AppContext>,
    Json(payload): Json<InspectorRecord>,
) -> Result<(StatusCode, Json<InspectorRecord>), (StatusCode, String)> {
    validate_inspector(&payload).map_err(|e| error_response(e.into()))?;

    let mut storage = context.storage.lock().unwrap();
    let id = storage
        .insert_inspector(&payload)
        .map_err(|e| error_response(e.into()))?;
    let created = storage
        .get_inspector(id)
        .map_err(|e| error_response(e.into()))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(context): State<AppContext>,
    Path(id): Path<i64>,
    Json(mut payload): Json<InspectorRecord>,
) -> Result<Json<InspectorRecord>, (StatusCode, String)> {
    payload.id = id;
    validate_inspector(&payload).map_err(|e| error_response(e.into()))?;

    let mut storage = context.storage.lock().unwrap();
    storage
        .update_inspector(&payload)
        .map_err(|e| error_response(e.into()))?;
    let updated = storage
        .get_inspector(id)
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(updated))
}
