//! HTTP API
//!
//! Axum routes exposing the crawler/runner/indexer lifecycle to the admin
//! UI. Handlers stay thin: deserialize, validate, call into storage or the
//! application context, map errors onto status codes. All mutating
//! endpoints share the soft-delete convention (`deleted: true` on a PUT
//! body hides the entity without removing it).

mod crawlers;
mod indexers;
mod inspectors;
mod runners;

use crate::context::AppContext;
use crate::storage::StorageError;
use crate::CrawldexError;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

/// Maps a core error onto an HTTP response tuple
pub(crate) fn error_response(error: CrawldexError) -> (StatusCode, String) {
    let status = match &error {
        CrawldexError::Storage(
            StorageError::CrawlerNotFound(_)
            | StorageError::InspectorNotFound(_)
            | StorageError::RunnerNotFound(_)
            | StorageError::IndexerNotFound(_),
        ) => StatusCode::NOT_FOUND,
        CrawldexError::RunnerNotFound(_) => StatusCode::NOT_FOUND,
        CrawldexError::Config(_) | CrawldexError::UrlError(_) | CrawldexError::UrlParse(_) => {
            StatusCode::BAD_REQUEST
        }
        CrawldexError::InvalidTransition { .. } => StatusCode::CONFLICT,
        CrawldexError::Index(crate::index::IndexError::BuildRefused(_)) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error.to_string())
}

/// Builds the application router
///
/// Public so integration tests can drive the API without binding a socket.
pub fn create_router(context: AppContext) -> Router {
    Router::new()
        .route("/crawlers", get(crawlers::list).post(crawlers::create))
        .route("/crawlers/:id", get(crawlers::get_one).put(crawlers::update))
        .route(
            "/inspector",
            get(inspectors::list).post(inspectors::create),
        )
        .route(
            "/inspector/:id",
            get(inspectors::get_one).put(inspectors::update),
        )
        .route("/runners", get(runners::list).post(runners::create))
        .route("/runners/submit", post(runners::submit))
        .route("/runners/:id", get(runners::get_one).put(runners::update))
        .route("/runners/:id/stop", post(runners::stop))
        .route("/runners/:id/download", get(runners::download))
        .route("/indexers", get(indexers::list).post(indexers::create))
        .route("/indexers/start", post(indexers::start))
        .route(
            "/indexers/available-indexers",
            get(indexers::available),
        )
        .route("/indexers/suggest", get(indexers::suggest))
        .route(
            "/indexers/:id",
            get(indexers::get_one).put(indexers::update),
        )
        .route("/indexers/:id/search", post(indexers::search))
        .with_state(context)
}
