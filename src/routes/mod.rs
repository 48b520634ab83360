use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::LibraryStore,
    error::{AppError, AppResult},
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    models::MediaType,
    services::{RecommendationService, TitleSearchService},
};

pub mod recommendations;
pub mod titles;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub recommender: RecommendationService,
    pub title_search: TitleSearchService,
    pub library_store: Arc<dyn LibraryStore>,
}

impl AppState {
    pub fn new(
        recommender: RecommendationService,
        title_search: TitleSearchService,
        library_store: Arc<dyn LibraryStore>,
    ) -> Self {
        Self {
            recommender,
            title_search,
            library_store,
        }
    }
}

/// Creates the application router with all routes
///
/// The request-id middleware wraps the trace layer so every request span
/// already carries the id.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", post(recommendations::recommend))
        .route(
            "/recommendations/continue",
            post(recommendations::continue_from_body),
        )
        .route(
            "/users/:user_id/recommendations",
            get(recommendations::recommend_for_user),
        )
        .route(
            "/users/:user_id/continue",
            get(recommendations::continue_for_user),
        )
        .route("/titles/search", get(titles::search))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Parses an optional `type` parameter, rejecting unknown values with a 400
pub(crate) fn parse_media_type(raw: Option<&str>) -> AppResult<Option<MediaType>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse().map(Some).map_err(AppError::InvalidInput),
        None => Ok(None),
    }
}
