use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{ContinueResponse, LibraryEntry, RecommendationResponse},
    services::{recommendations::continue_recommendations, RecommendationQuery},
};

use super::{parse_media_type, AppState};

/// Body of `POST /recommendations`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub library: Vec<LibraryEntry>,
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub refresh: bool,
}

/// Query string of `GET /users/:user_id/recommendations`
#[derive(Debug, Default, Deserialize)]
pub struct RecommendationParams {
    #[serde(rename = "type")]
    pub media_type: Option<String>,
    pub page: Option<u32>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct ContinueRequest {
    pub library: Vec<LibraryEntry>,
}

fn build_query(
    media_type: Option<&str>,
    page: Option<u32>,
    refresh: bool,
) -> AppResult<RecommendationQuery> {
    Ok(RecommendationQuery {
        media_type: parse_media_type(media_type)?,
        page,
        refresh,
    })
}

/// Recommendations for a library supplied in the body
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let query = build_query(request.media_type.as_deref(), request.page, request.refresh)?;
    let response = state.recommender.recommend(&request.library, &query).await?;
    Ok(Json(response))
}

/// Recommendations for a stored user library
pub async fn recommend_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(params): Query<RecommendationParams>,
) -> AppResult<Json<RecommendationResponse>> {
    let query = build_query(params.media_type.as_deref(), params.page, params.refresh)?;
    let library = state.library_store.load_library(&user_id).await?;
    tracing::debug!(user_id = %user_id, entries = library.len(), "Library loaded");

    let response = state.recommender.recommend(&library, &query).await?;
    Ok(Json(response))
}

pub async fn continue_from_body(Json(request): Json<ContinueRequest>) -> Json<ContinueResponse> {
    Json(continue_recommendations(&request.library))
}

pub async fn continue_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> AppResult<Json<ContinueResponse>> {
    let library = state.library_store.load_library(&user_id).await?;
    Ok(Json(continue_recommendations(&library)))
}
