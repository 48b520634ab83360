use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::AppResult,
    models::{MediaType, TitleSearchResponse},
};

use super::{parse_media_type, AppState};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(rename = "type")]
    media_type: Option<String>,
}

/// Handler for title search endpoint; `type` defaults to anime
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<TitleSearchResponse>> {
    let media_type = parse_media_type(params.media_type.as_deref())?.unwrap_or(MediaType::Anime);
    let results = state.title_search.search(&params.q, media_type).await?;
    Ok(Json(TitleSearchResponse { results }))
}
