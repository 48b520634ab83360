//! Jikan (MyAnimeList) REST provider
//!
//! Endpoints used:
//! 1. Genre browse: `/{anime|manga}?genres={id}&order_by=score&sort=desc`
//! 2. Top list: `/top/{anime|manga}` (trending fallback)
//! 3. Series details: `/{anime|manga}/{id}/full` (genre labels)
//! 4. Title search: `/{anime|manga}?q=...`
//!
//! Manhwa is filed under manga; list endpoints narrow it with `type=manhwa`.

use crate::{
    db::CachePolicy,
    error::{AppError, AppResult},
    models::{
        jikan::{JikanItemResponse, JikanListResponse},
        Candidate, MediaType, TitleMatch,
    },
    services::{catalog_client::CatalogClient, queue::OutboundRequest},
};

/// Jikan caps every list endpoint at 25 items per page
const MAX_PAGE_SIZE: u32 = 25;
const SEARCH_LIMIT: u32 = 5;

/// Genre names as they appear in MyAnimeList, mapped to Jikan genre ids
const GENRE_MAP: &[(&str, u32)] = &[
    ("Action", 1),
    ("Adventure", 2),
    ("Comedy", 4),
    ("Drama", 8),
    ("Fantasy", 10),
    ("Horror", 14),
    ("Mystery", 7),
    ("Romance", 22),
    ("Sci-Fi", 24),
    ("Slice of Life", 36),
    ("Sports", 30),
    ("Supernatural", 37),
    ("Thriller", 41),
    ("Psychological", 40),
    ("Shounen", 27),
    ("Seinen", 42),
];

pub fn genre_id(genre: &str) -> Option<u32> {
    GENRE_MAP
        .iter()
        .find(|(name, _)| *name == genre)
        .map(|(_, id)| *id)
}

#[derive(Clone)]
pub struct JikanProvider {
    client: CatalogClient,
    api_url: String,
}

impl JikanProvider {
    pub fn new(client: CatalogClient, api_url: String) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn list_request(&self, path: &str, media_type: MediaType) -> OutboundRequest {
        let request = OutboundRequest::get(format!("{}/{}", self.api_url, path));
        if media_type == MediaType::Manhwa {
            request.query("type", "manhwa")
        } else {
            request
        }
    }

    pub fn genre_request(&self, genre_id: u32, media_type: MediaType, limit: u32) -> OutboundRequest {
        self.list_request(media_type.catalog_kind(), media_type)
            .query("genres", genre_id)
            .query("order_by", "score")
            .query("sort", "desc")
            .query("limit", limit.clamp(1, MAX_PAGE_SIZE))
    }

    pub async fn fetch_by_genre(
        &self,
        genre: &str,
        media_type: MediaType,
        limit: u32,
        policy: CachePolicy,
    ) -> AppResult<Vec<Candidate>> {
        let Some(id) = genre_id(genre) else {
            tracing::debug!(genre = %genre, "No Jikan id for genre, skipping");
            return Ok(Vec::new());
        };

        let request = self.genre_request(id, media_type, limit);
        let response: JikanListResponse = self.client.fetch(request, policy).await?;

        let candidates: Vec<Candidate> = response
            .data
            .into_iter()
            .map(|media| media.into_candidate(media_type))
            .collect();

        tracing::debug!(
            genre = %genre,
            media_type = %media_type,
            count = candidates.len(),
            "Fetched genre candidates from Jikan"
        );

        Ok(candidates)
    }

    pub async fn fetch_top(
        &self,
        media_type: MediaType,
        page: u32,
        limit: u32,
        policy: CachePolicy,
    ) -> AppResult<Vec<Candidate>> {
        let request = self
            .list_request(&format!("top/{}", media_type.catalog_kind()), media_type)
            .query("page", page.max(1))
            .query("limit", limit.clamp(1, MAX_PAGE_SIZE));

        let response: JikanListResponse = self.client.fetch(request, policy).await?;

        Ok(response
            .data
            .into_iter()
            .map(|media| media.into_candidate(media_type))
            .collect())
    }

    pub async fn fetch_series_genres(
        &self,
        external_id: &str,
        media_type: MediaType,
    ) -> AppResult<Vec<String>> {
        let external_id = external_id.trim();
        if external_id.is_empty() || !external_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::InvalidInput(format!(
                "Not a MyAnimeList id: '{}'",
                external_id
            )));
        }

        let request = OutboundRequest::get(format!(
            "{}/{}/{}/full",
            self.api_url,
            media_type.catalog_kind(),
            external_id
        ));
        let response: JikanItemResponse = self.client.fetch(request, CachePolicy::Prefer).await?;

        Ok(response.data.genre_names())
    }

    /// Title autocomplete, most popular first
    ///
    /// Not cached here; the title search service keeps its own longer-lived cache.
    pub async fn search_titles(&self, query: &str, media_type: MediaType) -> AppResult<Vec<TitleMatch>> {
        let request = OutboundRequest::get(format!("{}/{}", self.api_url, media_type.catalog_kind()))
            .query("q", query.trim())
            .query("limit", SEARCH_LIMIT)
            .query("sfw", "true")
            .query("order_by", "popularity")
            .query("sort", "asc");

        let response: JikanListResponse = self.client.fetch_uncached(request).await?;

        Ok(response
            .data
            .into_iter()
            .map(|media| media.into_title_match(media_type))
            .collect())
    }
}
