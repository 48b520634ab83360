//! Upstream catalog abstraction
//!
//! Two catalogs back the gateway: Jikan (MyAnimeList mirror, REST) for genre
//! browsing, series details and title search, and AniList (GraphQL) for
//! trending feeds and metadata enrichment. Both normalize into `Candidate`.

use std::collections::HashMap;

use crate::{
    db::CachePolicy,
    error::{AppError, AppResult},
    models::{Candidate, MediaType, MetadataPatch, TitleMatch},
};

pub mod anilist;
pub mod jikan;

pub use anilist::AniListProvider;
pub use jikan::JikanProvider;

/// Normalized access to the upstream catalogs
///
/// Implementations never retry on their own; pacing and throttle retries
/// belong to the request queue underneath.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogGateway: Send + Sync {
    /// Titles in one genre, best scored first
    ///
    /// A genre the catalog has no id for yields an empty list, not an error.
    async fn fetch_by_genre(
        &self,
        genre: &str,
        media_type: MediaType,
        limit: u32,
        policy: CachePolicy,
    ) -> AppResult<Vec<Candidate>>;

    async fn fetch_trending(
        &self,
        media_type: MediaType,
        page: u32,
        limit: u32,
        policy: CachePolicy,
    ) -> AppResult<Vec<Candidate>>;

    /// Episode/chapter/status data keyed by external id
    ///
    /// Ids the secondary catalog does not know are simply absent from the map.
    async fn enrich_metadata(
        &self,
        media_type: MediaType,
        external_ids: &[String],
    ) -> AppResult<HashMap<String, MetadataPatch>>;

    /// Genre labels of one series, for profile building
    async fn fetch_series_genres(
        &self,
        external_id: &str,
        media_type: MediaType,
    ) -> AppResult<Vec<String>>;

    async fn search_titles(&self, query: &str, media_type: MediaType) -> AppResult<Vec<TitleMatch>>;
}

/// Production gateway combining both catalogs
#[derive(Clone)]
pub struct ExternalCatalog {
    jikan: JikanProvider,
    anilist: AniListProvider,
}

impl ExternalCatalog {
    pub fn new(jikan: JikanProvider, anilist: AniListProvider) -> Self {
        Self { jikan, anilist }
    }
}

#[async_trait::async_trait]
impl CatalogGateway for ExternalCatalog {
    async fn fetch_by_genre(
        &self,
        genre: &str,
        media_type: MediaType,
        limit: u32,
        policy: CachePolicy,
    ) -> AppResult<Vec<Candidate>> {
        self.jikan.fetch_by_genre(genre, media_type, limit, policy).await
    }

    async fn fetch_trending(
        &self,
        media_type: MediaType,
        page: u32,
        limit: u32,
        policy: CachePolicy,
    ) -> AppResult<Vec<Candidate>> {
        match self.anilist.fetch_trending(media_type, page, limit, policy).await {
            Ok(candidates) => Ok(candidates),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    media_type = %media_type,
                    "AniList trending failed, falling back to Jikan top list"
                );
                self.jikan.fetch_top(media_type, page, limit, policy).await
            }
        }
    }

    async fn enrich_metadata(
        &self,
        media_type: MediaType,
        external_ids: &[String],
    ) -> AppResult<HashMap<String, MetadataPatch>> {
        self.anilist.enrich_metadata(media_type, external_ids).await
    }

    async fn fetch_series_genres(
        &self,
        external_id: &str,
        media_type: MediaType,
    ) -> AppResult<Vec<String>> {
        self.jikan.fetch_series_genres(external_id, media_type).await
    }

    async fn search_titles(&self, query: &str, media_type: MediaType) -> AppResult<Vec<TitleMatch>> {
        self.jikan.search_titles(query, media_type).await
    }
}

/// Result of a batch of independent sub-fetches
#[derive(Debug)]
pub struct BatchOutcome<T> {
    /// One value per sub-fetch, in request order; failed slots hold `T::default()`
    pub values: Vec<T>,
    pub failed: usize,
}

impl<T> BatchOutcome<T> {
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.failed == self.values.len()
    }

    /// The values, unless not a single sub-fetch succeeded
    pub fn into_result(self, message: &str) -> AppResult<Vec<T>> {
        if self.all_failed() {
            return Err(AppError::ExternalApi(message.to_string()));
        }
        Ok(self.values)
    }
}

/// Degrades failed sub-fetches to empty values, keeping request order
pub fn settle<T: Default>(outcomes: Vec<AppResult<T>>, context: &'static str) -> BatchOutcome<T> {
    let total = outcomes.len();
    let mut failed = 0;

    let values: Vec<T> = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| match outcome {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, index, context, "Sub-fetch failed, using empty result");
                failed += 1;
                T::default()
            }
        })
        .collect();

    if failed > 0 {
        tracing::warn!(
            success_count = total - failed,
            error_count = failed,
            context,
            "Partial catalog fetch failure"
        );
    }

    BatchOutcome { values, failed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_keeps_order_and_substitutes_empty() {
        let outcomes: Vec<AppResult<Vec<u32>>> = vec![
            Ok(vec![1, 2]),
            Err(AppError::ExternalApi("boom".to_string())),
            Ok(vec![3]),
        ];

        let outcome = settle(outcomes, "test");
        assert_eq!(outcome.failed, 1);
        assert!(!outcome.all_failed());
        assert_eq!(outcome.values, vec![vec![1, 2], vec![], vec![3]]);
    }

    #[test]
    fn test_all_failed_batch_is_an_error() {
        let outcomes: Vec<AppResult<Vec<u32>>> = vec![
            Err(AppError::ExternalApi("a".to_string())),
            Err(AppError::QueueClosed),
        ];

        let result = settle(outcomes, "test").into_result("nothing worked");
        match result {
            Err(AppError::ExternalApi(msg)) => assert_eq!(msg, "nothing worked"),
            other => panic!("expected ExternalApi, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_batch_is_not_a_failure() {
        let outcome = settle::<Vec<u32>>(vec![], "test");
        assert!(!outcome.all_failed());
        assert!(outcome.into_result("unused").unwrap().is_empty());
    }

    #[test]
    fn test_successful_empty_results_are_not_failures() {
        let outcomes: Vec<AppResult<Vec<u32>>> = vec![Ok(vec![]), Ok(vec![])];
        assert!(settle(outcomes, "test").into_result("unused").is_ok());
    }
}
