use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    cached,
    db::{CacheKey, CachePolicy, ResponseCache},
    error::AppResult,
    models::{MediaType, TitleMatch},
    services::providers::CatalogGateway,
};

/// Title autocomplete backed by the catalog gateway
///
/// Results are cached per (type, normalized query) in a dedicated long-lived
/// cache, separate from the candidate cache.
#[derive(Clone)]
pub struct TitleSearchService {
    gateway: Arc<dyn CatalogGateway>,
    cache: ResponseCache<Vec<TitleMatch>>,
}

impl TitleSearchService {
    pub fn new(gateway: Arc<dyn CatalogGateway>, cache: ResponseCache<Vec<TitleMatch>>) -> Self {
        Self { gateway, cache }
    }

    /// Matches for `query`; a blank query returns nothing without a lookup
    pub async fn search(&self, query: &str, media_type: MediaType) -> AppResult<Vec<TitleMatch>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::TitleSearch {
            media_type,
            query: query.to_string(),
        };
        let gateway = self.gateway.clone();

        cached!(self.cache, key, CachePolicy::Prefer, async move {
            let matches = gateway.search_titles(query, media_type).await?;
            let results = dedupe_by_id(matches);
            tracing::debug!(query = %query, media_type = %media_type, results = results.len(), "Title search completed");
            AppResult::Ok(results)
        })
    }
}

fn dedupe_by_id(matches: Vec<TitleMatch>) -> Vec<TitleMatch> {
    let mut seen = HashSet::new();
    matches
        .into_iter()
        .filter(|m| seen.insert(m.external_id.clone()))
        .collect()
}
