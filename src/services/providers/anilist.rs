//! AniList GraphQL provider
//!
//! Used for the trending feeds (AniList splits manga by country of origin,
//! which is how manhwa is told apart) and for batched episode/chapter/status
//! enrichment by MyAnimeList id.

use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::{
    db::CachePolicy,
    error::{AppError, AppResult},
    models::{
        anilist::{AniListMedia, AniListResponse},
        Candidate, MediaType, MetadataPatch,
    },
    services::{catalog_client::CatalogClient, queue::OutboundRequest},
};

const MAX_PER_PAGE: u32 = 50;

const TRENDING_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $type: MediaType, $country: CountryCode) {
  Page(page: $page, perPage: $perPage) {
    media(type: $type, countryOfOrigin: $country, sort: TRENDING_DESC, isAdult: false) {
      id
      idMal
      title { romaji english }
      coverImage { large }
      genres
      averageScore
      episodes
      chapters
      status
    }
  }
}
"#;

const METADATA_QUERY: &str = r#"
query ($ids: [Int], $type: MediaType, $perPage: Int) {
  Page(page: 1, perPage: $perPage) {
    media(idMal_in: $ids, type: $type) {
      id
      idMal
      episodes
      chapters
      status
    }
  }
}
"#;

/// AniList media type and country filter for one of our types
fn media_filter(media_type: MediaType) -> (&'static str, Option<&'static str>) {
    match media_type {
        MediaType::Anime => ("ANIME", None),
        MediaType::Manga => ("MANGA", Some("JP")),
        MediaType::Manhwa => ("MANGA", Some("KR")),
    }
}

#[derive(Clone)]
pub struct AniListProvider {
    client: CatalogClient,
    api_url: String,
}

impl AniListProvider {
    pub fn new(client: CatalogClient, api_url: String) -> Self {
        Self { client, api_url }
    }

    pub fn trending_request(&self, media_type: MediaType, page: u32, limit: u32) -> OutboundRequest {
        let (kind, country) = media_filter(media_type);

        let mut variables = Map::new();
        variables.insert("page".to_string(), json!(page.max(1)));
        variables.insert("perPage".to_string(), json!(limit.clamp(1, MAX_PER_PAGE)));
        variables.insert("type".to_string(), json!(kind));
        if let Some(country) = country {
            variables.insert("country".to_string(), json!(country));
        }

        OutboundRequest::post_json(
            self.api_url.clone(),
            json!({ "query": TRENDING_QUERY, "variables": Value::Object(variables) }),
        )
    }

    async fn query_media(&self, request: OutboundRequest, policy: CachePolicy) -> AppResult<Vec<AniListMedia>> {
        let response: AniListResponse = self.client.fetch(request, policy).await?;

        match response.data {
            Some(data) => Ok(data.page.media),
            None => {
                let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
                Err(AppError::ExternalApi(format!(
                    "AniList query failed: {}",
                    if messages.is_empty() {
                        "no data returned".to_string()
                    } else {
                        messages.join("; ")
                    }
                )))
            }
        }
    }

    pub async fn fetch_trending(
        &self,
        media_type: MediaType,
        page: u32,
        limit: u32,
        policy: CachePolicy,
    ) -> AppResult<Vec<Candidate>> {
        let media = self
            .query_media(self.trending_request(media_type, page, limit), policy)
            .await?;

        let candidates: Vec<Candidate> = media
            .into_iter()
            .filter_map(|m| m.into_candidate(media_type))
            .collect();

        tracing::debug!(
            media_type = %media_type,
            page,
            count = candidates.len(),
            "Fetched trending from AniList"
        );

        Ok(candidates)
    }

    /// One batched lookup for all ids; ids that are not MAL ids are skipped
    pub async fn enrich_metadata(
        &self,
        media_type: MediaType,
        external_ids: &[String],
    ) -> AppResult<HashMap<String, MetadataPatch>> {
        let ids: Vec<u64> = external_ids
            .iter()
            .filter_map(|id| id.trim().parse().ok())
            .take(MAX_PER_PAGE as usize)
            .collect();

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let (kind, _) = media_filter(media_type);
        let request = OutboundRequest::post_json(
            self.api_url.clone(),
            json!({
                "query": METADATA_QUERY,
                "variables": { "ids": ids, "type": kind, "perPage": ids.len() },
            }),
        );

        let media = self.query_media(request, CachePolicy::Prefer).await?;

        let patches: HashMap<String, MetadataPatch> = media
            .iter()
            .filter_map(|m| m.id_mal.map(|id| (id.to_string(), m.metadata_patch())))
            .collect();

        tracing::debug!(
            requested = ids.len(),
            matched = patches.len(),
            "Fetched metadata from AniList"
        );

        Ok(patches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ResponseCache;
    use crate::services::queue::{MockHttpTransport, QueueConfig, RequestQueue, TransportResponse};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn provider(mock: MockHttpTransport) -> AniListProvider {
        let (queue, _handle) = RequestQueue::new(
            Arc::new(mock),
            QueueConfig {
                request_interval: Duration::from_millis(1),
                throttle_cooldown: Duration::from_millis(1),
                max_throttle_retries: 1,
            },
        );
        let client = CatalogClient::from_parts(queue, ResponseCache::new(100, Duration::from_secs(60)));
        AniListProvider::new(client, "https://graphql.anilist.co".to_string())
    }

    fn capture(body: &'static str, seen: Arc<Mutex<Vec<OutboundRequest>>>) -> MockHttpTransport {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().returning(move |request| {
            seen.lock().unwrap().push(request.clone());
            Ok(TransportResponse {
                status: 200,
                body: body.to_string(),
            })
        });
        mock
    }

    fn variables(request: &OutboundRequest) -> Value {
        match request {
            OutboundRequest::PostJson { body, .. } => body["variables"].clone(),
            other => panic!("expected a POST, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_manhwa_trending_filters_korea() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().never();
        let anilist = provider(mock);

        let vars = variables(&anilist.trending_request(MediaType::Manhwa, 1, 4));
        assert_eq!(vars["type"], "MANGA");
        assert_eq!(vars["country"], "KR");
        assert_eq!(vars["perPage"], 4);

        let vars = variables(&anilist.trending_request(MediaType::Manga, 2, 4));
        assert_eq!(vars["country"], "JP");
        assert_eq!(vars["page"], 2);

        let vars = variables(&anilist.trending_request(MediaType::Anime, 1, 4));
        assert_eq!(vars["type"], "ANIME");
        assert!(vars.get("country").is_none());
    }

    #[tokio::test]
    async fn test_fetch_trending_normalizes_media() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let body = r#"{"data": {"Page": {"media": [
            {
                "id": 105398,
                "idMal": 121496,
                "title": {"romaji": "Na Honjaman Level Up", "english": "Solo Leveling"},
                "coverImage": {"large": "https://s4.anilist.co/cover.jpg"},
                "genres": ["Action", "Adventure", "Fantasy"],
                "averageScore": 84,
                "chapters": 201,
                "status": "FINISHED"
            },
            {
                "id": 1,
                "title": {}
            }
        ]}}}"#;
        let anilist = provider(capture(body, seen.clone()));

        let candidates = anilist
            .fetch_trending(MediaType::Manhwa, 1, 10, CachePolicy::Prefer)
            .await
            .unwrap();

        // Entries without any usable title are dropped
        assert_eq!(candidates.len(), 1);
        let solo = &candidates[0];
        assert_eq!(solo.external_id, "121496");
        assert_eq!(solo.media_type, MediaType::Manhwa);
        assert_eq!(solo.quality_score, Some(8.4));
        assert_eq!(solo.status.as_deref(), Some("Finished"));
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_graphql_errors_surface_as_external_api() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let body = r#"{"data": null, "errors": [{"message": "Too Many Requests."}]}"#;
        let anilist = provider(capture(body, seen));

        let result = anilist
            .fetch_trending(MediaType::Anime, 1, 10, CachePolicy::Prefer)
            .await;

        match result {
            Err(AppError::ExternalApi(msg)) => assert!(msg.contains("Too Many Requests.")),
            other => panic!("expected ExternalApi, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_enrich_metadata_batches_ids() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let body = r#"{"data": {"Page": {"media": [
            {"id": 21, "idMal": 21, "episodes": null, "chapters": 1100, "status": "RELEASING"},
            {"id": 30013, "idMal": 2, "chapters": null, "status": "HIATUS"}
        ]}}}"#;
        let anilist = provider(capture(body, seen.clone()));

        let ids = vec!["21".to_string(), "2".to_string(), "anilist:99".to_string()];
        let patches = anilist.enrich_metadata(MediaType::Manga, &ids).await.unwrap();

        assert_eq!(patches.len(), 2);
        assert_eq!(patches["21"].chapters, Some(1100));
        assert_eq!(patches["21"].status.as_deref(), Some("Publishing"));
        assert_eq!(patches["2"].status.as_deref(), Some("Hiatus"));

        let requests = seen.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(variables(&requests[0])["ids"], serde_json::json!([21, 2]));
    }

    #[tokio::test]
    async fn test_enrich_metadata_without_numeric_ids_skips_network() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().never();
        let anilist = provider(mock);

        let patches = anilist
            .enrich_metadata(MediaType::Anime, &["anilist:5".to_string()])
            .await
            .unwrap();
        assert!(patches.is_empty());
    }
}
