use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

use crate::{
    cached,
    config::Config,
    db::{CacheKey, CachePolicy, ResponseCache},
    error::{AppError, AppResult},
    services::queue::{HttpTransport, OutboundRequest, QueueWorkerHandle, RequestQueue},
};

/// Shared entry point for all upstream catalog traffic
///
/// Owns the rate-limited queue and the response cache. Every lookup checks the
/// cache first and only enqueues a network call on a miss.
#[derive(Clone)]
pub struct CatalogClient {
    queue: RequestQueue,
    cache: ResponseCache<Value>,
}

impl CatalogClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: &Config) -> (Self, QueueWorkerHandle) {
        let (queue, handle) = RequestQueue::new(transport, config.queue_config());
        let cache = ResponseCache::new(config.candidate_cache_capacity, config.candidate_cache_ttl());

        (Self { queue, cache }, handle)
    }

    pub fn from_parts(queue: RequestQueue, cache: ResponseCache<Value>) -> Self {
        Self { queue, cache }
    }

    /// Raw JSON for a request, served from cache when possible
    pub async fn fetch_json(&self, request: OutboundRequest, policy: CachePolicy) -> AppResult<Value> {
        let key = CacheKey::Request(request.signature());
        let queue = self.queue.clone();

        cached!(self.cache, key, policy, async move { queue.enqueue(request).await })
    }

    /// Fetches and decodes into a typed provider payload
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: OutboundRequest,
        policy: CachePolicy,
    ) -> AppResult<T> {
        let url = request.url().to_string();
        let value = self.fetch_json(request, policy).await?;

        serde_json::from_value(value)
            .map_err(|e| AppError::MalformedResponse(format!("{}: {}", url, e)))
    }

    /// Queued but never cached, for callers that keep their own cache
    pub async fn fetch_uncached<T: DeserializeOwned>(&self, request: OutboundRequest) -> AppResult<T> {
        let url = request.url().to_string();
        let value = self.queue.enqueue(request).await?;

        serde_json::from_value(value)
            .map_err(|e| AppError::MalformedResponse(format!("{}: {}", url, e)))
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::queue::{MockHttpTransport, QueueConfig, TransportResponse};
    use std::time::Duration;

    fn client_with(mock: MockHttpTransport, ttl: Duration) -> (CatalogClient, QueueWorkerHandle) {
        let (queue, handle) = RequestQueue::new(
            Arc::new(mock),
            QueueConfig {
                request_interval: Duration::from_millis(1),
                throttle_cooldown: Duration::from_millis(1),
                max_throttle_retries: 1,
            },
        );
        (CatalogClient::from_parts(queue, ResponseCache::new(100, ttl)), handle)
    }

    fn genre_request() -> OutboundRequest {
        OutboundRequest::get("https://api.jikan.moe/v4/anime")
            .query("genres", 1)
            .query("limit", 8)
    }

    #[tokio::test]
    async fn test_second_lookup_is_served_from_cache() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(1).returning(|_| {
            Ok(TransportResponse {
                status: 200,
                body: r#"{"data": [{"mal_id": 20}]}"#.to_string(),
            })
        });
        let (client, _handle) = client_with(mock, Duration::from_secs(3600));

        let first = client.fetch_json(genre_request(), CachePolicy::Prefer).await.unwrap();
        let second = client.fetch_json(genre_request(), CachePolicy::Prefer).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.cached_entries(), 1);
    }

    #[tokio::test]
    async fn test_bypass_refetches_and_repopulates() {
        let mut mock = MockHttpTransport::new();
        let mut calls = 0;
        mock.expect_send().times(2).returning(move |_| {
            calls += 1;
            Ok(TransportResponse {
                status: 200,
                body: format!(r#"{{"call": {}}}"#, calls),
            })
        });
        let (client, _handle) = client_with(mock, Duration::from_secs(3600));

        client.fetch_json(genre_request(), CachePolicy::Prefer).await.unwrap();
        let refreshed = client.fetch_json(genre_request(), CachePolicy::Bypass).await.unwrap();
        assert_eq!(refreshed["call"], 2);

        let cached = client.fetch_json(genre_request(), CachePolicy::Prefer).await.unwrap();
        assert_eq!(cached["call"], 2);
    }

    #[tokio::test]
    async fn test_expired_entry_goes_back_to_network() {
        let mut mock = MockHttpTransport::new();
        mock.expect_send().times(2).returning(|_| {
            Ok(TransportResponse {
                status: 200,
                body: "{}".to_string(),
            })
        });
        let (client, _handle) = client_with(mock, Duration::from_millis(30));

        client.fetch_json(genre_request(), CachePolicy::Prefer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        client.fetch_json(genre_request(), CachePolicy::Prefer).await.unwrap();
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let mut mock = MockHttpTransport::new();
        let mut calls = 0;
        mock.expect_send().times(2).returning(move |_| {
            calls += 1;
            let status = if calls == 1 { 500 } else { 200 };
            Ok(TransportResponse {
                status,
                body: "{}".to_string(),
            })
        });
        let (client, _handle) = client_with(mock, Duration::from_secs(3600));

        assert!(client.fetch_json(genre_request(), CachePolicy::Prefer).await.is_err());
        assert!(client.fetch_json(genre_request(), CachePolicy::Prefer).await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_rejects_unexpected_shape() {
        #[derive(Debug, serde::Deserialize)]
        struct Expected {
            #[allow(dead_code)]
            data: Vec<u32>,
        }

        let mut mock = MockHttpTransport::new();
        mock.expect_send().returning(|_| {
            Ok(TransportResponse {
                status: 200,
                body: r#"{"data": "nope"}"#.to_string(),
            })
        });
        let (client, _handle) = client_with(mock, Duration::from_secs(3600));

        let result: AppResult<Expected> = client.fetch(genre_request(), CachePolicy::Prefer).await;
        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
    }
}
