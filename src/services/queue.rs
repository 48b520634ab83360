//! Rate-limited request queue for outbound catalog traffic.
//!
//! Every upstream call in the process goes through one [`RequestQueue`]. A
//! single worker task drains it in FIFO order, sleeping a fixed interval before
//! each call so the upstream rate ceiling is never exceeded, however many
//! callers fan out concurrently.

use reqwest::{header::ACCEPT, Client as HttpClient};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

use crate::error::{AppError, AppResult};

const ERROR_BODY_PREVIEW: usize = 200;

/// One outbound HTTP request, in a form that can be keyed and replayed
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundRequest {
    Get {
        url: String,
        query: Vec<(String, String)>,
    },
    PostJson {
        url: String,
        body: Value,
    },
}

impl OutboundRequest {
    pub fn get(url: impl Into<String>) -> Self {
        OutboundRequest::Get {
            url: url.into(),
            query: Vec::new(),
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        OutboundRequest::PostJson {
            url: url.into(),
            body,
        }
    }

    /// Appends a query parameter; ignored for POST requests
    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        if let OutboundRequest::Get { query, .. } = &mut self {
            query.push((key.to_string(), value.to_string()));
        }
        self
    }

    pub fn url(&self) -> &str {
        match self {
            OutboundRequest::Get { url, .. } | OutboundRequest::PostJson { url, .. } => url,
        }
    }

    /// Stable identity of the request, used as the cache key
    ///
    /// Query parameters are sorted so that parameter order does not matter.
    pub fn signature(&self) -> String {
        match self {
            OutboundRequest::Get { url, query } => {
                if query.is_empty() {
                    return format!("GET {}", url);
                }
                let mut pairs: Vec<String> =
                    query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                pairs.sort();
                format!("GET {}?{}", url, pairs.join("&"))
            }
            OutboundRequest::PostJson { url, body } => format!("POST {} {}", url, body),
        }
    }
}

/// Raw status and body of an upstream response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a single request, with no retry or pacing of its own
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> AppResult<TransportResponse>;
}

/// Production transport backed by reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    http_client: HttpClient,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("mangaverse-recs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http_client })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> AppResult<TransportResponse> {
        let builder = match request {
            OutboundRequest::Get { url, query } => self.http_client.get(url).query(query),
            OutboundRequest::PostJson { url, body } => self.http_client.post(url).json(body),
        };

        let response = builder.header(ACCEPT, "application/json").send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

/// Pacing and throttling knobs of the queue worker
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Sleep before every call, retries included
    pub request_interval: Duration,
    /// Extra sleep after a 429 before the same request is retried
    pub throttle_cooldown: Duration,
    /// Retries allowed after the first throttled attempt
    pub max_throttle_retries: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            request_interval: Duration::from_millis(350),
            throttle_cooldown: Duration::from_millis(2000),
            max_throttle_retries: 5,
        }
    }
}

struct QueueItem {
    request: OutboundRequest,
    reply: oneshot::Sender<AppResult<Value>>,
}

/// Handle for stopping the queue worker
pub struct QueueWorkerHandle {
    shutdown_tx: watch::Sender<bool>,
}

impl QueueWorkerHandle {
    /// Stops the worker after the in-flight request
    ///
    /// Requests still waiting in the queue are rejected with `QueueClosed`.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        tracing::info!("Request queue shutdown signal sent");
    }
}

/// FIFO queue in front of an [`HttpTransport`]
#[derive(Clone)]
pub struct RequestQueue {
    tx: mpsc::UnboundedSender<QueueItem>,
}

impl RequestQueue {
    /// Creates the queue and spawns its single drain task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(transport: Arc<dyn HttpTransport>, config: QueueConfig) -> (Self, QueueWorkerHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(async move {
            Self::worker_task(transport, config, rx, shutdown_rx).await;
        });

        (Self { tx }, QueueWorkerHandle { shutdown_tx })
    }

    /// Queues a request and waits for its parsed JSON body
    pub async fn enqueue(&self, request: OutboundRequest) -> AppResult<Value> {
        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(QueueItem { request, reply })
            .map_err(|_| AppError::QueueClosed)?;

        reply_rx.await.map_err(|_| AppError::QueueClosed)?
    }

    async fn worker_task(
        transport: Arc<dyn HttpTransport>,
        config: QueueConfig,
        mut rx: mpsc::UnboundedReceiver<QueueItem>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        tracing::info!(
            interval_ms = config.request_interval.as_millis() as u64,
            "Request queue worker started"
        );
        let mut processed: u64 = 0;

        loop {
            tokio::select! {
                biased;
                Ok(()) = shutdown_rx.changed() => {
                    if !*shutdown_rx.borrow() {
                        continue;
                    }
                    rx.close();
                    let mut rejected = 0;
                    while let Ok(item) = rx.try_recv() {
                        let _ = item.reply.send(Err(AppError::QueueClosed));
                        rejected += 1;
                    }
                    tracing::info!(processed, rejected, "Request queue worker stopped");
                    break;
                }
                item = rx.recv() => {
                    let Some(item) = item else {
                        tracing::info!(processed, "Request queue closed by all senders");
                        break;
                    };

                    let result = Self::dispatch(transport.as_ref(), &item.request, &config).await;
                    processed += 1;

                    if item.reply.send(result).is_err() {
                        tracing::debug!(url = %item.request.url(), "Caller abandoned queued request");
                    }
                }
            }
        }
    }

    /// Sends the head-of-queue request, retrying it in place on 429
    async fn dispatch(
        transport: &dyn HttpTransport,
        request: &OutboundRequest,
        config: &QueueConfig,
    ) -> AppResult<Value> {
        let mut attempts: u32 = 0;

        loop {
            tokio::time::sleep(config.request_interval).await;
            attempts += 1;

            let response = transport.send(request).await?;

            match response.status {
                429 => {
                    if attempts > config.max_throttle_retries {
                        tracing::error!(
                            url = %request.url(),
                            attempts,
                            "Upstream still throttling, giving up"
                        );
                        return Err(AppError::RateLimitExceeded { attempts });
                    }
                    tracing::warn!(
                        url = %request.url(),
                        attempt = attempts,
                        cooldown_ms = config.throttle_cooldown.as_millis() as u64,
                        "Upstream throttled, retrying head of queue"
                    );
                    tokio::time::sleep(config.throttle_cooldown).await;
                }
                status if (200..300).contains(&status) => {
                    tracing::debug!(url = %request.url(), status, attempts, "Upstream call succeeded");
                    return serde_json::from_str(&response.body).map_err(|e| {
                        AppError::MalformedResponse(format!("{}: {}", request.url(), e))
                    });
                }
                status => {
                    let preview: String = response.body.chars().take(ERROR_BODY_PREVIEW).collect();
                    return Err(AppError::ExternalApi(format!(
                        "{} returned status {}: {}",
                        request.url(),
                        status,
                        preview
                    )));
                }
            }
        }
    }
}
