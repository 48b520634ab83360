use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mangaverse_recs::{
    config::Config,
    db::{create_pool, PgLibraryStore, ResponseCache},
    routes::{create_router, AppState},
    services::{
        providers::{anilist::AniListProvider, jikan::JikanProvider},
        CatalogClient, ExternalCatalog, RecommendationService, ReqwestTransport,
        TitleSearchService,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env()?;
    info!(
        jikan = %config.jikan_api_url,
        anilist = %config.anilist_api_url,
        interval_ms = config.request_interval_ms,
        "Configuration loaded"
    );

    let transport = ReqwestTransport::new(config.http_timeout())
        .context("Failed to build HTTP client")?;
    let (client, queue_handle) = CatalogClient::new(Arc::new(transport), &config);

    let jikan = JikanProvider::new(client.clone(), config.jikan_api_url.clone());
    let anilist = AniListProvider::new(client, config.anilist_api_url.clone());
    let gateway = Arc::new(ExternalCatalog::new(jikan, anilist));

    let recommender = RecommendationService::new(gateway.clone(), config.pipeline_config());
    let title_search = TitleSearchService::new(
        gateway,
        ResponseCache::new(config.search_cache_capacity, config.search_cache_ttl()),
    );

    let pool = create_pool(&config.database_url).context("Failed to configure library store")?;
    let library_store = Arc::new(PgLibraryStore::new(pool));

    let app = create_router(AppState::new(recommender, title_search, library_store));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    queue_handle.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mangaverse_recs=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
