use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use vidlens_common::config::AppConfig;
use vidlens_core::{
    create_image_analyzer, create_indexer_client, ImageAnalyzer, InsightSource, MediaStore, SearchOrchestrator,
    VideoCatalog,
};

mod handlers;

pub(crate) struct AppState {
    pub(crate) catalog: Arc<dyn VideoCatalog>,
    pub(crate) insights: Arc<dyn InsightSource>,
    pub(crate) media: Arc<dyn MediaStore>,
    pub(crate) vision: Arc<dyn ImageAnalyzer>,
    pub(crate) orchestrator: SearchOrchestrator,
    pub(crate) config: AppConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::info!("Loaded .env from: {:?}", path),
        Err(e) => tracing::warn!("Failed to load .env file: {}. Using system environment variables.", e),
    }

    let config = AppConfig::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    tracing::info!(
        "Using Video Indexer account {} in {} ({})",
        config.indexer.account_id,
        config.indexer.location,
        config.indexer.base_url
    );
    tracing::info!(
        "Search fan-out: {} in flight, image results capped at {}",
        config.search.max_in_flight,
        config.search.image_result_limit
    );

    let indexer = create_indexer_client(&config.indexer);
    let vision = create_image_analyzer(&config.vision);
    let orchestrator = SearchOrchestrator::new(indexer.clone(), indexer.clone(), &config.search);

    let state = Arc::new(AppState {
        catalog: indexer.clone(),
        insights: indexer.clone(),
        media: indexer,
        vision,
        orchestrator,
        config: config.clone(),
    });

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("HTTP API listening on {}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutdown signal received.");
        })
        .await
        .context("Server error")?;

    tracing::info!("vidlens server stopped.");
    Ok(())
}

pub(crate) fn app(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/api/analyze-image", post(handlers::analyze_image))
        .route("/api/search-by-image", post(handlers::search_by_image))
        .route("/api/search", get(handlers::search))
        .route("/api/videos", get(handlers::list_videos).post(handlers::upload_video))
        .route("/api/videos/:id/insights", get(handlers::video_insights))
        .route("/api/videos/:id/keyframes", get(handlers::keyframes))
        .route("/api/videos/:id/download-url", get(handlers::download_url))
        .route("/api/videos/:id/streaming-url", get(handlers::streaming_url))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .into_inner(),
        )
        .with_state(state)
}
