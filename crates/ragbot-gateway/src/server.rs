//! HTTP server implementation using Axum.

use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use ragbot_agent::QueryService;
use ragbot_core::config::RagbotConfig;
use ragbot_core::error::{RagbotError, Result};
use ragbot_core::traits::{DocumentStore, EmbeddingProvider, Provider};
use ragbot_knowledge::{LoadOutcome, LocalEmbedder, VectorStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub query: Arc<QueryService>,
    pub start_time: std::time::Instant,
    /// Upper bound on the provider readiness check in `/health`.
    pub health_timeout: Duration,
}

impl AppState {
    pub fn new(query: QueryService) -> Self {
        Self {
            query: Arc::new(query),
            start_time: std::time::Instant::now(),
            health_timeout: Duration::from_secs(3),
        }
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }
}

/// Embedder named by `[embedding] provider`: `"local"` or a registry provider.
pub async fn build_embedder(config: &RagbotConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    if config.embedding.provider == "local" {
        let model = config.embedding.model.clone();
        let dimensions = config.embedding.dimensions;
        // model load may download weights
        let embedder = tokio::task::spawn_blocking(move || LocalEmbedder::load(&model, dimensions))
            .await
            .map_err(|e| RagbotError::Embedding(format!("embedding model loader panicked: {e}")))??;
        return Ok(Arc::new(embedder));
    }
    Ok(Arc::from(ragbot_providers::create_embedder(
        &config.embedding,
        &config.llm,
    )?))
}

/// Build the store, provider and query service from config.
pub async fn build_query_service(config: &RagbotConfig) -> Result<QueryService> {
    let embedder = build_embedder(config).await?;
    let store: Arc<dyn DocumentStore> = Arc::new(
        VectorStore::open(
            Path::new(&config.store.path),
            &config.store.collection,
            embedder.clone(),
        )
        .await?,
    );
    let provider: Arc<dyn Provider> = Arc::from(ragbot_providers::create_provider(&config.llm)?);

    tracing::info!(
        "🗄️  Store: {} (collection '{}', embedder {})",
        config.store.path,
        config.store.collection,
        embedder.name()
    );
    tracing::info!(
        "🤖 Provider: {} (model {})",
        provider.name(),
        config.llm.model
    );

    Ok(QueryService::new(store, provider, config.llm.model.clone()))
}

/// CORS for a credentialed allow-list.
///
/// Credentials rule out `*`, so methods and headers mirror the preflight request.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|s| match s.trim().parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin '{s}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/ask", post(super::routes::ask))
        .route("/health", get(super::routes::health_check))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Bootstrap the store from the documents file, then serve until shutdown.
pub async fn start(config: &RagbotConfig) -> anyhow::Result<()> {
    let query = build_query_service(config).await?;

    let documents_path = Path::new(&config.store.documents_path);
    match ragbot_knowledge::load_documents(query.store().as_ref(), documents_path).await? {
        LoadOutcome::Loaded(0) => {
            tracing::warn!(
                "⚠️ {} has no non-empty lines; queries will return no sources",
                documents_path.display()
            );
        }
        LoadOutcome::Loaded(_) | LoadOutcome::AlreadyLoaded(_) => {}
    }

    let app = build_router(AppState::new(query), &config.gateway.cors_origins);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("🌐 Ragbot listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("⚠️ Ctrl-C handler unavailable: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("⚠️ SIGTERM handler unavailable: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining connections");
}
