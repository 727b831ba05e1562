use anyhow::Context;
use axum::{
    http::{header::CONTENT_DISPOSITION, Method},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use crate::config::Config;
use crate::extractors::{MetadataProvider, StreamProvider, YtDlp};
use crate::transcript::TranscriptService;
use crate::translate::TranslationPolicy;
use crate::Result;

/// Collaborators shared by every request
#[derive(Clone)]
pub struct AppState {
    pub metadata: Arc<dyn MetadataProvider>,
    pub streams: Arc<dyn StreamProvider>,
    pub transcripts: Arc<TranscriptService>,
    /// Overrides the base URL derived from request headers
    pub public_base_url: Option<String>,
}

impl AppState {
    pub fn new(
        metadata: Arc<dyn MetadataProvider>,
        streams: Arc<dyn StreamProvider>,
        transcripts: Arc<TranscriptService>,
    ) -> Self {
        Self {
            metadata,
            streams,
            transcripts,
            public_base_url: None,
        }
    }

    pub fn with_public_base_url(mut self, base: Option<String>) -> Self {
        self.public_base_url = base.map(|b| b.trim_end_matches('/').to_string());
        self
    }

    /// Wire yt-dlp and the configured translators together
    pub fn from_config(config: &Config) -> Result<Self> {
        let ytdlp = Arc::new(YtDlp::new(&config.extractor));
        let policy = Arc::new(TranslationPolicy::from_config(&config.translation)?);
        let transcripts = Arc::new(TranscriptService::new(
            ytdlp.clone(),
            policy,
            config.extractor.caption_language.clone(),
        ));

        Ok(Self::new(ytdlp.clone(), ytdlp, transcripts)
            .with_public_base_url(config.server.public_base_url.clone()))
    }
}

/// Routes are served both at the root and under `/api`
pub fn router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/download", get(handlers::download))
        .route("/stream", get(handlers::stream))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api", routes.clone())
        .merge(routes)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION])
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config)?;
    let addr = config.bind_address();

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    if config.translation.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set, transcripts use the fallback translator only");
    }

    serve_listener(listener, state).await
}

/// Serve on an already bound listener
pub async fn serve_listener(listener: TcpListener, state: AppState) -> Result<()> {
    let local = listener.local_addr()?;
    tracing::info!("Server listening on http://{}", local);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
