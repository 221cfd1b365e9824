//! Axum HTTP surface for the boundary guard.
//!
//! The routes own no validation logic: every decision comes from the guards
//! via the orchestrators, and this layer only maps verdicts onto status
//! codes and fixed response bodies. Denied requests answer with a reason
//! kind, never with resolved addresses or filesystem paths.

mod handlers;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    Router,
    routing::{get, put},
};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::Config;
use crate::keyfiles::KeyFileServer;
use crate::security::UrlSafetyGuard;
use crate::store::UserStore;
use crate::upload::UploadOrchestrator;
use crate::upload::fetcher::HttpImageFetcher;

/// Maximum request body size (16KB) — a JSON body carrying one URL.
pub const MAX_BODY_SIZE: usize = 16_384;
/// Request timeout (60s) — must outlast the bounded upstream fetch.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<UserStore>,
    pub uploads: Arc<UploadOrchestrator>,
    pub key_files: Arc<KeyFileServer>,
}

/// Upload request body.
#[derive(serde::Deserialize)]
pub struct ImageUrlBody {
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/encryptionkeys/{file}", get(handlers::handle_key_file))
        .route("/profile/image-url", put(handlers::handle_image_url_upload))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

fn is_public_bind(host: &str) -> bool {
    !matches!(host, "127.0.0.1" | "localhost" | "::1" | "[::1]")
}

/// Run the HTTP gateway.
pub async fn run_gateway(config: Config) -> Result<()> {
    let host = config.server.host.clone();
    let port = config.server.port;

    // ── Security: refuse public bind without explicit opt-in ──
    if is_public_bind(&host) && !config.server.allow_public_bind {
        anyhow::bail!(
            "🛑 Refusing to bind to {host} — the guard endpoints would be exposed.\n\
             Fix: use --config with host = \"127.0.0.1\" (default), or set\n\
             [server] allow_public_bind = true (NOT recommended)."
        );
    }

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    run_gateway_with_listener(listener, config).await
}

/// Run the HTTP gateway from a pre-bound listener.
pub async fn run_gateway_with_listener(
    listener: tokio::net::TcpListener,
    config: Config,
) -> Result<()> {
    let state = build_state(&config).await?;
    let display_addr = listener.local_addr()?;
    tracing::info!(%display_addr, "wardgate listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Wire the production collaborators together.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let store = Arc::new(UserStore::open(&config.storage.database_path()).await?);

    let guard = UrlSafetyGuard::new(Duration::from_secs(config.upload.dns_timeout_secs));
    let fetcher = Arc::new(HttpImageFetcher::new(Duration::from_secs(
        config.upload.fetch_timeout_secs,
    ))?);
    let uploads = Arc::new(UploadOrchestrator::new(
        guard,
        fetcher,
        store.clone(),
        config.storage.uploads_dir(),
        &config.upload,
    )?);

    let key_files = Arc::new(KeyFileServer::new(config.storage.key_files_dir()));

    Ok(AppState {
        store,
        uploads,
        key_files,
    })
}
