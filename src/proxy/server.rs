use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::time::Duration;
use tower_http::cors::CorsLayer;

use crate::error::{AppError, AppResult};
use crate::models::GatewayConfig;
use crate::modules::logger::{log_error, log_warn};
use crate::proxy::handlers;
use crate::proxy::middleware::monitor_middleware;
use crate::proxy::upstream::UpstreamClient;

/// Shared by every handler. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> AppResult<Self> {
        let upstream = UpstreamClient::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self {
            config: Arc::new(config),
            upstream: Arc::new(upstream),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::models::health))
        .route(
            "/v1/chat/completions",
            post(handlers::openai::handle_chat_completions),
        )
        .route(
            "/:provider/v1/chat/completions",
            post(handlers::openai::handle_chat_completions),
        )
        .route("/v1/models", get(handlers::models::handle_list_models))
        .route(
            "/:provider/v1/models",
            get(handlers::models::handle_list_models),
        )
        .layer(axum::middleware::from_fn(monitor_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `listen_addr` and serve until Ctrl+C.
pub async fn serve(config: GatewayConfig) -> AppResult<()> {
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .map_err(|e| AppError::Config(format!("listen_addr {:?}: {}", config.listen_addr, e)))?;

    let state = AppState::new(config)?;
    for provider in crate::proxy::provider::Provider::ALL {
        let settings = provider.settings(&state.config);
        if settings.api_key.is_none() {
            log_warn(&format!(
                "{}: no API key configured, upstream calls will be unauthenticated",
                provider
            ));
        }
        tracing::info!("{} -> {} ({:?})", provider, settings.base_url, settings.stream_profile);
    }

    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("bind {} failed: {}", addr, e)))?;
    tracing::info!("Reasoning gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log_error(&format!("Failed to listen for Ctrl+C: {}", e));
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
