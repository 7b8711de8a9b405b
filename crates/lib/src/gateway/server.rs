//! Gateway HTTP server: Telegram webhook on POST (any path) and a health probe on GET /.

use crate::channels::TelegramClient;
use crate::config::Settings;
use crate::pipeline::Pipeline;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway. Read-only after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub settings: Arc<Settings>,
    pub pipeline: Pipeline,
}

impl GatewayState {
    pub fn new(settings: Settings) -> Result<Self> {
        let pipeline = Pipeline::from_settings(&settings).context("building classifier client")?;
        Ok(Self {
            settings: Arc::new(settings),
            pipeline,
        })
    }
}

/// Routes: GET / health, POST on any path runs the webhook pipeline.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http).post(telegram_webhook))
        .route("/*path", post(telegram_webhook))
        .with_state(state)
}

/// Run the gateway server; binds to settings.bind:settings.port.
/// Registers the webhook first when `webhook_url` is set, and removes it again on shutdown.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(settings: Settings) -> Result<()> {
    let bind_addr = settings.bind_addr();
    let webhook_url = settings.webhook_url.clone();
    let state = GatewayState::new(settings)?;

    let registered: Option<TelegramClient> = match webhook_url {
        Some(ref url) => {
            let telegram = state.pipeline.telegram().clone();
            if let Err(e) = telegram.set_webhook(url).await {
                log::warn!("telegram set_webhook failed: {}", e);
                None
            } else {
                log::info!("telegram webhook registered: {}", url);
                Some(telegram)
            }
        }
        None => None,
    };

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(registered))
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
/// Removes the Telegram webhook if this process registered it.
async fn shutdown_signal(registered: Option<TelegramClient>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("failed to install Ctrl+C handler: {}", e);
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
                log::warn!("failed to install SIGTERM handler: {}", e);
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
    log::info!("shutdown signal received, draining connections");

    if let Some(t) = registered {
        if let Err(e) = t.delete_webhook().await {
            log::debug!("telegram delete_webhook on shutdown: {}", e);
        }
    }
}

/// POST (any path) — runs the update through the pipeline; empty body, status only.
async fn telegram_webhook(
    State(state): State<GatewayState>,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            log::warn!("webhook: unreadable body: {} (responding 400)", e);
            return StatusCode::BAD_REQUEST;
        }
    };
    match state.pipeline.handle(&body).await {
        Ok(outcome) => {
            log::info!(
                "update {}: replied to chat {} ({})",
                outcome.update_id,
                outcome.chat_id,
                outcome.class
            );
            StatusCode::OK
        }
        Err(e) => {
            let status = e.status_code();
            log::warn!("webhook: {} failed: {} (responding {})", e.stage(), e, status);
            status
        }
    }
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.settings.port,
    }))
}
