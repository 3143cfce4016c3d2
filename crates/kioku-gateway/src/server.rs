// SPDX-FileCopyrightText: 2026 Kioku Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state. All service handles
//! live in [`AppContext`] and are injected at construction; nothing is
//! global.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use kioku_agent::Orchestrator;
use kioku_analysis::TimeProvider;
use kioku_config::model::KiokuConfig;
use kioku_core::KiokuError;
use kioku_d1::SessionStore;
use kioku_llm::OpenAiClient;
use kioku_vector::VectorMemoryStore;
use tower_http::cors::CorsLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::{handlers, upload};

/// Everything a request handler can reach. Built once at startup and
/// cloned into the router; all members are cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub orchestrator: Orchestrator,
    pub sessions: SessionStore,
    pub vector: VectorMemoryStore,
    pub llm: OpenAiClient,
    pub time: TimeProvider,
    pub config: KiokuConfig,
}

/// Builds the full application router.
///
/// `/` and `/health` stay public; everything under `/api/` goes through
/// the bearer-token middleware.
pub fn build_router(ctx: AppContext) -> Router {
    let auth = AuthConfig {
        bearer_token: ctx.config.server.bearer_token.clone(),
    };

    // Multipart routes need headroom above the largest per-file cap.
    let body_limit = ctx
        .config
        .upload
        .max_file_bytes
        .max(ctx.config.upload.max_audio_bytes) as usize
        + 1024 * 1024;

    let public_routes = Router::new()
        .route("/", get(handlers::get_root))
        .route("/health", get(handlers::get_health))
        .with_state(ctx.clone());

    let api_routes = Router::new()
        .route("/api/chat", post(handlers::post_chat))
        .route(
            "/api/chat/sessions",
            get(handlers::get_sessions).post(handlers::post_session),
        )
        .route(
            "/api/chat/sessions/{id}",
            get(handlers::get_session)
                .put(handlers::put_session)
                .delete(handlers::delete_session),
        )
        .route(
            "/api/chat/sessions/{id}/messages",
            get(handlers::get_messages).post(handlers::post_message),
        )
        .route("/api/chat/search", get(handlers::get_search))
        .route("/api/chat/stats", get(handlers::get_stats))
        .route("/api/memories", delete(handlers::delete_memories))
        .route("/api/upload", post(upload::post_upload))
        .route("/api/transcribe", post(upload::post_transcribe))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(ctx);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
}

/// Binds the configured address and serves until shutdown.
pub async fn start_server(ctx: AppContext) -> Result<(), KiokuError> {
    let addr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port);
    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KiokuError::Internal(format!("failed to bind {addr}: {e}")))?;

    tracing::info!("kioku listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| KiokuError::Internal(format!("server error: {e}")))?;

    tracing::info!("kioku shut down");
    Ok(())
}

/// Resolves when the process receives SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {
                        tracing::info!("received SIGINT (Ctrl+C), initiating shutdown");
                    }
                    _ = sigterm.recv() => {
                        tracing::info!("received SIGTERM, initiating shutdown");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                let _ = ctrl_c.await;
                tracing::info!("received Ctrl+C, initiating shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received Ctrl+C, initiating shutdown");
    }
}
