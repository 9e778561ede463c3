//! Read-only status endpoint
//!
//! Operators can inspect the arbitration records and the scheduler state
//! without touching the store directly.

use arbitration_engine::{ArbitrationStore, Scheduler};
use arbitration_types::Role;
use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared state of the status handlers
pub struct StatusContext {
    pub store: Arc<ArbitrationStore>,
    pub scheduler: Arc<Scheduler>,
    pub role: Role,
}

/// HTTP status server
pub struct StatusServer {
    context: Arc<StatusContext>,
}

impl StatusServer {
    pub fn new(context: Arc<StatusContext>) -> Self {
        Self { context }
    }

    pub fn router(self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

        Router::new()
            .route("/health", get(handle_health))
            .route("/arbitrations", get(handle_list))
            .route("/arbitrations/:hash", get(handle_get))
            .layer(cors)
            .with_state(self.context)
    }

    pub async fn run(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Status server listening on {}", addr);

        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_health(State(ctx): State<Arc<StatusContext>>) -> impl IntoResponse {
    let cache = ctx.scheduler.coordinator().engine().chain_relations.stats();
    Json(json!({
        "status": "ok",
        "role": ctx.role,
        "running": ctx.scheduler.is_running(),
        "discoveryBusy": ctx.scheduler.discovery_guard().is_held(),
        "proofSyncBusy": ctx.scheduler.proof_sync_guard().is_held(),
        "chainRelationCache": {
            "hits": cache.hits,
            "misses": cache.misses,
            "staleHits": cache.stale_hits,
        },
    }))
}

async fn handle_list(State(ctx): State<Arc<StatusContext>>) -> Response {
    match ctx.store.records() {
        Ok(records) => Json(records).into_response(),
        Err(e) => store_failure(e),
    }
}

async fn handle_get(State(ctx): State<Arc<StatusContext>>, Path(hash): Path<String>) -> Response {
    match ctx.store.get(&hash) {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, Json(json!({ "error": "unknown hash" }))).into_response(),
        Err(e) => store_failure(e),
    }
}

fn store_failure(e: impl std::fmt::Display) -> Response {
    tracing::error!("Status query failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
        .into_response()
}
