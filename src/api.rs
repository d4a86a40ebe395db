//! HTTP surface: `POST /solve_task`, `POST /verify`, `GET /health`.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::service::Engine;
use crate::task::{SolveResult, TaskDescriptor, VerifyRequest, VerifyResult};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/solve_task", post(solve_task))
        .route("/verify", post(verify))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Bind the configured address and serve until ctrl-c.
pub async fn serve(engine: Arc<Engine>) -> anyhow::Result<()> {
    let addr = engine.config().bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(engine))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn solve_task(
    State(engine): State<Arc<Engine>>,
    Json(task): Json<TaskDescriptor>,
) -> Json<SolveResult> {
    Json(engine.solve_task(task).await)
}

async fn verify(
    State(engine): State<Arc<Engine>>,
    Json(request): Json<VerifyRequest>,
) -> Json<VerifyResult> {
    Json(engine.verify(request).await)
}
