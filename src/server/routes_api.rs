use crate::conversion::ActiveConversion;
use crate::server::AppContext;
use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

pub fn api_routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "root": ctx.sandbox.root(),
    }))
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    active: Option<ActiveConversion>,
}

async fn status(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(StatusResponse {
        active: ctx.supervisor.active().await,
    })
}
