pub mod couriers;
pub mod delivery;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{get, head};
use axum::{Json, Router};
use serde_json::json;

use crate::observability;
use crate::ratelimit;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .merge(couriers::router())
        .merge(delivery::router())
        .route("/ping", get(ping))
        .route("/healthcheck", head(healthcheck))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            ratelimit::middleware::rate_limit,
        ));

    Router::new()
        .nest("/api/v1", api)
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            observability::middleware::track_requests,
        ))
        .with_state(state)
}

async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "message": "pong" }))
}

async fn healthcheck() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
