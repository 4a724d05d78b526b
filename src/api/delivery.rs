use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::coordinator::Dispatch;
use crate::error::ApiError;
use crate::models::courier::TransportType;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery/assign", post(assign))
        .route("/delivery/unassign", post(unassign))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub order_id: String,
}

#[derive(Serialize)]
pub struct AssignResponse {
    pub courier_id: i32,
    pub order_id: String,
    pub transport_type: TransportType,
    pub delivery_deadline: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct UnassignRequest {
    pub order_id: String,
}

#[derive(Serialize)]
pub struct UnassignResponse {
    pub order_id: String,
    pub status: &'static str,
    pub courier_id: i32,
}

async fn assign(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AssignRequest>, JsonRejection>,
) -> Result<Json<AssignResponse>, ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::BadRequest("bad request".to_string()))?;

    if payload.order_id.is_empty() {
        return Err(ApiError::BadRequest("bad request".to_string()));
    }

    let (delivery, courier) = state.coordinator.assign(&payload.order_id).await?;

    Ok(Json(AssignResponse {
        courier_id: courier.id,
        order_id: delivery.order_id,
        transport_type: courier.transport_type,
        delivery_deadline: delivery.deadline,
    }))
}

async fn unassign(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UnassignRequest>, JsonRejection>,
) -> Result<Json<UnassignResponse>, ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::BadRequest("bad request".to_string()))?;

    if payload.order_id.is_empty() {
        return Err(ApiError::BadRequest("bad request".to_string()));
    }

    let release = state.coordinator.unassign(&payload.order_id).await?;

    Ok(Json(UnassignResponse {
        order_id: release.order_id,
        status: "unassigned",
        courier_id: release.courier_id,
    }))
}
