use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::courier::{Courier, CourierStatus, NewCourier, TransportType};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/couriers",
            get(list_couriers).post(create_courier).put(update_courier),
        )
        .route("/couriers/:id", get(get_courier))
}

#[derive(Deserialize)]
pub struct CreateCourierRequest {
    pub name: String,
    pub phone: String,
    pub status: CourierStatus,
    pub transport_type: TransportType,
}

#[derive(Deserialize)]
pub struct UpdateCourierRequest {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub status: CourierStatus,
    pub transport_type: TransportType,
}

#[derive(Serialize)]
pub struct CourierResponse {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub status: CourierStatus,
    pub transport_type: TransportType,
}

impl From<Courier> for CourierResponse {
    fn from(courier: Courier) -> Self {
        CourierResponse {
            id: courier.id,
            name: courier.name,
            phone: courier.phone,
            status: courier.status,
            transport_type: courier.transport_type,
        }
    }
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: i32,
}

#[derive(Serialize)]
pub struct UpdatedResponse {
    pub status: &'static str,
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CourierResponse>, ApiError> {
    let id: i32 = id
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid id".to_string()))?;
    if id <= 0 {
        return Err(ApiError::BadRequest("invalid id".to_string()));
    }

    let courier = state.couriers.get_by_id(id).await?;
    Ok(Json(courier.into()))
}

async fn list_couriers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CourierResponse>>, ApiError> {
    let couriers = state.couriers.get_all().await?;
    Ok(Json(couriers.into_iter().map(Into::into).collect()))
}

async fn create_courier(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCourierRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::BadRequest("bad request".to_string()))?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("invalid name".to_string()));
    }
    if !valid_phone(&payload.phone) {
        return Err(ApiError::BadRequest("invalid phone".to_string()));
    }

    let id = state
        .couriers
        .create(&NewCourier {
            name: payload.name,
            phone: payload.phone,
            status: payload.status,
            transport_type: payload.transport_type,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id })))
}

async fn update_courier(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UpdateCourierRequest>, JsonRejection>,
) -> Result<Json<UpdatedResponse>, ApiError> {
    let Json(payload) = payload.map_err(|_| ApiError::BadRequest("bad request".to_string()))?;

    if payload.id <= 0 {
        return Err(ApiError::BadRequest("invalid id".to_string()));
    }
    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("invalid name".to_string()));
    }
    if !valid_phone(&payload.phone) {
        return Err(ApiError::BadRequest("invalid phone".to_string()));
    }

    state
        .couriers
        .update(
            payload.id,
            &NewCourier {
                name: payload.name,
                phone: payload.phone,
                status: payload.status,
                transport_type: payload.transport_type,
            },
        )
        .await?;

    Ok(Json(UpdatedResponse { status: "updated" }))
}

fn valid_phone(phone: &str) -> bool {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}
