//! Restocking requests: pending, then approved or rejected, then received.

use crate::api::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use greenfis_core::{NewRestock, RestockRequest, RestockStatus};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct RestockQuery {
    pub status: Option<RestockStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RestockQuery>,
) -> ApiResult<Json<Vec<RestockRequest>>> {
    let requests = state
        .run(move |store| store.list_restocks(query.status))
        .await?;
    Ok(Json(requests))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<RestockRequest>> {
    Ok(Json(
        state
            .run(move |store| store.fetch::<RestockRequest>(id))
            .await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewRestock>,
) -> ApiResult<(StatusCode, Json<RestockRequest>)> {
    let now = state.now();
    let request = state
        .run(move |store| store.create_restock(input, now))
        .await?;
    info!(
        restock_id = request.id,
        product_id = request.product_id,
        quantity = request.quantity,
        "restock requested"
    );
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn approve(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<RestockRequest>> {
    let now = state.now();
    let request = state
        .run(move |store| store.approve_restock(id, now))
        .await?;
    info!(restock_id = id, "restock approved");
    Ok(Json(request))
}

pub async fn reject(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<RestockRequest>> {
    let now = state.now();
    let request = state
        .run(move |store| store.reject_restock(id, now))
        .await?;
    info!(restock_id = id, "restock rejected");
    Ok(Json(request))
}

pub async fn receive(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<RestockRequest>> {
    let now = state.now();
    let request = state
        .run(move |store| store.receive_restock(id, now))
        .await?;
    info!(
        restock_id = id,
        location_id = request.location_id,
        quantity = request.quantity,
        "restock received"
    );
    Ok(Json(request))
}
