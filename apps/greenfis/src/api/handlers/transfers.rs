//! Stock transfers between locations.

use crate::api::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use greenfis_core::{NewTransfer, Transfer, TransferStatus};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct TransferQuery {
    pub status: Option<TransferStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TransferQuery>,
) -> ApiResult<Json<Vec<Transfer>>> {
    let transfers = state
        .run(move |store| store.list_transfers(query.status))
        .await?;
    Ok(Json(transfers))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Transfer>> {
    Ok(Json(
        state.run(move |store| store.fetch::<Transfer>(id)).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewTransfer>,
) -> ApiResult<(StatusCode, Json<Transfer>)> {
    let now = state.now();
    let transfer = state
        .run(move |store| store.create_transfer(input, now))
        .await?;
    info!(
        transfer_id = transfer.id,
        from = transfer.from_location,
        to = transfer.to_location,
        quantity = transfer.quantity,
        "transfer requested"
    );
    Ok((StatusCode::CREATED, Json(transfer)))
}

pub async fn complete(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Transfer>> {
    let now = state.now();
    let transfer = state
        .run(move |store| store.complete_transfer(id, now))
        .await?;
    info!(transfer_id = id, "transfer completed");
    Ok(Json(transfer))
}

pub async fn cancel(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Transfer>> {
    let now = state.now();
    let transfer = state
        .run(move |store| store.cancel_transfer(id, now))
        .await?;
    info!(transfer_id = id, "transfer cancelled");
    Ok(Json(transfer))
}
