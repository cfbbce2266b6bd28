//! Stock per (location, product).

use crate::api::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use greenfis_core::{InventoryItem, StockAdjustment, StockLevel};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct InventoryQuery {
    pub location_id: Option<u64>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<InventoryQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let items = state
        .run(move |store| store.list_inventory(query.location_id))
        .await?;
    Ok(Json(items))
}

pub async fn low_stock(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<InventoryQuery>,
) -> ApiResult<Json<Vec<InventoryItem>>> {
    let items = state
        .run(move |store| store.low_stock(query.location_id))
        .await?;
    Ok(Json(items))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath((location_id, product_id)): ApiPath<(u64, u64)>,
) -> ApiResult<Json<InventoryItem>> {
    let item = state
        .run(move |store| store.stock_level(location_id, product_id))
        .await?;
    Ok(Json(item))
}

pub async fn set_level(
    State(state): State<AppState>,
    ApiPath((location_id, product_id)): ApiPath<(u64, u64)>,
    ApiJson(level): ApiJson<StockLevel>,
) -> ApiResult<Json<InventoryItem>> {
    let item = state
        .run(move |store| store.apply_stock_level(location_id, product_id, level))
        .await?;
    info!(
        location_id,
        product_id,
        quantity = item.quantity,
        "stock level set"
    );
    Ok(Json(item))
}

pub async fn adjust(
    State(state): State<AppState>,
    ApiPath((location_id, product_id)): ApiPath<(u64, u64)>,
    ApiJson(adjustment): ApiJson<StockAdjustment>,
) -> ApiResult<Json<InventoryItem>> {
    let item = state
        .run(move |store| store.adjust_stock(location_id, product_id, adjustment.delta))
        .await?;
    info!(
        location_id,
        product_id,
        delta = adjustment.delta,
        quantity = item.quantity,
        "stock adjusted"
    );
    Ok(Json(item))
}
