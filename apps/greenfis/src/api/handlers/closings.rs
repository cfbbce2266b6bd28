//! Cash-register closings.

use crate::api::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use greenfis_core::{CashClosing, NewClosing};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct ClosingQuery {
    pub cashier_id: Option<u64>,
    pub location_id: Option<u64>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ClosingQuery>,
) -> ApiResult<Json<Vec<CashClosing>>> {
    let closings = state.run(|store| store.list::<CashClosing>()).await?;
    Ok(Json(
        closings
            .into_iter()
            .filter(|c| query.cashier_id.is_none_or(|id| id == c.cashier_id))
            .filter(|c| query.location_id.is_none_or(|id| id == c.location_id))
            .collect(),
    ))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<CashClosing>> {
    Ok(Json(
        state.run(move |store| store.fetch::<CashClosing>(id)).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewClosing>,
) -> ApiResult<(StatusCode, Json<CashClosing>)> {
    let now = state.now();
    let closing = state
        .run(move |store| store.close_register(input, now))
        .await?;
    if closing.difference.is_negative() {
        warn!(
            closing_id = closing.id,
            cashier_id = closing.cashier_id,
            difference = %closing.difference,
            "register closed short"
        );
    } else {
        info!(
            closing_id = closing.id,
            cashier_id = closing.cashier_id,
            difference = %closing.difference,
            "register closed"
        );
    }
    Ok((StatusCode::CREATED, Json(closing)))
}
