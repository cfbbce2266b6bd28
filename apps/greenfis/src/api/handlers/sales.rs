//! Checkout, quotes and sale history.

use super::{Bound, parse_optional_instant};
use crate::api::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use greenfis_core::{CheckoutRequest, Quote, Sale, SaleFilter};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    pub cashier_id: Option<u64>,
    pub location_id: Option<u64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SalesQuery>,
) -> ApiResult<Json<Vec<Sale>>> {
    let filter = SaleFilter {
        cashier_id: query.cashier_id,
        location_id: query.location_id,
        from: parse_optional_instant("from", query.from.as_deref(), Bound::Start)?,
        to: parse_optional_instant("to", query.to.as_deref(), Bound::End)?,
    };
    let sales = state.run(move |store| store.list_sales(&filter)).await?;
    Ok(Json(sales))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Sale>> {
    Ok(Json(state.run(move |store| store.fetch::<Sale>(id)).await?))
}

/// Price a cart without recording anything.
pub async fn quote(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<Json<Quote>> {
    let now = state.now();
    let quote = state.run(move |store| store.quote(&request, now)).await?;
    Ok(Json(quote))
}

/// Record a sale and take the stock.
pub async fn checkout(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> ApiResult<(StatusCode, Json<Sale>)> {
    let now = state.now();
    let sale = state.run(move |store| store.checkout(request, now)).await?;
    info!(
        sale_id = sale.id,
        cashier_id = sale.cashier_id,
        location_id = sale.location_id,
        lines = sale.lines.len(),
        total = %sale.total,
        "sale recorded"
    );
    Ok((StatusCode::CREATED, Json(sale)))
}
