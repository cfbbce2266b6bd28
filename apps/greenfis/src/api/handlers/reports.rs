//! Dashboard reports.

use super::{Bound, parse_optional_instant};
use crate::api::{ApiError, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use greenfis_core::{SalesSummary, Timestamp};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Totals for `[from, to)`. Defaults to everything up to and including now.
pub async fn sales_summary(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<Json<SalesSummary>> {
    let from = parse_optional_instant("from", query.from.as_deref(), Bound::Start)?
        .unwrap_or(Timestamp::EPOCH);
    let to = match parse_optional_instant("to", query.to.as_deref(), Bound::End)? {
        Some(to) => to,
        None => Timestamp(state.now().0.saturating_add(1)),
    };
    if from > to {
        return Err(ApiError::BadRequest("from must not be after to".to_string()));
    }
    let summary = state
        .run(move |store| store.sales_summary(from, to))
        .await?;
    Ok(Json(summary))
}
