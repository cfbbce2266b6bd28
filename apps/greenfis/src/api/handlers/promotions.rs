//! Percentage promotions.

use crate::api::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use greenfis_core::{NewPromotion, Promotion};
use serde::Deserialize;
use tracing::info;

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Promotion>>> {
    Ok(Json(state.run(|store| store.list::<Promotion>()).await?))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Promotion>> {
    Ok(Json(
        state.run(move |store| store.fetch::<Promotion>(id)).await?,
    ))
}

pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewPromotion>,
) -> ApiResult<(StatusCode, Json<Promotion>)> {
    let promotion = state.run(move |store| store.create_promotion(input)).await?;
    info!(
        promotion_id = promotion.id,
        percent = promotion.discount_percent,
        "promotion created"
    );
    Ok((StatusCode::CREATED, Json(promotion)))
}

pub async fn update(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(input): ApiJson<NewPromotion>,
) -> ApiResult<Json<Promotion>> {
    Ok(Json(
        state
            .run(move |store| store.update_promotion(id, input))
            .await?,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<StatusCode> {
    state.run(move |store| store.delete_promotion(id)).await?;
    info!(promotion_id = id, "promotion deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct ActiveQuery {
    pub product_id: Option<u64>,
}

/// Promotions running now.
pub async fn active(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ActiveQuery>,
) -> ApiResult<Json<Vec<Promotion>>> {
    let now = state.now();
    let promotions = state
        .run(move |store| store.active_promotions(query.product_id, now))
        .await?;
    Ok(Json(promotions))
}
