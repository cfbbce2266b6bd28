//! Suppliers, locations and products.

use crate::api::{ApiJson, ApiPath, ApiQuery, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use greenfis_core::{Location, NewLocation, NewProduct, NewSupplier, Product, Supplier};
use serde::Deserialize;
use tracing::info;

// =============================================================================
// SUPPLIERS
// =============================================================================

pub async fn list_suppliers(State(state): State<AppState>) -> ApiResult<Json<Vec<Supplier>>> {
    Ok(Json(state.run(|store| store.list::<Supplier>()).await?))
}

pub async fn show_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(state.run(move |store| store.fetch::<Supplier>(id)).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let supplier = state.run(move |store| store.create_supplier(input)).await?;
    info!(supplier_id = supplier.id, "supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(input): ApiJson<NewSupplier>,
) -> ApiResult<Json<Supplier>> {
    Ok(Json(
        state
            .run(move |store| store.update_supplier(id, input))
            .await?,
    ))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<StatusCode> {
    state.run(move |store| store.delete_supplier(id)).await?;
    info!(supplier_id = id, "supplier deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// LOCATIONS
// =============================================================================

pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<Vec<Location>>> {
    Ok(Json(state.run(|store| store.list::<Location>()).await?))
}

pub async fn show_location(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Location>> {
    Ok(Json(state.run(move |store| store.fetch::<Location>(id)).await?))
}

pub async fn create_location(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewLocation>,
) -> ApiResult<(StatusCode, Json<Location>)> {
    let location = state.run(move |store| store.create_location(input)).await?;
    info!(location_id = location.id, kind = ?location.kind, "location created");
    Ok((StatusCode::CREATED, Json(location)))
}

pub async fn update_location(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(input): ApiJson<NewLocation>,
) -> ApiResult<Json<Location>> {
    Ok(Json(
        state
            .run(move |store| store.update_location(id, input))
            .await?,
    ))
}

pub async fn delete_location(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<StatusCode> {
    state.run(move |store| store.delete_location(id)).await?;
    info!(location_id = id, "location deleted");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// PRODUCTS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    /// Exact SKU lookup (case-insensitive).
    pub sku: Option<String>,
}

pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Vec<Product>>> {
    let products = state
        .run(move |store| match query.sku {
            Some(sku) => Ok(store.find_product_by_sku(&sku)?.into_iter().collect()),
            None => store.list::<Product>(),
        })
        .await?;
    Ok(Json(products))
}

pub async fn show_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.run(move |store| store.fetch::<Product>(id)).await?))
}

pub async fn create_product(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.run(move |store| store.create_product(input)).await?;
    info!(product_id = product.id, sku = %product.sku, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
    ApiJson(input): ApiJson<NewProduct>,
) -> ApiResult<Json<Product>> {
    Ok(Json(
        state
            .run(move |store| store.update_product(id, input))
            .await?,
    ))
}

pub async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<u64>,
) -> ApiResult<StatusCode> {
    state.run(move |store| store.delete_product(id)).await?;
    info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
