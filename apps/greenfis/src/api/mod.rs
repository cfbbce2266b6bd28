//! # HTTP API
//!
//! The axum router behind the store front end.
//!
//! - `GET /health` is open.
//! - Everything under `/api` requires `Authorization: Bearer <key>` when a key
//!   is configured.
//! - A global token bucket (governor) caps requests per second.
//!
//! Handlers never touch redb directly: each one hands a closure to
//! [`AppState::run`], which executes it on the blocking pool.

mod error;
mod extract;
mod handlers;

pub use error::{ApiError, ApiResult};
pub use extract::{ApiJson, ApiPath, ApiQuery};

use crate::config::ServerConfig;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use greenfis_core::{Store, Timestamp};
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

// =============================================================================
// STATE
// =============================================================================

/// Source of "now" for every recorded operation.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> Timestamp + Send + Sync>);

impl Clock {
    /// Wall-clock UTC seconds.
    #[must_use]
    pub fn system() -> Self {
        Self(Arc::new(|| Timestamp(chrono::Utc::now().timestamp())))
    }

    /// Always returns `at`.
    #[must_use]
    pub fn fixed(at: Timestamp) -> Self {
        Self(Arc::new(move || at))
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        (self.0)()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Clock").field(&self.now()).finish()
    }
}

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    api_key: Option<Arc<str>>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    cors_origins: Arc<[String]>,
    clock: Clock,
}

impl AppState {
    /// Open state with no API key and no rate limit.
    #[must_use]
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
            api_key: None,
            limiter: None,
            cors_origins: Arc::from(Vec::<String>::new()),
            clock: Clock::system(),
        }
    }

    /// State configured for `greenfis serve`.
    #[must_use]
    pub fn from_config(store: Store, config: &ServerConfig) -> Self {
        Self::new(store)
            .with_api_key(config.api_key.clone())
            .with_rate_limit(config.rate_limit)
            .with_cors_origins(config.cors_origins.clone())
    }

    #[must_use]
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.map(Arc::from);
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, per_second: Option<NonZeroU32>) -> Self {
        self.limiter = per_second.map(|n| Arc::new(RateLimiter::direct(Quota::per_second(n))));
        self
    }

    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::from(origins);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Run a store operation on the blocking pool.
    pub async fn run<T, F>(&self, op: F) -> ApiResult<T>
    where
        F: FnOnce(&Store) -> greenfis_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?
            .map_err(ApiError::from)
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/status", get(handlers::status))
        .route("/api/auth/login", post(handlers::users::login))
        // Users
        .route(
            "/api/users",
            get(handlers::users::list).post(handlers::users::create),
        )
        .route(
            "/api/users/{id}",
            get(handlers::users::show)
                .put(handlers::users::update)
                .delete(handlers::users::remove),
        )
        // Catalog
        .route(
            "/api/suppliers",
            get(handlers::catalog::list_suppliers).post(handlers::catalog::create_supplier),
        )
        .route(
            "/api/suppliers/{id}",
            get(handlers::catalog::show_supplier)
                .put(handlers::catalog::update_supplier)
                .delete(handlers::catalog::delete_supplier),
        )
        .route(
            "/api/locations",
            get(handlers::catalog::list_locations).post(handlers::catalog::create_location),
        )
        .route(
            "/api/locations/{id}",
            get(handlers::catalog::show_location)
                .put(handlers::catalog::update_location)
                .delete(handlers::catalog::delete_location),
        )
        .route(
            "/api/products",
            get(handlers::catalog::list_products).post(handlers::catalog::create_product),
        )
        .route(
            "/api/products/{id}",
            get(handlers::catalog::show_product)
                .put(handlers::catalog::update_product)
                .delete(handlers::catalog::delete_product),
        )
        // Inventory
        .route("/api/inventory", get(handlers::inventory::list))
        .route("/api/inventory/low-stock", get(handlers::inventory::low_stock))
        .route(
            "/api/inventory/{location_id}/{product_id}",
            get(handlers::inventory::show).put(handlers::inventory::set_level),
        )
        .route(
            "/api/inventory/{location_id}/{product_id}/adjust",
            post(handlers::inventory::adjust),
        )
        // Promotions
        .route(
            "/api/promotions",
            get(handlers::promotions::list).post(handlers::promotions::create),
        )
        .route("/api/promotions/active", get(handlers::promotions::active))
        .route(
            "/api/promotions/{id}",
            get(handlers::promotions::show)
                .put(handlers::promotions::update)
                .delete(handlers::promotions::remove),
        )
        // Point of sale
        .route(
            "/api/sales",
            get(handlers::sales::list).post(handlers::sales::checkout),
        )
        .route("/api/sales/quote", post(handlers::sales::quote))
        .route("/api/sales/{id}", get(handlers::sales::show))
        // Restocking
        .route(
            "/api/restock-requests",
            get(handlers::restock::list).post(handlers::restock::create),
        )
        .route("/api/restock-requests/{id}", get(handlers::restock::show))
        .route(
            "/api/restock-requests/{id}/approve",
            post(handlers::restock::approve),
        )
        .route(
            "/api/restock-requests/{id}/reject",
            post(handlers::restock::reject),
        )
        .route(
            "/api/restock-requests/{id}/receive",
            post(handlers::restock::receive),
        )
        // Transfers
        .route(
            "/api/transfers",
            get(handlers::transfers::list).post(handlers::transfers::create),
        )
        .route("/api/transfers/{id}", get(handlers::transfers::show))
        .route(
            "/api/transfers/{id}/complete",
            post(handlers::transfers::complete),
        )
        .route("/api/transfers/{id}/cancel", post(handlers::transfers::cancel))
        // Closings and reports
        .route(
            "/api/cash-closings",
            get(handlers::closings::list).post(handlers::closings::create),
        )
        .route("/api/cash-closings/{id}", get(handlers::closings::show))
        .route(
            "/api/reports/sales-summary",
            get(handlers::reports::sales_summary),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    let cors = cors_layer(&state.cors_origins);
    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if allowed.is_empty() {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Reject `/api` requests without the configured bearer key.
async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Some(expected) = state.api_key.as_deref() {
        let provided = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .unwrap_or_default();
        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            tracing::warn!(path = %request.uri().path(), "rejected request without valid API key");
            return Err(ApiError::Unauthorized);
        }
    }
    Ok(next.run(request).await)
}

/// Global token bucket.
async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if let Some(limiter) = &state.limiter
        && limiter.check().is_err()
    {
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(request).await)
}
