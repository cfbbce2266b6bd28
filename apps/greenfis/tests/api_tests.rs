//! Integration tests for the GreenFis HTTP API.
//!
//! Uses axum-test against the real router and a tempfile database.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use greenfis::api::{AppState, Clock, build_router};
use greenfis_core::{Store, Timestamp};
use serde_json::{Value, json};
use std::num::NonZeroU32;
use tempfile::TempDir;

/// 2024-01-01T12:00:00Z
const NOW: i64 = 1_704_110_400;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn create_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Store::create(dir.path().join("api.redb")).unwrap();
    let state = AppState::new(store).with_clock(Clock::fixed(Timestamp(NOW)));
    (dir, state)
}

fn create_server() -> (TempDir, TestServer) {
    let (dir, state) = create_state();
    (dir, TestServer::new(build_router(state)).unwrap())
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap()
}

/// Ids created by [`seed_shop`].
struct Shop {
    cashier: u64,
    stocker: u64,
    store: u64,
    warehouse: u64,
    mint: u64,
}

/// A cashier, a store with 10 mint teas, and an empty warehouse.
async fn seed_shop(server: &TestServer) -> Shop {
    let cashier: Value = server
        .post("/api/users")
        .json(&json!({
            "username": "ana",
            "full_name": "Ana Torres",
            "role": "cashier",
            "password": "correct horse",
        }))
        .await
        .json();
    let stocker: Value = server
        .post("/api/users")
        .json(&json!({
            "username": "luis",
            "full_name": "Luis Rey",
            "role": "stocker",
            "password": "battery staple",
        }))
        .await
        .json();
    let store: Value = server
        .post("/api/locations")
        .json(&json!({"name": "Centro", "kind": "store"}))
        .await
        .json();
    let warehouse: Value = server
        .post("/api/locations")
        .json(&json!({"name": "Bodega", "kind": "warehouse"}))
        .await
        .json();
    let mint: Value = server
        .post("/api/products")
        .json(&json!({"sku": "tea-mint", "name": "Mint tea", "unit_price": 199}))
        .await
        .json();

    let shop = Shop {
        cashier: cashier["id"].as_u64().unwrap(),
        stocker: stocker["id"].as_u64().unwrap(),
        store: store["id"].as_u64().unwrap(),
        warehouse: warehouse["id"].as_u64().unwrap(),
        mint: mint["id"].as_u64().unwrap(),
    };
    server
        .put(&format!("/api/inventory/{}/{}", shop.store, shop.mint))
        .json(&json!({"quantity": 10, "reorder_level": 3}))
        .await
        .assert_status_ok();
    shop
}

async fn stock_of(server: &TestServer, location: u64, product: u64) -> u64 {
    let item: Value = server
        .get(&format!("/api/inventory/{location}/{product}"))
        .await
        .json();
    item["quantity"].as_u64().unwrap()
}

// =============================================================================
// SYSTEM AND AUTH TESTS
// =============================================================================

#[tokio::test]
async fn test_health_is_open() {
    let (_dir, state) = create_state();
    let server = TestServer::new(build_router(
        state.with_api_key(Some("secret".to_string())),
    ))
    .unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_api_requires_bearer_key() {
    let (_dir, state) = create_state();
    let server = TestServer::new(build_router(
        state.with_api_key(Some("secret".to_string())),
    ))
    .unwrap();

    let missing = server.get("/api/status").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&missing.json()), "unauthorized");

    let wrong = server
        .get("/api/status")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer nope"))
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let ok = server
        .get("/api/status")
        .add_header(AUTHORIZATION, HeaderValue::from_static("Bearer secret"))
        .await;
    ok.assert_status_ok();
    let body: Value = ok.json();
    assert_eq!(body["service"], "greenfis");
    assert_eq!(body["tables"]["products"], 0);
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let (_dir, state) = create_state();
    let server = TestServer::new(build_router(state.with_rate_limit(NonZeroU32::new(1)))).unwrap();

    server.get("/health").await.assert_status_ok();
    let limited = server.get("/health").await;
    assert_eq!(limited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&limited.json()), "rate_limited");
}

// =============================================================================
// USERS
// =============================================================================

#[tokio::test]
async fn test_user_responses_never_contain_password_hash() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    let user: Value = server
        .get(&format!("/api/users/{}", shop.cashier))
        .await
        .json();
    assert_eq!(user["username"], "ana");
    assert!(user.get("password_hash").is_none());

    let list: Value = server.get("/api/users").await.json();
    assert_eq!(list.as_array().unwrap().len(), 2);
    assert!(list[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login() {
    let (_dir, server) = create_server();
    seed_shop(&server).await;

    let ok = server
        .post("/api/auth/login")
        .json(&json!({"username": "ANA", "password": "correct horse"}))
        .await;
    ok.assert_status_ok();
    assert_eq!(ok.json::<Value>()["role"], "cashier");

    let bad = server
        .post("/api/auth/login")
        .json(&json!({"username": "ana", "password": "wrong"}))
        .await;
    assert_eq!(bad.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&bad.json()), "invalid_credentials");

    let huge = "x".repeat(64 * 1024);
    for username in ["ana", "nobody"] {
        let response = server
            .post("/api/auth/login")
            .json(&json!({"username": username, "password": huge}))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&response.json()), "invalid_credentials");
    }
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let (_dir, server) = create_server();
    seed_shop(&server).await;

    let response = server
        .post("/api/users")
        .json(&json!({
            "username": "Ana",
            "full_name": "Another Ana",
            "role": "manager",
            "password": "something long",
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_code(&response.json()), "conflict");
}

// =============================================================================
// CATALOG
// =============================================================================

#[tokio::test]
async fn test_unknown_product_is_404() {
    let (_dir, server) = create_server();
    let response = server.get("/api/products/99").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(error_code(&response.json()), "not_found");
}

#[tokio::test]
async fn test_malformed_body_is_400_envelope() {
    let (_dir, server) = create_server();
    let response = server
        .post("/api/products")
        .json(&json!({"sku": "X"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&response.json()), "bad_request");
}

#[tokio::test]
async fn test_malformed_path_is_400_envelope() {
    let (_dir, server) = create_server();
    for path in ["/api/products/abc", "/api/inventory/1/x", "/api/sales/-3"] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(error_code(&response.json()), "bad_request", "{path}");
    }
}

#[tokio::test]
async fn test_product_lookup_by_sku_and_delete() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    let found: Value = server.get("/api/products?sku=TEA-MINT").await.json();
    assert_eq!(found[0]["id"].as_u64(), Some(shop.mint));

    let supplier: Value = server
        .post("/api/suppliers")
        .json(&json!({"name": "Herbs & Co", "email": "sales@herbs.test"}))
        .await
        .json();
    assert_eq!(supplier["active"], true);

    server
        .delete(&format!("/api/products/{}", shop.mint))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    let gone = server.get(&format!("/api/products/{}", shop.mint)).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
}

// =============================================================================
// INVENTORY
// =============================================================================

#[tokio::test]
async fn test_adjust_and_low_stock() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    let adjusted: Value = server
        .post(&format!("/api/inventory/{}/{}/adjust", shop.store, shop.mint))
        .json(&json!({"delta": -7}))
        .await
        .json();
    assert_eq!(adjusted["quantity"], 3);

    let low: Value = server
        .get(&format!("/api/inventory/low-stock?location_id={}", shop.store))
        .await
        .json();
    assert_eq!(low.as_array().unwrap().len(), 1);

    let too_much = server
        .post(&format!("/api/inventory/{}/{}/adjust", shop.store, shop.mint))
        .json(&json!({"delta": -4}))
        .await;
    assert_eq!(too_much.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_code(&too_much.json()), "insufficient_stock");
}

// =============================================================================
// POINT OF SALE
// =============================================================================

#[tokio::test]
async fn test_checkout_applies_promotion_and_takes_stock() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    server
        .post("/api/promotions")
        .json(&json!({
            "name": "Tea week",
            "product_id": shop.mint,
            "discount_percent": 10,
            "starts_at": NOW - 60,
            "ends_at": NOW + 60,
        }))
        .await
        .assert_status(StatusCode::CREATED);
    let active: Value = server
        .get(&format!("/api/promotions/active?product_id={}", shop.mint))
        .await
        .json();
    assert_eq!(active.as_array().unwrap().len(), 1);

    let cart = json!({
        "cashier_id": shop.cashier,
        "location_id": shop.store,
        "payment": "cash",
        "lines": [{"product_id": shop.mint, "quantity": 3}],
        "amount_tendered": 1000,
    });

    let quote: Value = server.post("/api/sales/quote").json(&cart).await.json();
    // 3 x 199 = 597, 10% off rounded down = 59
    assert_eq!(quote["subtotal"], 597);
    assert_eq!(quote["discount_total"], 59);
    assert_eq!(quote["total"], 538);
    assert_eq!(stock_of(&server, shop.store, shop.mint).await, 10);

    let response = server.post("/api/sales").json(&cart).await;
    response.assert_status(StatusCode::CREATED);
    let sale: Value = response.json();
    assert_eq!(sale["total"], 538);
    assert_eq!(sale["change_due"], 462);
    assert_eq!(sale["created_at"], NOW);
    assert_eq!(stock_of(&server, shop.store, shop.mint).await, 7);

    let fetched: Value = server
        .get(&format!("/api/sales/{}", sale["id"]))
        .await
        .json();
    assert_eq!(fetched, sale);
}

#[tokio::test]
async fn test_checkout_without_stock_records_nothing() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    let response = server
        .post("/api/sales")
        .json(&json!({
            "cashier_id": shop.cashier,
            "location_id": shop.store,
            "payment": "card",
            "lines": [{"product_id": shop.mint, "quantity": 11}],
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_code(&response.json()), "insufficient_stock");

    let sales: Value = server.get("/api/sales").await.json();
    assert!(sales.as_array().unwrap().is_empty());
    assert_eq!(stock_of(&server, shop.store, shop.mint).await, 10);
}

#[tokio::test]
async fn test_stocker_cannot_sell() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    let response = server
        .post("/api/sales")
        .json(&json!({
            "cashier_id": shop.stocker,
            "location_id": shop.store,
            "payment": "card",
            "lines": [{"product_id": shop.mint, "quantity": 1}],
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// RESTOCK, TRANSFERS, CLOSINGS, REPORTS
// =============================================================================

#[tokio::test]
async fn test_restock_lifecycle() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    let request: Value = server
        .post("/api/restock-requests")
        .json(&json!({
            "location_id": shop.store,
            "product_id": shop.mint,
            "quantity": 20,
            "requested_by": shop.stocker,
        }))
        .await
        .json();
    assert_eq!(request["status"], "pending");
    let id = request["id"].as_u64().unwrap();

    let approved: Value = server
        .post(&format!("/api/restock-requests/{id}/approve"))
        .await
        .json();
    assert_eq!(approved["status"], "approved");

    let received: Value = server
        .post(&format!("/api/restock-requests/{id}/receive"))
        .await
        .json();
    assert_eq!(received["status"], "received");
    assert_eq!(stock_of(&server, shop.store, shop.mint).await, 30);

    let again = server
        .post(&format!("/api/restock-requests/{id}/reject"))
        .await;
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
    assert_eq!(error_code(&again.json()), "invalid_state");

    let pending: Value = server
        .get("/api/restock-requests?status=pending")
        .await
        .json();
    assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_moves_stock_on_completion() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    let transfer: Value = server
        .post("/api/transfers")
        .json(&json!({
            "product_id": shop.mint,
            "from_location": shop.store,
            "to_location": shop.warehouse,
            "quantity": 4,
            "requested_by": shop.stocker,
        }))
        .await
        .json();
    let id = transfer["id"].as_u64().unwrap();
    assert_eq!(stock_of(&server, shop.store, shop.mint).await, 10);

    let done: Value = server
        .post(&format!("/api/transfers/{id}/complete"))
        .await
        .json();
    assert_eq!(done["status"], "completed");
    assert_eq!(stock_of(&server, shop.store, shop.mint).await, 6);
    assert_eq!(stock_of(&server, shop.warehouse, shop.mint).await, 4);

    let cancel = server.post(&format!("/api/transfers/{id}/cancel")).await;
    assert_eq!(cancel.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cash_closing_and_sales_summary() {
    let (_dir, server) = create_server();
    let shop = seed_shop(&server).await;

    server
        .post("/api/sales")
        .json(&json!({
            "cashier_id": shop.cashier,
            "location_id": shop.store,
            "payment": "cash",
            "lines": [{"product_id": shop.mint, "quantity": 2}],
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let closing: Value = server
        .post("/api/cash-closings")
        .json(&json!({
            "cashier_id": shop.cashier,
            "location_id": shop.store,
            "opening_float": 5000,
            "counted_cash": 5398,
        }))
        .await
        .json();
    assert_eq!(closing["cash_sales"], 398);
    assert_eq!(closing["difference"], 0);

    let listed: Value = server
        .get(&format!("/api/cash-closings?cashier_id={}", shop.cashier))
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let summary: Value = server
        .get("/api/reports/sales-summary?from=2024-01-01&to=2024-01-01")
        .await
        .json();
    assert_eq!(summary["sales_count"], 1);
    assert_eq!(summary["net"], 398);
    assert_eq!(summary["top_products"][0]["product_id"].as_u64(), Some(shop.mint));

    let earlier: Value = server
        .get("/api/reports/sales-summary?from=2023-12-01&to=2023-12-31")
        .await
        .json();
    assert_eq!(earlier["sales_count"], 0);

    let bad = server
        .get("/api/reports/sales-summary?from=tomorrow")
        .await;
    assert_eq!(bad.status_code(), StatusCode::BAD_REQUEST);
}
