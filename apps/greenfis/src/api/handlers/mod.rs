//! Route handlers, grouped by resource.

pub mod catalog;
pub mod closings;
pub mod inventory;
pub mod promotions;
pub mod reports;
pub mod restock;
pub mod sales;
pub mod transfers;
pub mod users;

use super::{ApiError, ApiResult, AppState};
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Days, NaiveDate};
use greenfis_core::Timestamp;
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// SYSTEM
// =============================================================================

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub service: &'static str,
    pub version: &'static str,
    pub time: Timestamp,
    /// Row count per table.
    pub tables: BTreeMap<String, u64>,
}

pub async fn status(State(state): State<AppState>) -> ApiResult<Json<Status>> {
    let tables = state.run(|store| store.counts()).await?;
    Ok(Json(Status {
        service: "greenfis",
        version: env!("CARGO_PKG_VERSION"),
        time: state.now(),
        tables,
    }))
}

// =============================================================================
// QUERY HELPERS
// =============================================================================

/// Which end of a range a date-only value stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Midnight UTC at the start of the day.
    Start,
    /// Midnight UTC at the start of the next day.
    End,
}

/// Parse a query instant: Unix seconds, RFC 3339, or `YYYY-MM-DD`.
pub fn parse_instant(field: &str, raw: &str, bound: Bound) -> ApiResult<Timestamp> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<i64>() {
        return Ok(Timestamp(secs));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Timestamp(dt.timestamp()));
    }
    let invalid = || ApiError::BadRequest(format!("invalid {field}: {raw:?}"));
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| invalid())?;
    let day = match bound {
        Bound::Start => date,
        Bound::End => date.checked_add_days(Days::new(1)).ok_or_else(invalid)?,
    };
    let midnight = day.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
    Ok(Timestamp(midnight.and_utc().timestamp()))
}

/// Optional variant of [`parse_instant`].
pub fn parse_optional_instant(
    field: &str,
    raw: Option<&str>,
    bound: Bound,
) -> ApiResult<Option<Timestamp>> {
    raw.map(|r| parse_instant(field, r, bound)).transpose()
}
