//! # Snapshot
//!
//! Whole-database export and import for backups and migrations.
//!
//! A snapshot is plain serde data; the app layer decides the file format.
//! Import preserves ids and id counters so references stay valid, and only
//! runs against an empty database. A snapshot is checked as a whole before
//! anything is written: ids and unique keys must not repeat and every
//! reference must point at a row in the same snapshot.

use crate::catalog::{Location, Product, Supplier};
use crate::closing::CashClosing;
use crate::inventory::InventoryItem;
use crate::pos::Sale;
use crate::promotion::Promotion;
use crate::restock::RestockRequest;
use crate::storage::{
    Record, Store, TxRead, read_counters, tx_is_empty, tx_save, tx_save_stock, tx_set_counter,
};
use crate::transfer::Transfer;
use crate::users::User;
use crate::{Result, StoreError};
use redb::WriteTransaction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Every row in the database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub counters: BTreeMap<String, u64>,
    pub users: Vec<User>,
    pub suppliers: Vec<Supplier>,
    pub locations: Vec<Location>,
    pub products: Vec<Product>,
    pub inventory: Vec<InventoryItem>,
    pub promotions: Vec<Promotion>,
    pub sales: Vec<Sale>,
    pub restock_requests: Vec<RestockRequest>,
    pub transfers: Vec<Transfer>,
    pub cash_closings: Vec<CashClosing>,
}

impl Snapshot {
    /// Total number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.users.len()
            + self.suppliers.len()
            + self.locations.len()
            + self.products.len()
            + self.inventory.len()
            + self.promotions.len()
            + self.sales.len()
            + self.restock_requests.len()
            + self.transfers.len()
            + self.cash_closings.len()
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Ids of one kind; rejects id 0 and repeats.
fn id_set<R: Record>(rows: &[R]) -> Result<BTreeSet<u64>> {
    let mut ids = BTreeSet::new();
    for row in rows {
        if row.id() == 0 {
            return Err(StoreError::validation(format!(
                "{} row with id 0 in snapshot",
                R::KIND
            )));
        }
        if !ids.insert(row.id()) {
            return Err(StoreError::validation(format!(
                "duplicate {} id {} in snapshot",
                R::KIND,
                row.id()
            )));
        }
    }
    Ok(ids)
}

fn unique_keys<'a>(field: &str, keys: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(StoreError::validation(format!(
                "duplicate {field} '{key}' in snapshot"
            )));
        }
    }
    Ok(())
}

fn refers(ids: &BTreeSet<u64>, kind: &str, id: u64, from: &str) -> Result<()> {
    if ids.contains(&id) {
        Ok(())
    } else {
        Err(StoreError::validation(format!(
            "{from} refers to missing {kind} {id}"
        )))
    }
}

fn validate(snapshot: &Snapshot) -> Result<()> {
    let users = id_set(&snapshot.users)?;
    let suppliers = id_set(&snapshot.suppliers)?;
    let locations = id_set(&snapshot.locations)?;
    let products = id_set(&snapshot.products)?;
    id_set(&snapshot.promotions)?;
    id_set(&snapshot.sales)?;
    id_set(&snapshot.restock_requests)?;
    id_set(&snapshot.transfers)?;
    id_set(&snapshot.cash_closings)?;

    unique_keys("username", snapshot.users.iter().map(|u| u.username.as_str()))?;
    unique_keys("sku", snapshot.products.iter().map(|p| p.sku.as_str()))?;

    for product in &snapshot.products {
        if let Some(supplier) = product.supplier_id {
            refers(&suppliers, "supplier", supplier, "product")?;
        }
    }
    let mut stock_keys = BTreeSet::new();
    for item in &snapshot.inventory {
        refers(&locations, "location", item.location_id, "inventory")?;
        refers(&products, "product", item.product_id, "inventory")?;
        if !stock_keys.insert((item.location_id, item.product_id)) {
            return Err(StoreError::validation(format!(
                "duplicate inventory row for location {} product {}",
                item.location_id, item.product_id
            )));
        }
    }
    for promo in &snapshot.promotions {
        if !(1..=100).contains(&promo.discount_percent) || promo.starts_at >= promo.ends_at {
            return Err(StoreError::validation(format!(
                "promotion {} is malformed",
                promo.id
            )));
        }
        if let Some(product) = promo.product_id {
            refers(&products, "product", product, "promotion")?;
        }
    }
    for sale in &snapshot.sales {
        refers(&users, "user", sale.cashier_id, "sale")?;
        refers(&locations, "location", sale.location_id, "sale")?;
        for line in &sale.lines {
            refers(&products, "product", line.product_id, "sale")?;
        }
    }
    for request in &snapshot.restock_requests {
        refers(&locations, "location", request.location_id, "restock request")?;
        refers(&products, "product", request.product_id, "restock request")?;
        refers(&users, "user", request.requested_by, "restock request")?;
        if let Some(supplier) = request.supplier_id {
            refers(&suppliers, "supplier", supplier, "restock request")?;
        }
    }
    for transfer in &snapshot.transfers {
        refers(&products, "product", transfer.product_id, "transfer")?;
        refers(&locations, "location", transfer.from_location, "transfer")?;
        refers(&locations, "location", transfer.to_location, "transfer")?;
        refers(&users, "user", transfer.requested_by, "transfer")?;
    }
    for closing in &snapshot.cash_closings {
        refers(&users, "user", closing.cashier_id, "cash closing")?;
        refers(&locations, "location", closing.location_id, "cash closing")?;
    }
    Ok(())
}

fn save_all<R: Record>(txn: &WriteTransaction, rows: &[R]) -> Result<()> {
    for row in rows {
        tx_save(txn, row)?;
    }
    Ok(())
}

/// Largest id per kind, so counters never fall behind imported rows.
fn max_ids(snapshot: &Snapshot) -> [(&'static str, u64); 9] {
    fn max<R: Record>(rows: &[R]) -> (&'static str, u64) {
        (R::KIND, rows.iter().map(R::id).max().unwrap_or(0))
    }
    [
        max(&snapshot.users),
        max(&snapshot.suppliers),
        max(&snapshot.locations),
        max(&snapshot.products),
        max(&snapshot.promotions),
        max(&snapshot.sales),
        max(&snapshot.restock_requests),
        max(&snapshot.transfers),
        max(&snapshot.cash_closings),
    ]
}

impl Store {
    /// Read every table in one consistent read transaction.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        let txn = self.begin_read()?;
        Ok(Snapshot {
            version: SNAPSHOT_VERSION,
            counters: read_counters(&txn)?,
            users: txn.rows()?,
            suppliers: txn.rows()?,
            locations: txn.rows()?,
            products: txn.rows()?,
            inventory: txn.stock_rows(None)?,
            promotions: txn.rows()?,
            sales: txn.rows()?,
            restock_requests: txn.rows()?,
            transfers: txn.rows()?,
            cash_closings: txn.rows()?,
        })
    }

    /// Load a snapshot into this (empty) database.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::validation(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }
        validate(snapshot)?;

        let txn = self.begin_write()?;
        if !tx_is_empty(&txn)? {
            return Err(StoreError::NotEmpty);
        }
        save_all(&txn, &snapshot.users)?;
        save_all(&txn, &snapshot.suppliers)?;
        save_all(&txn, &snapshot.locations)?;
        save_all(&txn, &snapshot.products)?;
        save_all(&txn, &snapshot.promotions)?;
        save_all(&txn, &snapshot.sales)?;
        save_all(&txn, &snapshot.restock_requests)?;
        save_all(&txn, &snapshot.transfers)?;
        save_all(&txn, &snapshot.cash_closings)?;
        for item in &snapshot.inventory {
            tx_save_stock(&txn, item)?;
        }

        for (kind, value) in &snapshot.counters {
            tx_set_counter(&txn, kind, *value)?;
        }
        for (kind, max_id) in max_ids(snapshot) {
            let recorded = snapshot.counters.get(kind).copied().unwrap_or(0);
            if max_id > recorded {
                tx_set_counter(&txn, kind, max_id)?;
            }
        }

        txn.commit()?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
