//! # Inventory
//!
//! Stock levels per (location, product). Quantities are unsigned; any
//! operation that would take a level below zero fails with
//! [`StoreError::InsufficientStock`] and writes nothing.

use crate::catalog::{Location, Product};
use crate::storage::{Store, TxRead, tx_save_stock};
use crate::{Result, StoreError};
use redb::WriteTransaction;
use serde::{Deserialize, Serialize};

/// Stock of one product at one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub location_id: u64,
    pub product_id: u64,
    pub quantity: u32,
    /// At or below this level the item shows up as low stock. 0 disables it.
    pub reorder_level: u32,
}

impl InventoryItem {
    /// An empty stock row.
    #[must_use]
    pub fn empty(location_id: u64, product_id: u64) -> Self {
        Self {
            location_id,
            product_id,
            quantity: 0,
            reorder_level: 0,
        }
    }

    /// Whether the item has fallen to its reorder level.
    #[must_use]
    pub fn is_low(&self) -> bool {
        self.reorder_level > 0 && self.quantity <= self.reorder_level
    }
}

/// Body for an absolute stock set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockLevel {
    pub quantity: u32,
    #[serde(default)]
    pub reorder_level: Option<u32>,
}

/// Body for a relative stock adjustment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

// =============================================================================
// TRANSACTION-LEVEL HELPERS
// =============================================================================

/// Apply a signed change to a stock row inside an open write transaction.
pub(crate) fn tx_adjust(
    txn: &WriteTransaction,
    location_id: u64,
    product_id: u64,
    delta: i64,
) -> Result<InventoryItem> {
    let mut item = txn
        .stock(location_id, product_id)?
        .unwrap_or_else(|| InventoryItem::empty(location_id, product_id));

    let next = i64::from(item.quantity).saturating_add(delta);
    if next < 0 {
        return Err(StoreError::InsufficientStock {
            product_id,
            location_id,
            requested: delta.unsigned_abs(),
            available: u64::from(item.quantity),
        });
    }
    item.quantity = u32::try_from(next)
        .map_err(|_| StoreError::validation("stock level exceeds the supported maximum"))?;

    tx_save_stock(txn, &item)?;
    Ok(item)
}

/// Check that a location and product both exist.
pub(crate) fn require_pair(txn: &impl TxRead, location_id: u64, product_id: u64) -> Result<()> {
    let _: Location = txn.require(location_id)?;
    let _: Product = txn.require(product_id)?;
    Ok(())
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Store {
    /// Stock of a product at a location; an empty item if never stocked.
    pub fn stock_level(&self, location_id: u64, product_id: u64) -> Result<InventoryItem> {
        let txn = self.begin_read()?;
        require_pair(&txn, location_id, product_id)?;
        Ok(txn
            .stock(location_id, product_id)?
            .unwrap_or_else(|| InventoryItem::empty(location_id, product_id)))
    }

    /// Stock rows, optionally for one location, ordered by (location, product).
    pub fn list_inventory(&self, location_id: Option<u64>) -> Result<Vec<InventoryItem>> {
        self.begin_read()?.stock_rows(location_id)
    }

    /// Set the absolute quantity and reorder level.
    pub fn set_stock(
        &self,
        location_id: u64,
        product_id: u64,
        quantity: u32,
        reorder_level: u32,
    ) -> Result<InventoryItem> {
        let txn = self.begin_write()?;
        require_pair(&txn, location_id, product_id)?;
        let item = InventoryItem {
            location_id,
            product_id,
            quantity,
            reorder_level,
        };
        tx_save_stock(&txn, &item)?;
        txn.commit()?;
        Ok(item)
    }

    /// Set the quantity; the reorder level is kept unless given.
    pub fn apply_stock_level(
        &self,
        location_id: u64,
        product_id: u64,
        level: StockLevel,
    ) -> Result<InventoryItem> {
        let txn = self.begin_write()?;
        require_pair(&txn, location_id, product_id)?;
        let reorder_level = match level.reorder_level {
            Some(r) => r,
            None => txn
                .stock(location_id, product_id)?
                .map(|item| item.reorder_level)
                .unwrap_or(0),
        };
        let item = InventoryItem {
            location_id,
            product_id,
            quantity: level.quantity,
            reorder_level,
        };
        tx_save_stock(&txn, &item)?;
        txn.commit()?;
        Ok(item)
    }

    /// Add (positive) or remove (negative) stock.
    pub fn adjust_stock(
        &self,
        location_id: u64,
        product_id: u64,
        delta: i64,
    ) -> Result<InventoryItem> {
        let txn = self.begin_write()?;
        require_pair(&txn, location_id, product_id)?;
        let item = tx_adjust(&txn, location_id, product_id, delta)?;
        txn.commit()?;
        Ok(item)
    }

    /// Items at or below their reorder level.
    pub fn low_stock(&self, location_id: Option<u64>) -> Result<Vec<InventoryItem>> {
        Ok(self
            .list_inventory(location_id)?
            .into_iter()
            .filter(InventoryItem::is_low)
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
