//! # Storage Module
//!
//! Embedded storage for every GreenFis table using redb.
//!
//! Uses redb embedded database for:
//! - ACID transactions (a checkout is one write transaction)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Rows are encoded with postcard. Domain modules never touch redb tables
//! directly; they go through [`TxRead`] for reads and the `tx_*` helpers for
//! writes so that id allocation and encoding live in one place.

pub(crate) mod tables;

use crate::inventory::InventoryItem;
use crate::{Result, StoreError};
use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, ReadableTableMetadata,
    TableDefinition, TableHandle, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;
use tables::{COUNTERS, INVENTORY, ROW_TABLES};

// =============================================================================
// RECORD TRAIT
// =============================================================================

/// A row stored in its own table under a `u64` id.
pub trait Record: Serialize + DeserializeOwned {
    /// Human-readable kind, used in errors and as the id counter name.
    const KIND: &'static str;

    /// Backing table.
    #[doc(hidden)]
    const TABLE: TableDefinition<'static, u64, &'static [u8]>;

    /// The row id (0 before insertion).
    fn id(&self) -> u64;

    /// Assign the id allocated at insertion.
    fn set_id(&mut self, id: u64);
}

// =============================================================================
// STORE
// =============================================================================

/// Handle to the GreenFis database file.
///
/// Cheap to share behind an `Arc`; redb serialises writers internally.
pub struct Store {
    db: Database,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Create (or open) a database file and make sure every table exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::create(path)?;
        let store = Self { db };
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open an existing database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Database::open(path)?;
        let store = Self { db };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        for table in ROW_TABLES {
            txn.open_table(table)?;
        }
        txn.open_table(INVENTORY)?;
        txn.open_table(COUNTERS)?;
        txn.commit()?;
        Ok(())
    }

    pub(crate) fn begin_read(&self) -> Result<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    pub(crate) fn begin_write(&self) -> Result<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Get a row by id.
    pub fn get<R: Record>(&self, id: u64) -> Result<Option<R>> {
        self.begin_read()?.row(id)
    }

    /// Get a row by id, or `NotFound`.
    pub fn fetch<R: Record>(&self, id: u64) -> Result<R> {
        self.begin_read()?.require(id)
    }

    /// All rows of a table in ascending id order.
    pub fn list<R: Record>(&self) -> Result<Vec<R>> {
        self.begin_read()?.rows()
    }

    /// Row count per table, keyed by table name.
    pub fn counts(&self) -> Result<BTreeMap<String, u64>> {
        let txn = self.begin_read()?;
        let mut counts = BTreeMap::new();
        for def in ROW_TABLES {
            let table = txn.open_table(def)?;
            counts.insert(def.name().to_string(), table.len()?);
        }
        let inventory = txn.open_table(INVENTORY)?;
        counts.insert(INVENTORY.name().to_string(), inventory.len()?);
        Ok(counts)
    }

    /// Whether every table is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.counts()?.values().all(|&n| n == 0))
    }
}

// =============================================================================
// READ ACCESS (shared by read and write transactions)
// =============================================================================

fn decode<R: DeserializeOwned>(bytes: &[u8]) -> Result<R> {
    Ok(postcard::from_bytes(bytes)?)
}

fn row_from<R: Record>(
    table: &impl ReadableTable<u64, &'static [u8]>,
    id: u64,
) -> Result<Option<R>> {
    match table.get(id)? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

fn rows_from<R: Record>(table: &impl ReadableTable<u64, &'static [u8]>) -> Result<Vec<R>> {
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        rows.push(decode(value.value())?);
    }
    Ok(rows)
}

fn stock_from(
    table: &impl ReadableTable<(u64, u64), &'static [u8]>,
    location_id: u64,
    product_id: u64,
) -> Result<Option<InventoryItem>> {
    match table.get((location_id, product_id))? {
        Some(guard) => Ok(Some(decode(guard.value())?)),
        None => Ok(None),
    }
}

fn stock_rows_from(
    table: &impl ReadableTable<(u64, u64), &'static [u8]>,
    location_id: Option<u64>,
) -> Result<Vec<InventoryItem>> {
    let mut rows = Vec::new();
    let iter = match location_id {
        Some(loc) => table.range((loc, 0)..=(loc, u64::MAX))?,
        None => table.iter()?,
    };
    for entry in iter {
        let (_, value) = entry?;
        rows.push(decode(value.value())?);
    }
    Ok(rows)
}

/// Read operations available on both transaction kinds.
pub(crate) trait TxRead {
    fn row<R: Record>(&self, id: u64) -> Result<Option<R>>;

    fn rows<R: Record>(&self) -> Result<Vec<R>>;

    fn stock(&self, location_id: u64, product_id: u64) -> Result<Option<InventoryItem>>;

    fn stock_rows(&self, location_id: Option<u64>) -> Result<Vec<InventoryItem>>;

    /// Like [`TxRead::row`] but a missing row is `NotFound`.
    fn require<R: Record>(&self, id: u64) -> Result<R> {
        self.row(id)?
            .ok_or(StoreError::NotFound { kind: R::KIND, id })
    }

    /// Current quantity, zero when no stock row exists.
    fn quantity(&self, location_id: u64, product_id: u64) -> Result<u32> {
        Ok(self
            .stock(location_id, product_id)?
            .map(|item| item.quantity)
            .unwrap_or(0))
    }
}

impl TxRead for ReadTransaction {
    fn row<R: Record>(&self, id: u64) -> Result<Option<R>> {
        row_from(&self.open_table(R::TABLE)?, id)
    }

    fn rows<R: Record>(&self) -> Result<Vec<R>> {
        rows_from(&self.open_table(R::TABLE)?)
    }

    fn stock(&self, location_id: u64, product_id: u64) -> Result<Option<InventoryItem>> {
        stock_from(&self.open_table(INVENTORY)?, location_id, product_id)
    }

    fn stock_rows(&self, location_id: Option<u64>) -> Result<Vec<InventoryItem>> {
        stock_rows_from(&self.open_table(INVENTORY)?, location_id)
    }
}

impl TxRead for WriteTransaction {
    fn row<R: Record>(&self, id: u64) -> Result<Option<R>> {
        row_from(&self.open_table(R::TABLE)?, id)
    }

    fn rows<R: Record>(&self) -> Result<Vec<R>> {
        rows_from(&self.open_table(R::TABLE)?)
    }

    fn stock(&self, location_id: u64, product_id: u64) -> Result<Option<InventoryItem>> {
        stock_from(&self.open_table(INVENTORY)?, location_id, product_id)
    }

    fn stock_rows(&self, location_id: Option<u64>) -> Result<Vec<InventoryItem>> {
        stock_rows_from(&self.open_table(INVENTORY)?, location_id)
    }
}

// =============================================================================
// WRITE HELPERS
// =============================================================================

/// Allocate the next id for a kind. Ids start at 1 and are never reused.
pub(crate) fn tx_next_id(txn: &WriteTransaction, kind: &'static str) -> Result<u64> {
    let mut counters = txn.open_table(COUNTERS)?;
    let last = counters.get(kind)?.map(|g| g.value()).unwrap_or(0);
    let next = last.saturating_add(1);
    counters.insert(kind, next)?;
    Ok(next)
}

/// Insert a new row, assigning it a fresh id.
pub(crate) fn tx_insert<R: Record>(txn: &WriteTransaction, mut record: R) -> Result<R> {
    let id = tx_next_id(txn, R::KIND)?;
    record.set_id(id);
    tx_save(txn, &record)?;
    Ok(record)
}

/// Write a row under its current id (insert or overwrite).
pub(crate) fn tx_save<R: Record>(txn: &WriteTransaction, record: &R) -> Result<()> {
    let bytes = postcard::to_allocvec(record)?;
    let mut table = txn.open_table(R::TABLE)?;
    table.insert(record.id(), bytes.as_slice())?;
    Ok(())
}

/// Remove a row; `NotFound` if it was absent.
pub(crate) fn tx_remove<R: Record>(txn: &WriteTransaction, id: u64) -> Result<()> {
    let mut table = txn.open_table(R::TABLE)?;
    let removed = table.remove(id)?.is_some();
    if removed {
        Ok(())
    } else {
        Err(StoreError::NotFound { kind: R::KIND, id })
    }
}

/// Write a stock row.
pub(crate) fn tx_save_stock(txn: &WriteTransaction, item: &InventoryItem) -> Result<()> {
    let bytes = postcard::to_allocvec(item)?;
    let mut table = txn.open_table(INVENTORY)?;
    table.insert((item.location_id, item.product_id), bytes.as_slice())?;
    Ok(())
}

/// Remove a stock row if present.
pub(crate) fn tx_remove_stock(
    txn: &WriteTransaction,
    location_id: u64,
    product_id: u64,
) -> Result<()> {
    let mut table = txn.open_table(INVENTORY)?;
    table.remove((location_id, product_id))?;
    Ok(())
}

/// Whether every table is empty, as seen by this write transaction.
pub(crate) fn tx_is_empty(txn: &WriteTransaction) -> Result<bool> {
    for def in ROW_TABLES {
        if txn.open_table(def)?.len()? > 0 {
            return Ok(false);
        }
    }
    Ok(txn.open_table(INVENTORY)?.len()? == 0)
}

/// Overwrite the counter for a kind (snapshot import).
pub(crate) fn tx_set_counter(txn: &WriteTransaction, kind: &str, value: u64) -> Result<()> {
    let mut counters = txn.open_table(COUNTERS)?;
    counters.insert(kind, value)?;
    Ok(())
}

/// Every counter, keyed by kind.
pub(crate) fn read_counters(txn: &ReadTransaction) -> Result<BTreeMap<String, u64>> {
    let table = txn.open_table(COUNTERS)?;
    let mut counters = BTreeMap::new();
    for entry in table.iter()? {
        let (k, v) = entry?;
        counters.insert(k.value().to_string(), v.value());
    }
    Ok(counters)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{Location, LocationKind, NewLocation};
    use tempfile::TempDir;

    /// A store in a fresh temp dir; keep the dir alive for the test.
    pub(crate) fn temp_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Store::create(dir.path().join("greenfis.redb")).expect("create store");
        (dir, store)
    }

    #[test]
    fn create_makes_empty_store() {
        let (_dir, store) = temp_store();
        assert!(store.is_empty().expect("counts"));
        let counts = store.counts().expect("counts");
        assert_eq!(counts.get("products"), Some(&0));
        assert_eq!(counts.get("inventory"), Some(&0));
    }

    #[test]
    fn open_missing_file_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        assert!(Store::open(dir.path().join("missing.redb")).is_err());
    }

    #[test]
    fn ids_are_sequential_and_not_reused() {
        let (_dir, store) = temp_store();
        let a = store
            .create_location(NewLocation::new("Front", LocationKind::Store))
            .expect("a");
        let b = store
            .create_location(NewLocation::new("Back", LocationKind::Warehouse))
            .expect("b");
        assert_eq!((a.id, b.id), (1, 2));

        store.delete_location(b.id).expect("delete");
        let c = store
            .create_location(NewLocation::new("Annex", LocationKind::Warehouse))
            .expect("c");
        assert_eq!(c.id, 3);
    }

    #[test]
    fn fetch_missing_is_not_found() {
        let (_dir, store) = temp_store();
        let err = store.fetch::<Location>(42).expect_err("missing");
        assert!(matches!(err, StoreError::NotFound { kind: "location", id: 42 }));
    }

    #[test]
    fn reopen_preserves_rows() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("greenfis.redb");
        {
            let store = Store::create(&path).expect("create");
            store
                .create_location(NewLocation::new("Front", LocationKind::Store))
                .expect("location");
        }
        let store = Store::open(&path).expect("open");
        let locations: Vec<Location> = store.list().expect("list");
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "Front");
    }
}
