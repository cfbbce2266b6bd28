//! Table definitions.
//!
//! Entity rows are postcard-encoded and keyed by their `u64` id. Inventory is
//! keyed by `(location_id, product_id)` so a location's stock is one range.

use redb::TableDefinition;

pub(crate) type RowTable = TableDefinition<'static, u64, &'static [u8]>;

pub(crate) const USERS: RowTable = TableDefinition::new("users");
pub(crate) const SUPPLIERS: RowTable = TableDefinition::new("suppliers");
pub(crate) const LOCATIONS: RowTable = TableDefinition::new("locations");
pub(crate) const PRODUCTS: RowTable = TableDefinition::new("products");
pub(crate) const PROMOTIONS: RowTable = TableDefinition::new("promotions");
pub(crate) const SALES: RowTable = TableDefinition::new("sales");
pub(crate) const RESTOCKS: RowTable = TableDefinition::new("restock_requests");
pub(crate) const TRANSFERS: RowTable = TableDefinition::new("transfers");
pub(crate) const CLOSINGS: RowTable = TableDefinition::new("cash_closings");

pub(crate) const INVENTORY: TableDefinition<'static, (u64, u64), &'static [u8]> =
    TableDefinition::new("inventory");

/// Last id handed out per entity kind.
pub(crate) const COUNTERS: TableDefinition<'static, &'static str, u64> =
    TableDefinition::new("counters");

/// Every row table, in a fixed order.
pub(crate) const ROW_TABLES: [RowTable; 9] = [
    USERS, SUPPLIERS, LOCATIONS, PRODUCTS, PROMOTIONS, SALES, RESTOCKS, TRANSFERS, CLOSINGS,
];
