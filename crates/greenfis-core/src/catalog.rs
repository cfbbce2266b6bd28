//! # Catalog
//!
//! Suppliers, store/warehouse locations and the product catalog.
//!
//! Updates replace the whole record (PUT semantics): the same input type is
//! used for create and update.

use crate::closing::CashClosing;
use crate::inventory::InventoryItem;
use crate::pos::Sale;
use crate::primitives::{MAX_PRICE_CENTS, Money, optional_text, required_text};
use crate::promotion::Promotion;
use crate::restock::RestockRequest;
use crate::storage::{
    Record, Store, TxRead, tables, tx_insert, tx_remove, tx_remove_stock, tx_save,
};
use crate::transfer::Transfer;
use crate::{Result, StoreError};
use redb::WriteTransaction;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

// =============================================================================
// SUPPLIERS
// =============================================================================

/// A vendor products are bought from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: u64,
    pub name: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub active: bool,
}

impl Record for Supplier {
    const KIND: &'static str = "supplier";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::SUPPLIERS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Input for creating or replacing a supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl NewSupplier {
    /// A supplier with only a name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact_name: None,
            phone: None,
            email: None,
            active: true,
        }
    }

    fn into_record(self, id: u64) -> Result<Supplier> {
        let email = optional_text("email", self.email.as_deref())?;
        if let Some(email) = &email {
            if !email.contains('@') {
                return Err(StoreError::validation("email must contain '@'"));
            }
        }
        Ok(Supplier {
            id,
            name: required_text("name", &self.name)?,
            contact_name: optional_text("contact_name", self.contact_name.as_deref())?,
            phone: optional_text("phone", self.phone.as_deref())?,
            email,
            active: self.active,
        })
    }
}

// =============================================================================
// LOCATIONS
// =============================================================================

/// Whether a location sells to customers or only holds stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Store,
    Warehouse,
}

/// A place that holds stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: u64,
    pub name: String,
    pub kind: LocationKind,
}

impl Record for Location {
    const KIND: &'static str = "location";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::LOCATIONS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Input for creating or replacing a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocation {
    pub name: String,
    pub kind: LocationKind,
}

impl NewLocation {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LocationKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// =============================================================================
// PRODUCTS
// =============================================================================

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    /// Unique stock-keeping code.
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub supplier_id: Option<u64>,
    /// Shelf price per unit.
    pub unit_price: Money,
    /// Purchase cost per unit.
    pub cost: Money,
    pub active: bool,
}

impl Record for Product {
    const KIND: &'static str = "product";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::PRODUCTS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Input for creating or replacing a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub supplier_id: Option<u64>,
    pub unit_price: Money,
    #[serde(default)]
    pub cost: Money,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl NewProduct {
    /// A minimal active product.
    #[must_use]
    pub fn new(sku: impl Into<String>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            category: None,
            supplier_id: None,
            unit_price,
            cost: Money::ZERO,
            active: true,
        }
    }

    fn into_record(self, txn: &WriteTransaction, id: u64) -> Result<Product> {
        let sku = required_text("sku", &self.sku)?.to_uppercase();
        let name = required_text("name", &self.name)?;
        if self.unit_price.is_negative() || self.cost.is_negative() {
            return Err(StoreError::validation("prices must not be negative"));
        }
        if self.unit_price.cents() > MAX_PRICE_CENTS || self.cost.cents() > MAX_PRICE_CENTS {
            return Err(StoreError::validation(format!(
                "prices must not exceed {}",
                Money(MAX_PRICE_CENTS)
            )));
        }
        if let Some(supplier_id) = self.supplier_id {
            let _: Supplier = txn.require(supplier_id)?;
        }
        if txn
            .rows::<Product>()?
            .iter()
            .any(|p| p.sku == sku && p.id != id)
        {
            return Err(StoreError::conflict(format!("sku '{sku}' is already in use")));
        }
        Ok(Product {
            id,
            sku,
            name,
            category: optional_text("category", self.category.as_deref())?,
            supplier_id: self.supplier_id,
            unit_price: self.unit_price,
            cost: self.cost,
            active: self.active,
        })
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Store {
    pub fn create_supplier(&self, input: NewSupplier) -> Result<Supplier> {
        let record = input.into_record(0)?;
        let txn = self.begin_write()?;
        let supplier = tx_insert(&txn, record)?;
        txn.commit()?;
        Ok(supplier)
    }

    pub fn update_supplier(&self, id: u64, input: NewSupplier) -> Result<Supplier> {
        let record = input.into_record(id)?;
        let txn = self.begin_write()?;
        let _: Supplier = txn.require(id)?;
        tx_save(&txn, &record)?;
        txn.commit()?;
        Ok(record)
    }

    /// Delete a supplier no product or restock request points at.
    pub fn delete_supplier(&self, id: u64) -> Result<()> {
        let txn = self.begin_write()?;
        let _: Supplier = txn.require(id)?;
        if txn
            .rows::<Product>()?
            .iter()
            .any(|p| p.supplier_id == Some(id))
            || txn
                .rows::<RestockRequest>()?
                .iter()
                .any(|r| r.supplier_id == Some(id))
        {
            return Err(StoreError::conflict(format!(
                "supplier {id} is still referenced"
            )));
        }
        tx_remove::<Supplier>(&txn, id)?;
        txn.commit()?;
        Ok(())
    }

    pub fn create_location(&self, input: NewLocation) -> Result<Location> {
        let name = required_text("name", &input.name)?;
        let txn = self.begin_write()?;
        let location = tx_insert(
            &txn,
            Location {
                id: 0,
                name,
                kind: input.kind,
            },
        )?;
        txn.commit()?;
        Ok(location)
    }

    pub fn update_location(&self, id: u64, input: NewLocation) -> Result<Location> {
        let name = required_text("name", &input.name)?;
        let txn = self.begin_write()?;
        let _: Location = txn.require(id)?;
        let location = Location {
            id,
            name,
            kind: input.kind,
        };
        tx_save(&txn, &location)?;
        txn.commit()?;
        Ok(location)
    }

    /// Delete a location that holds no stock and has no history. Empty stock
    /// rows go with it.
    pub fn delete_location(&self, id: u64) -> Result<()> {
        let txn = self.begin_write()?;
        let _: Location = txn.require(id)?;
        let stock = txn.stock_rows(Some(id))?;
        let referenced = stock.iter().any(|item| item.quantity > 0)
            || txn.rows::<Sale>()?.iter().any(|s| s.location_id == id)
            || txn
                .rows::<RestockRequest>()?
                .iter()
                .any(|r| r.location_id == id)
            || txn
                .rows::<Transfer>()?
                .iter()
                .any(|t| t.from_location == id || t.to_location == id)
            || txn
                .rows::<CashClosing>()?
                .iter()
                .any(|c| c.location_id == id);
        if referenced {
            return Err(StoreError::conflict(format!(
                "location {id} still holds stock or history"
            )));
        }
        for item in stock {
            tx_remove_stock(&txn, item.location_id, item.product_id)?;
        }
        tx_remove::<Location>(&txn, id)?;
        txn.commit()?;
        Ok(())
    }

    pub fn create_product(&self, input: NewProduct) -> Result<Product> {
        let txn = self.begin_write()?;
        let record = input.into_record(&txn, 0)?;
        let product = tx_insert(&txn, record)?;
        txn.commit()?;
        Ok(product)
    }

    pub fn update_product(&self, id: u64, input: NewProduct) -> Result<Product> {
        let txn = self.begin_write()?;
        let _: Product = txn.require(id)?;
        let product = input.into_record(&txn, id)?;
        tx_save(&txn, &product)?;
        txn.commit()?;
        Ok(product)
    }

    /// Delete a product that was never sold or moved. Its stock rows and
    /// product-specific promotions go with it.
    pub fn delete_product(&self, id: u64) -> Result<()> {
        let txn = self.begin_write()?;
        let _: Product = txn.require(id)?;
        let has_history = txn
            .rows::<Sale>()?
            .iter()
            .any(|s| s.lines.iter().any(|l| l.product_id == id))
            || txn
                .rows::<RestockRequest>()?
                .iter()
                .any(|r| r.product_id == id)
            || txn.rows::<Transfer>()?.iter().any(|t| t.product_id == id);
        if has_history {
            return Err(StoreError::conflict(format!(
                "product {id} has history; deactivate it instead"
            )));
        }

        let stock: Vec<InventoryItem> = txn
            .stock_rows(None)?
            .into_iter()
            .filter(|item| item.product_id == id)
            .collect();
        for item in stock {
            tx_remove_stock(&txn, item.location_id, item.product_id)?;
        }
        let promos: Vec<Promotion> = txn
            .rows::<Promotion>()?
            .into_iter()
            .filter(|p| p.product_id == Some(id))
            .collect();
        for promo in promos {
            tx_remove::<Promotion>(&txn, promo.id)?;
        }

        tx_remove::<Product>(&txn, id)?;
        txn.commit()?;
        Ok(())
    }

    /// Find a product by sku (case-insensitive).
    pub fn find_product_by_sku(&self, sku: &str) -> Result<Option<Product>> {
        let wanted = sku.trim().to_uppercase();
        Ok(self
            .list::<Product>()?
            .into_iter()
            .find(|p| p.sku == wanted))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closing::NewClosing;
    use crate::pos::tests::{open_shop, request};
    use crate::primitives::{MAX_LINE_QUANTITY, Timestamp};
    use crate::promotion::NewPromotion;
    use crate::restock::NewRestock;
    use crate::storage::tests::temp_store;
    use crate::transfer::NewTransfer;

    #[test]
    fn product_sku_is_unique_and_uppercased() {
        let (_dir, store) = temp_store();
        let p = store
            .create_product(NewProduct::new("bas-01", "Basil", Money(250)))
            .expect("create");
        assert_eq!(p.sku, "BAS-01");

        let err = store
            .create_product(NewProduct::new("BAS-01", "Other", Money(100)))
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));

        // Updating a product may keep its own sku.
        let updated = store
            .update_product(p.id, NewProduct::new("BAS-01", "Sweet basil", Money(275)))
            .expect("update");
        assert_eq!(updated.name, "Sweet basil");
        assert_eq!(
            store.find_product_by_sku("bas-01").expect("find").map(|p| p.id),
            Some(p.id)
        );
    }

    #[test]
    fn product_requires_existing_supplier() {
        let (_dir, store) = temp_store();
        let mut input = NewProduct::new("MINT", "Mint", Money(199));
        input.supplier_id = Some(9);
        assert!(matches!(
            store.create_product(input),
            Err(StoreError::NotFound { kind: "supplier", id: 9 })
        ));
    }

    #[test]
    fn negative_price_rejected() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.create_product(NewProduct::new("X", "X", Money(-1))),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn price_above_cap_rejected() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.create_product(NewProduct::new("X", "X", Money(MAX_PRICE_CENTS + 1))),
            Err(StoreError::Validation(_))
        ));
        let mut input = NewProduct::new("Y", "Y", Money(100));
        input.cost = Money(MAX_PRICE_CENTS + 1);
        assert!(matches!(
            store.create_product(input),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn half_off_the_dearest_line_is_exact() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        let dear = store
            .create_product(NewProduct::new("GOLD", "Gold leaf", Money(MAX_PRICE_CENTS)))
            .expect("product at the cap");
        store
            .create_promotion(NewPromotion {
                name: "Half off".to_string(),
                product_id: Some(dear.id),
                discount_percent: 50,
                starts_at: Timestamp(0),
                ends_at: Timestamp(100),
                active: true,
            })
            .expect("promotion");

        let quote = store
            .quote(&request(&shop, &[(dear.id, MAX_LINE_QUANTITY)]), Timestamp(1))
            .expect("quote");
        let gross = Money(MAX_PRICE_CENTS).times(MAX_LINE_QUANTITY);
        assert_eq!(quote.subtotal, gross);
        assert_eq!(quote.discount_total.cents() * 2, gross.cents());
        assert_eq!(quote.total, gross - quote.discount_total);
    }

    #[test]
    fn supplier_in_use_cannot_be_deleted() {
        let (_dir, store) = temp_store();
        let supplier = store
            .create_supplier(NewSupplier::named("Verde Farms"))
            .expect("supplier");
        let mut input = NewProduct::new("MINT", "Mint", Money(199));
        input.supplier_id = Some(supplier.id);
        let product = store.create_product(input).expect("product");

        assert!(matches!(
            store.delete_supplier(supplier.id),
            Err(StoreError::Conflict(_))
        ));
        store.delete_product(product.id).expect("delete product");
        store.delete_supplier(supplier.id).expect("delete supplier");
    }

    #[test]
    fn supplier_email_validated() {
        let (_dir, store) = temp_store();
        let mut input = NewSupplier::named("Verde Farms");
        input.email = Some("not-an-email".to_string());
        assert!(matches!(
            store.create_supplier(input),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn location_with_stock_cannot_be_deleted() {
        let (_dir, store) = temp_store();
        let loc = store
            .create_location(NewLocation::new("Main", LocationKind::Store))
            .expect("location");
        let product = store
            .create_product(NewProduct::new("MINT", "Mint", Money(199)))
            .expect("product");
        store.set_stock(loc.id, product.id, 5, 0).expect("stock");

        assert!(matches!(
            store.delete_location(loc.id),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn location_with_sales_cannot_be_deleted() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        store
            .checkout(request(&shop, &[(shop.mint, 10), (shop.basil, 4)]), Timestamp(5))
            .expect("sell out");
        let stock = store.list_inventory(Some(shop.store)).expect("inventory");
        assert!(stock.iter().all(|item| item.quantity == 0));

        assert!(matches!(
            store.delete_location(shop.store),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn empty_stock_rows_go_with_location() {
        let (_dir, store) = temp_store();
        let loc = store
            .create_location(NewLocation::new("Popup", LocationKind::Store))
            .expect("location");
        let product = store
            .create_product(NewProduct::new("MINT", "Mint", Money(199)))
            .expect("product");
        store.set_stock(loc.id, product.id, 0, 3).expect("empty row");

        store.delete_location(loc.id).expect("delete");
        assert!(store.list_inventory(None).expect("inventory").is_empty());
    }

    #[test]
    fn location_with_closing_cannot_be_deleted() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        let kiosk = store
            .create_location(NewLocation::new("Kiosk", LocationKind::Store))
            .expect("kiosk");
        store
            .close_register(
                NewClosing {
                    cashier_id: shop.cashier,
                    location_id: kiosk.id,
                    opening_float: Money::ZERO,
                    counted_cash: Money::ZERO,
                    notes: None,
                },
                Timestamp(10),
            )
            .expect("empty closing");

        assert!(matches!(
            store.delete_location(kiosk.id),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn sold_product_cannot_be_deleted() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        store
            .checkout(request(&shop, &[(shop.mint, 1)]), Timestamp(5))
            .expect("sale");

        assert!(matches!(
            store.delete_product(shop.mint),
            Err(StoreError::Conflict(_))
        ));
        assert!(store.get::<Product>(shop.mint).expect("get").is_some());
    }

    #[test]
    fn restocked_product_cannot_be_deleted() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        store
            .create_restock(
                NewRestock {
                    location_id: shop.store,
                    product_id: shop.basil,
                    supplier_id: None,
                    quantity: 6,
                    requested_by: shop.stocker,
                    note: None,
                },
                Timestamp(5),
            )
            .expect("restock");

        assert!(matches!(
            store.delete_product(shop.basil),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn transferred_product_cannot_be_deleted() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        let back = store
            .create_location(NewLocation::new("Back", LocationKind::Warehouse))
            .expect("back");
        store
            .create_transfer(
                NewTransfer {
                    product_id: shop.mint,
                    from_location: shop.store,
                    to_location: back.id,
                    quantity: 2,
                    requested_by: shop.stocker,
                },
                Timestamp(5),
            )
            .expect("transfer");

        assert!(matches!(
            store.delete_product(shop.mint),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn deleting_product_drops_its_promotions() {
        let (_dir, store) = temp_store();
        let product = store
            .create_product(NewProduct::new("MINT", "Mint", Money(199)))
            .expect("product");
        let promo = |name: &str, product_id| NewPromotion {
            name: name.to_string(),
            product_id,
            discount_percent: 10,
            starts_at: Timestamp(0),
            ends_at: Timestamp(100),
            active: true,
        };
        let own = store
            .create_promotion(promo("Mint week", Some(product.id)))
            .expect("own promotion");
        let storewide = store
            .create_promotion(promo("Everything", None))
            .expect("store-wide promotion");

        store.delete_product(product.id).expect("delete");

        assert!(store.get::<Promotion>(own.id).expect("get").is_none());
        assert!(store.get::<Promotion>(storewide.id).expect("get").is_some());
    }

    #[test]
    fn deleting_product_drops_its_stock_rows() {
        let (_dir, store) = temp_store();
        let loc = store
            .create_location(NewLocation::new("Main", LocationKind::Store))
            .expect("location");
        let product = store
            .create_product(NewProduct::new("MINT", "Mint", Money(199)))
            .expect("product");
        store.set_stock(loc.id, product.id, 5, 1).expect("stock");

        store.delete_product(product.id).expect("delete");
        assert!(store.list_inventory(None).expect("inventory").is_empty());
        store.delete_location(loc.id).expect("location now free");
    }
}
