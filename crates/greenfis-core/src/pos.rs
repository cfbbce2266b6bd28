//! # Point of Sale
//!
//! Checkout runs as one write transaction:
//!
//! 1. validate the request, the cashier and the location
//! 2. merge lines per product and check stock at the location
//! 3. price every line, applying at most one promotion
//! 4. insert the sale, decrement stock, commit
//!
//! Any error drops the transaction, so a failed checkout leaves no sale and
//! no stock change behind.

use crate::catalog::{Location, Product};
use crate::inventory::tx_adjust;
use crate::primitives::{MAX_LINE_QUANTITY, MAX_SALE_LINES, Money, Timestamp};
use crate::promotion::{Promotion, best_promotion, line_discount};
use crate::storage::{Record, Store, TxRead, tables, tx_insert};
use crate::users::User;
use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// One priced line of a sale.
///
/// Name and price are copied at sale time so later catalog edits do not
/// rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: u64,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub promotion_id: Option<u64>,
    pub discount: Money,
    pub line_total: Money,
}

impl SaleLine {
    /// Price before discount.
    #[must_use]
    pub fn gross(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: u64,
    pub cashier_id: u64,
    pub location_id: u64,
    pub payment: PaymentMethod,
    pub lines: Vec<SaleLine>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub total: Money,
    pub amount_tendered: Option<Money>,
    pub change_due: Money,
    pub created_at: Timestamp,
}

impl Record for Sale {
    const KIND: &'static str = "sale";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::SALES;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// A requested line: product and quantity only, prices come from the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: u64,
    pub quantity: u32,
}

/// Input for [`Store::checkout`] and [`Store::quote`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub cashier_id: u64,
    pub location_id: u64,
    pub payment: PaymentMethod,
    pub lines: Vec<CheckoutLine>,
    #[serde(default)]
    pub amount_tendered: Option<Money>,
}

/// Priced lines and totals without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub lines: Vec<SaleLine>,
    pub subtotal: Money,
    pub discount_total: Money,
    pub total: Money,
}

// =============================================================================
// PRICING
// =============================================================================

fn validate_lines(lines: &[CheckoutLine]) -> Result<()> {
    if lines.is_empty() {
        return Err(StoreError::validation("a sale needs at least one line"));
    }
    if lines.len() > MAX_SALE_LINES {
        return Err(StoreError::validation(format!(
            "a sale may have at most {MAX_SALE_LINES} lines"
        )));
    }
    if let Some(line) = lines
        .iter()
        .find(|l| l.quantity == 0 || l.quantity > MAX_LINE_QUANTITY)
    {
        return Err(StoreError::validation(format!(
            "quantity for product {} must be between 1 and {MAX_LINE_QUANTITY}",
            line.product_id
        )));
    }
    Ok(())
}

/// Merge duplicate products, keeping first-seen order.
fn merge_lines(lines: &[CheckoutLine]) -> Vec<CheckoutLine> {
    let mut merged: Vec<CheckoutLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|m| m.product_id == line.product_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(line.quantity);
            }
            None => merged.push(*line),
        }
    }
    merged
}

/// Price one line against the catalog and running promotions.
pub fn price_line(
    product: &Product,
    quantity: u32,
    promotions: &[Promotion],
    at: Timestamp,
) -> SaleLine {
    let gross = product.unit_price.times(quantity);
    let promo = best_promotion(promotions, product.id, at);
    let discount = promo
        .map(|p| line_discount(gross, p.discount_percent))
        .unwrap_or(Money::ZERO);
    SaleLine {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity,
        unit_price: product.unit_price,
        promotion_id: promo.map(|p| p.id),
        discount,
        line_total: gross - discount,
    }
}

fn build_quote(txn: &impl TxRead, lines: &[CheckoutLine], at: Timestamp) -> Result<Quote> {
    validate_lines(lines)?;
    let promotions: Vec<Promotion> = txn
        .rows::<Promotion>()?
        .into_iter()
        .filter(|p| p.is_running(at))
        .collect();

    let mut priced = Vec::new();
    for line in merge_lines(lines) {
        let product: Product = txn.require(line.product_id)?;
        if !product.active {
            return Err(StoreError::validation(format!(
                "product {} is not for sale",
                product.id
            )));
        }
        priced.push(price_line(&product, line.quantity, &promotions, at));
    }

    let subtotal: Money = priced.iter().map(SaleLine::gross).sum();
    let discount_total: Money = priced.iter().map(|l| l.discount).sum();
    Ok(Quote {
        lines: priced,
        subtotal,
        discount_total,
        total: subtotal - discount_total,
    })
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Store {
    /// Price a basket without checking stock or writing anything.
    pub fn quote(&self, request: &CheckoutRequest, at: Timestamp) -> Result<Quote> {
        let txn = self.begin_read()?;
        let _: Location = txn.require(request.location_id)?;
        build_quote(&txn, &request.lines, at)
    }

    /// Ring up a sale atomically.
    pub fn checkout(&self, request: CheckoutRequest, at: Timestamp) -> Result<Sale> {
        let txn = self.begin_write()?;

        let cashier: User = txn.require(request.cashier_id)?;
        if !cashier.active || !cashier.role.can_sell() {
            return Err(StoreError::validation(format!(
                "user {} may not record sales",
                cashier.id
            )));
        }
        let _: Location = txn.require(request.location_id)?;

        let quote = build_quote(&txn, &request.lines, at)?;

        // Stock check for every product before any write.
        for line in &quote.lines {
            let available = txn.quantity(request.location_id, line.product_id)?;
            if available < line.quantity {
                return Err(StoreError::InsufficientStock {
                    product_id: line.product_id,
                    location_id: request.location_id,
                    requested: u64::from(line.quantity),
                    available: u64::from(available),
                });
            }
        }

        let (amount_tendered, change_due) = match (request.payment, request.amount_tendered) {
            (PaymentMethod::Cash, Some(tendered)) => {
                if tendered < quote.total {
                    return Err(StoreError::validation(format!(
                        "amount tendered {} is less than the total {}",
                        tendered, quote.total
                    )));
                }
                (Some(tendered), tendered - quote.total)
            }
            (PaymentMethod::Cash, None) => (None, Money::ZERO),
            (_, Some(_)) => {
                return Err(StoreError::validation(
                    "amount_tendered only applies to cash payments",
                ));
            }
            (_, None) => (None, Money::ZERO),
        };

        let sale = tx_insert(
            &txn,
            Sale {
                id: 0,
                cashier_id: cashier.id,
                location_id: request.location_id,
                payment: request.payment,
                lines: quote.lines,
                subtotal: quote.subtotal,
                discount_total: quote.discount_total,
                total: quote.total,
                amount_tendered,
                change_due,
                created_at: at,
            },
        )?;

        for line in &sale.lines {
            tx_adjust(
                &txn,
                sale.location_id,
                line.product_id,
                -i64::from(line.quantity),
            )?;
        }

        txn.commit()?;
        Ok(sale)
    }

    /// Sales in ascending id order, optionally filtered.
    pub fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>> {
        Ok(self
            .list::<Sale>()?
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect())
    }
}

/// Optional filters for [`Store::list_sales`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    #[serde(default)]
    pub cashier_id: Option<u64>,
    #[serde(default)]
    pub location_id: Option<u64>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub from: Option<Timestamp>,
    /// Exclusive upper bound.
    #[serde(default)]
    pub to: Option<Timestamp>,
}

impl SaleFilter {
    #[must_use]
    pub fn matches(&self, sale: &Sale) -> bool {
        self.cashier_id.is_none_or(|c| c == sale.cashier_id)
            && self.location_id.is_none_or(|l| l == sale.location_id)
            && self.from.is_none_or(|f| sale.created_at >= f)
            && self.to.is_none_or(|t| sale.created_at < t)
    }
}

// =============================================================================
// TESTS
// =============================================================================
