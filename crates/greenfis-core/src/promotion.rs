//! # Promotions
//!
//! Percentage discounts, either on one product or store-wide, valid for a
//! half-open time window `[starts_at, ends_at)`.
//!
//! Promotions never stack. For each sale line [`best_promotion`] picks one:
//! the highest percentage wins, a product-specific promotion beats a
//! store-wide one at the same percentage, and the lowest id breaks any
//! remaining tie.

use crate::catalog::Product;
use crate::primitives::{Money, Timestamp, required_text};
use crate::storage::{Record, Store, TxRead, tables, tx_insert, tx_remove, tx_save};
use crate::{Result, StoreError};
use redb::WriteTransaction;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// A percentage discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: u64,
    pub name: String,
    /// `None` applies to every product.
    pub product_id: Option<u64>,
    /// 1..=100
    pub discount_percent: u8,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub active: bool,
}

impl Record for Promotion {
    const KIND: &'static str = "promotion";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::PROMOTIONS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Promotion {
    /// Whether this promotion is in force for `product_id` at `at`.
    #[must_use]
    pub fn applies_to(&self, product_id: u64, at: Timestamp) -> bool {
        self.active
            && self.starts_at <= at
            && at < self.ends_at
            && self.product_id.is_none_or(|p| p == product_id)
    }

    /// Whether this promotion is in force at `at` for any product.
    #[must_use]
    pub fn is_running(&self, at: Timestamp) -> bool {
        self.active && self.starts_at <= at && at < self.ends_at
    }
}

/// Input for creating or replacing a promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPromotion {
    pub name: String,
    #[serde(default)]
    pub product_id: Option<u64>,
    pub discount_percent: u8,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl NewPromotion {
    fn into_record(self, txn: &WriteTransaction, id: u64) -> Result<Promotion> {
        let name = required_text("name", &self.name)?;
        if !(1..=100).contains(&self.discount_percent) {
            return Err(StoreError::validation(
                "discount_percent must be between 1 and 100",
            ));
        }
        if self.starts_at >= self.ends_at {
            return Err(StoreError::validation("starts_at must be before ends_at"));
        }
        if let Some(product_id) = self.product_id {
            let _: Product = txn.require(product_id)?;
        }
        Ok(Promotion {
            id,
            name,
            product_id: self.product_id,
            discount_percent: self.discount_percent,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            active: self.active,
        })
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// Pick the promotion that gives `product_id` the biggest discount at `at`.
#[must_use]
pub fn best_promotion<'a, I>(promotions: I, product_id: u64, at: Timestamp) -> Option<&'a Promotion>
where
    I: IntoIterator<Item = &'a Promotion>,
{
    promotions
        .into_iter()
        .filter(|p| p.applies_to(product_id, at))
        .min_by_key(|p| (Reverse(p.discount_percent), p.product_id.is_none(), p.id))
}

/// Discount on a gross line amount, rounded down to the cent.
#[must_use]
pub fn line_discount(gross: Money, percent: u8) -> Money {
    gross.percent(percent.min(100))
}

// =============================================================================
// OPERATIONS
// =============================================================================

impl Store {
    pub fn create_promotion(&self, input: NewPromotion) -> Result<Promotion> {
        let txn = self.begin_write()?;
        let record = input.into_record(&txn, 0)?;
        let promotion = tx_insert(&txn, record)?;
        txn.commit()?;
        Ok(promotion)
    }

    pub fn update_promotion(&self, id: u64, input: NewPromotion) -> Result<Promotion> {
        let txn = self.begin_write()?;
        let _: Promotion = txn.require(id)?;
        let promotion = input.into_record(&txn, id)?;
        tx_save(&txn, &promotion)?;
        txn.commit()?;
        Ok(promotion)
    }

    /// Promotions are not referenced by id from anywhere but sale lines, which
    /// keep their own copy of the discount, so deletion is always allowed.
    pub fn delete_promotion(&self, id: u64) -> Result<()> {
        let txn = self.begin_write()?;
        tx_remove::<Promotion>(&txn, id)?;
        txn.commit()?;
        Ok(())
    }

    /// Promotions running at `at`, optionally only those covering a product.
    pub fn active_promotions(
        &self,
        product_id: Option<u64>,
        at: Timestamp,
    ) -> Result<Vec<Promotion>> {
        Ok(self
            .list::<Promotion>()?
            .into_iter()
            .filter(|p| match product_id {
                Some(id) => p.applies_to(id, at),
                None => p.is_running(at),
            })
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
