//! # Cash-Register Closings
//!
//! A closing reconciles the cash drawer of one cashier at one location.
//! The period runs from the end of the previous closing for the same pair (or
//! the epoch) up to the closing time. Sales are picked by id rather than by
//! timestamp: every sale of the pair newer than the previous closing's
//! `last_sale_id` is totalled per payment method, so a sale rung up in the
//! same second as a closing lands in the next one.

use crate::catalog::Location;
use crate::pos::{PaymentMethod, Sale};
use crate::primitives::{Money, Timestamp, optional_text};
use crate::storage::{Record, Store, TxRead, tables, tx_insert};
use crate::users::User;
use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// A reconciled register period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashClosing {
    pub id: u64,
    pub cashier_id: u64,
    pub location_id: u64,
    pub period_start: Timestamp,
    pub period_end: Timestamp,
    pub opening_float: Money,
    pub cash_sales: Money,
    pub card_sales: Money,
    pub transfer_sales: Money,
    pub sales_count: u32,
    /// Highest sale id reconciled by this closing or an earlier one.
    pub last_sale_id: u64,
    /// `opening_float + cash_sales`
    pub expected_cash: Money,
    pub counted_cash: Money,
    /// `counted_cash - expected_cash`; negative means the drawer is short.
    pub difference: Money,
    pub notes: Option<String>,
}

impl Record for CashClosing {
    const KIND: &'static str = "cash_closing";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::CLOSINGS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Input for [`Store::close_register`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClosing {
    pub cashier_id: u64,
    pub location_id: u64,
    pub opening_float: Money,
    pub counted_cash: Money,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Store {
    /// Close the register for a cashier at a location.
    pub fn close_register(&self, input: NewClosing, at: Timestamp) -> Result<CashClosing> {
        if input.opening_float.is_negative() || input.counted_cash.is_negative() {
            return Err(StoreError::validation("cash amounts must not be negative"));
        }
        let notes = optional_text("notes", input.notes.as_deref())?;

        let txn = self.begin_write()?;
        let cashier: User = txn.require(input.cashier_id)?;
        if !cashier.role.can_sell() {
            return Err(StoreError::validation(format!(
                "user {} does not operate a register",
                cashier.id
            )));
        }
        let _: Location = txn.require(input.location_id)?;

        let previous = txn
            .rows::<CashClosing>()?
            .into_iter()
            .filter(|c| c.cashier_id == input.cashier_id && c.location_id == input.location_id)
            .max_by_key(|c| (c.period_end, c.id));
        let (period_start, covered) = previous
            .map(|c| (c.period_end, c.last_sale_id))
            .unwrap_or((Timestamp::EPOCH, 0));
        if at < period_start {
            return Err(StoreError::validation(
                "closing time is before the previous closing",
            ));
        }

        let mut cash_sales = Money::ZERO;
        let mut card_sales = Money::ZERO;
        let mut transfer_sales = Money::ZERO;
        let mut sales_count = 0u32;
        let mut last_sale_id = covered;
        for sale in txn.rows::<Sale>()?.iter().filter(|s| {
            s.cashier_id == input.cashier_id
                && s.location_id == input.location_id
                && s.id > covered
                && s.created_at <= at
        }) {
            sales_count = sales_count.saturating_add(1);
            last_sale_id = last_sale_id.max(sale.id);
            match sale.payment {
                PaymentMethod::Cash => cash_sales = cash_sales + sale.total,
                PaymentMethod::Card => card_sales = card_sales + sale.total,
                PaymentMethod::Transfer => transfer_sales = transfer_sales + sale.total,
            }
        }

        let expected_cash = input.opening_float + cash_sales;
        let closing = tx_insert(
            &txn,
            CashClosing {
                id: 0,
                cashier_id: input.cashier_id,
                location_id: input.location_id,
                period_start,
                period_end: at,
                opening_float: input.opening_float,
                cash_sales,
                card_sales,
                transfer_sales,
                sales_count,
                last_sale_id,
                expected_cash,
                counted_cash: input.counted_cash,
                difference: input.counted_cash - expected_cash,
                notes,
            },
        )?;
        txn.commit()?;
        Ok(closing)
    }
}

// =============================================================================
// TESTS
// =============================================================================
