//! # Reports
//!
//! Dashboard aggregates over recorded sales.

use crate::pos::{PaymentMethod, Sale};
use crate::primitives::{Money, TOP_PRODUCTS_LIMIT, Timestamp};
use crate::storage::Store;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Units and revenue for one product in a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSales {
    pub product_id: u64,
    pub product_name: String,
    pub quantity: u64,
    pub revenue: Money,
}

/// Totals for a period `[from, to)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub from: Timestamp,
    pub to: Timestamp,
    pub sales_count: u64,
    pub gross: Money,
    pub discounts: Money,
    pub net: Money,
    pub by_payment: BTreeMap<PaymentMethod, Money>,
    pub top_products: Vec<ProductSales>,
}

/// Summarise the given sales, counting only those in `[from, to)`.
#[must_use]
pub fn summarize<'a>(
    sales: impl IntoIterator<Item = &'a Sale>,
    from: Timestamp,
    to: Timestamp,
) -> SalesSummary {
    let mut summary = SalesSummary {
        from,
        to,
        sales_count: 0,
        gross: Money::ZERO,
        discounts: Money::ZERO,
        net: Money::ZERO,
        by_payment: BTreeMap::new(),
        top_products: Vec::new(),
    };
    let mut products: BTreeMap<u64, ProductSales> = BTreeMap::new();

    for sale in sales
        .into_iter()
        .filter(|s| s.created_at >= from && s.created_at < to)
    {
        summary.sales_count = summary.sales_count.saturating_add(1);
        summary.gross = summary.gross + sale.subtotal;
        summary.discounts = summary.discounts + sale.discount_total;
        summary.net = summary.net + sale.total;
        let slot = summary.by_payment.entry(sale.payment).or_default();
        *slot = *slot + sale.total;

        for line in &sale.lines {
            let entry = products
                .entry(line.product_id)
                .or_insert_with(|| ProductSales {
                    product_id: line.product_id,
                    product_name: line.product_name.clone(),
                    quantity: 0,
                    revenue: Money::ZERO,
                });
            entry.quantity = entry.quantity.saturating_add(u64::from(line.quantity));
            entry.revenue = entry.revenue + line.line_total;
        }
    }

    let mut ranked: Vec<ProductSales> = products.into_values().collect();
    ranked.sort_by_key(|p| (Reverse(p.quantity), Reverse(p.revenue), p.product_id));
    ranked.truncate(TOP_PRODUCTS_LIMIT);
    summary.top_products = ranked;
    summary
}

impl Store {
    /// Sales summary for `[from, to)`.
    pub fn sales_summary(&self, from: Timestamp, to: Timestamp) -> Result<SalesSummary> {
        let sales = self.list::<Sale>()?;
        Ok(summarize(&sales, from, to))
    }
}

// =============================================================================
// TESTS
// =============================================================================
