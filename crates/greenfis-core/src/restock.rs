//! # Restocking Requests
//!
//! A request to bring more of a product into a location.
//!
//! ```text
//! pending ──approve──► approved ──receive──► received
//!    │                                         ▲
//!    ├──────────────────receive────────────────┘
//!    └──reject──► rejected
//! ```
//!
//! Receiving adds the requested quantity to the location's stock in the same
//! transaction that marks the request received.

use crate::catalog::Supplier;
use crate::inventory::{require_pair, tx_adjust};
use crate::primitives::{Timestamp, optional_text};
use crate::storage::{Record, Store, TxRead, tables, tx_insert, tx_save};
use crate::users::User;
use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};

/// Lifecycle of a restocking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestockStatus {
    Pending,
    Approved,
    Rejected,
    Received,
}

/// A request for more stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockRequest {
    pub id: u64,
    pub location_id: u64,
    pub product_id: u64,
    pub supplier_id: Option<u64>,
    pub quantity: u32,
    pub requested_by: u64,
    pub status: RestockStatus,
    pub note: Option<String>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Record for RestockRequest {
    const KIND: &'static str = "restock_request";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::RESTOCKS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Input for [`Store::create_restock`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRestock {
    pub location_id: u64,
    pub product_id: u64,
    #[serde(default)]
    pub supplier_id: Option<u64>,
    pub quantity: u32,
    pub requested_by: u64,
    #[serde(default)]
    pub note: Option<String>,
}

impl Store {
    pub fn create_restock(&self, input: NewRestock, at: Timestamp) -> Result<RestockRequest> {
        if input.quantity == 0 {
            return Err(StoreError::validation("quantity must be positive"));
        }
        let note = optional_text("note", input.note.as_deref())?;

        let txn = self.begin_write()?;
        require_pair(&txn, input.location_id, input.product_id)?;
        let _: User = txn.require(input.requested_by)?;
        if let Some(supplier_id) = input.supplier_id {
            let _: Supplier = txn.require(supplier_id)?;
        }

        let request = tx_insert(
            &txn,
            RestockRequest {
                id: 0,
                location_id: input.location_id,
                product_id: input.product_id,
                supplier_id: input.supplier_id,
                quantity: input.quantity,
                requested_by: input.requested_by,
                status: RestockStatus::Pending,
                note,
                created_at: at,
                resolved_at: None,
            },
        )?;
        txn.commit()?;
        Ok(request)
    }

    pub fn approve_restock(&self, id: u64, at: Timestamp) -> Result<RestockRequest> {
        self.transition_restock(id, at, RestockStatus::Approved)
    }

    pub fn reject_restock(&self, id: u64, at: Timestamp) -> Result<RestockRequest> {
        self.transition_restock(id, at, RestockStatus::Rejected)
    }

    /// Mark the goods as arrived and add them to stock.
    pub fn receive_restock(&self, id: u64, at: Timestamp) -> Result<RestockRequest> {
        self.transition_restock(id, at, RestockStatus::Received)
    }

    fn transition_restock(
        &self,
        id: u64,
        at: Timestamp,
        to: RestockStatus,
    ) -> Result<RestockRequest> {
        let txn = self.begin_write()?;
        let mut request: RestockRequest = txn.require(id)?;

        let allowed = match to {
            RestockStatus::Approved | RestockStatus::Rejected => {
                request.status == RestockStatus::Pending
            }
            RestockStatus::Received => matches!(
                request.status,
                RestockStatus::Pending | RestockStatus::Approved
            ),
            RestockStatus::Pending => false,
        };
        if !allowed {
            return Err(StoreError::invalid_state(format!(
                "restock request {id} is {:?} and cannot become {:?}",
                request.status, to
            )));
        }

        if to == RestockStatus::Received {
            tx_adjust(
                &txn,
                request.location_id,
                request.product_id,
                i64::from(request.quantity),
            )?;
        }

        request.status = to;
        if to != RestockStatus::Approved {
            request.resolved_at = Some(at);
        }
        tx_save(&txn, &request)?;
        txn.commit()?;
        Ok(request)
    }

    /// Requests, optionally only those in one status.
    pub fn list_restocks(&self, status: Option<RestockStatus>) -> Result<Vec<RestockRequest>> {
        Ok(self
            .list::<RestockRequest>()?
            .into_iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::tests::{Shop, open_shop};
    use crate::storage::tests::temp_store;

    fn new_restock(shop: &Shop, quantity: u32) -> NewRestock {
        NewRestock {
            location_id: shop.store,
            product_id: shop.basil,
            supplier_id: None,
            quantity,
            requested_by: shop.stocker,
            note: Some("weekend rush".to_string()),
        }
    }

    #[test]
    fn receive_adds_stock() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        let req = store
            .create_restock(new_restock(&shop, 12), Timestamp(5))
            .expect("create");
        assert_eq!(req.status, RestockStatus::Pending);

        store.approve_restock(req.id, Timestamp(6)).expect("approve");
        let received = store.receive_restock(req.id, Timestamp(7)).expect("receive");
        assert_eq!(received.status, RestockStatus::Received);
        assert_eq!(received.resolved_at, Some(Timestamp(7)));
        assert_eq!(store.stock_level(shop.store, shop.basil).expect("basil").quantity, 16);
    }

    #[test]
    fn rejected_request_is_final() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        let req = store
            .create_restock(new_restock(&shop, 3), Timestamp(5))
            .expect("create");
        store.reject_restock(req.id, Timestamp(6)).expect("reject");

        assert!(matches!(
            store.receive_restock(req.id, Timestamp(7)),
            Err(StoreError::InvalidState(_))
        ));
        assert!(matches!(
            store.approve_restock(req.id, Timestamp(7)),
            Err(StoreError::InvalidState(_))
        ));
        assert_eq!(store.stock_level(shop.store, shop.basil).expect("basil").quantity, 4);
    }

    #[test]
    fn cannot_receive_twice() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        let req = store
            .create_restock(new_restock(&shop, 3), Timestamp(5))
            .expect("create");
        store.receive_restock(req.id, Timestamp(6)).expect("receive");
        assert!(store.receive_restock(req.id, Timestamp(7)).is_err());
        assert_eq!(store.stock_level(shop.store, shop.basil).expect("basil").quantity, 7);
    }

    #[test]
    fn create_validates() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        assert!(matches!(
            store.create_restock(new_restock(&shop, 0), Timestamp(5)),
            Err(StoreError::Validation(_))
        ));
        let mut unknown_supplier = new_restock(&shop, 1);
        unknown_supplier.supplier_id = Some(77);
        assert!(matches!(
            store.create_restock(unknown_supplier, Timestamp(5)),
            Err(StoreError::NotFound { kind: "supplier", .. })
        ));
    }

    #[test]
    fn list_by_status() {
        let (_dir, store) = temp_store();
        let shop = open_shop(&store);
        let a = store
            .create_restock(new_restock(&shop, 1), Timestamp(1))
            .expect("a");
        store
            .create_restock(new_restock(&shop, 2), Timestamp(2))
            .expect("b");
        store.approve_restock(a.id, Timestamp(3)).expect("approve");

        assert_eq!(store.list_restocks(None).expect("all").len(), 2);
        let pending = store
            .list_restocks(Some(RestockStatus::Pending))
            .expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].quantity, 2);
    }
}
