//! # Warehouse Transfers
//!
//! Moving stock between two locations. A transfer is created pending and
//! moves nothing until it is completed; completion decrements the source and
//! increments the destination in one transaction.

use crate::catalog::{Location, Product};
use crate::inventory::tx_adjust;
use crate::primitives::Timestamp;
use crate::storage::{Record, Store, TxRead, tables, tx_insert, tx_save};
use crate::users::User;
use crate::{Result, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

/// Stock movement between locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: u64,
    pub product_id: u64,
    pub from_location: u64,
    pub to_location: u64,
    pub quantity: u32,
    pub requested_by: u64,
    pub status: TransferStatus,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}

impl Record for Transfer {
    const KIND: &'static str = "transfer";
    const TABLE: redb::TableDefinition<'static, u64, &'static [u8]> = tables::TRANSFERS;

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

/// Input for [`Store::create_transfer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransfer {
    pub product_id: u64,
    pub from_location: u64,
    pub to_location: u64,
    pub quantity: u32,
    pub requested_by: u64,
}

impl Store {
    pub fn create_transfer(&self, input: NewTransfer, at: Timestamp) -> Result<Transfer> {
        if input.quantity == 0 {
            return Err(StoreError::validation("quantity must be positive"));
        }
        if input.from_location == input.to_location {
            return Err(StoreError::validation(
                "source and destination must differ",
            ));
        }

        let txn = self.begin_write()?;
        let _: Product = txn.require(input.product_id)?;
        let _: Location = txn.require(input.from_location)?;
        let _: Location = txn.require(input.to_location)?;
        let _: User = txn.require(input.requested_by)?;

        let transfer = tx_insert(
            &txn,
            Transfer {
                id: 0,
                product_id: input.product_id,
                from_location: input.from_location,
                to_location: input.to_location,
                quantity: input.quantity,
                requested_by: input.requested_by,
                status: TransferStatus::Pending,
                created_at: at,
                resolved_at: None,
            },
        )?;
        txn.commit()?;
        Ok(transfer)
    }

    /// Move the stock.
    pub fn complete_transfer(&self, id: u64, at: Timestamp) -> Result<Transfer> {
        let txn = self.begin_write()?;
        let mut transfer: Transfer = txn.require(id)?;
        if transfer.status != TransferStatus::Pending {
            return Err(StoreError::invalid_state(format!(
                "transfer {id} is {:?}",
                transfer.status
            )));
        }

        let qty = i64::from(transfer.quantity);
        tx_adjust(&txn, transfer.from_location, transfer.product_id, -qty)?;
        tx_adjust(&txn, transfer.to_location, transfer.product_id, qty)?;

        transfer.status = TransferStatus::Completed;
        transfer.resolved_at = Some(at);
        tx_save(&txn, &transfer)?;
        txn.commit()?;
        Ok(transfer)
    }

    pub fn cancel_transfer(&self, id: u64, at: Timestamp) -> Result<Transfer> {
        let txn = self.begin_write()?;
        let mut transfer: Transfer = txn.require(id)?;
        if transfer.status != TransferStatus::Pending {
            return Err(StoreError::invalid_state(format!(
                "transfer {id} is {:?}",
                transfer.status
            )));
        }
        transfer.status = TransferStatus::Cancelled;
        transfer.resolved_at = Some(at);
        tx_save(&txn, &transfer)?;
        txn.commit()?;
        Ok(transfer)
    }

    /// Transfers, optionally only those in one status.
    pub fn list_transfers(&self, status: Option<TransferStatus>) -> Result<Vec<Transfer>> {
        Ok(self
            .list::<Transfer>()?
            .into_iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
