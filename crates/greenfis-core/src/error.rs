//! # Error Module
//!
//! A single error type for every core operation.

use thiserror::Error;

/// Errors returned by the store and the domain operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The embedded database failed.
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    /// A row could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] postcard::Error),

    /// The referenced row does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    /// Input failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation would violate a uniqueness or reference constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stateful record is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Not enough stock at the location to cover the request.
    #[error(
        "insufficient stock for product {product_id} at location {location_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: u64,
        location_id: u64,
        requested: u64,
        available: u64,
    },

    /// Unknown user, wrong password or inactive account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Import was attempted into a database that already holds data.
    #[error("database is not empty")]
    NotEmpty,
}

impl StoreError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }
}

// redb splits its errors per phase; fold them all into `redb::Error`.
macro_rules! from_redb {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    Self::Database(err.into())
                }
            }
        )*
    };
}

from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, StoreError>;
