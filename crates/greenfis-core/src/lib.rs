//! # GreenFis Core
//!
//! Domain rules and embedded storage for the GreenFis store backend.
//!
//! The crate is synchronous and network-free. The HTTP server and CLI in
//! `apps/greenfis` wrap a [`Store`] and pass the current time into every
//! operation that records something.
//!
//! ## Modules
//!
//! | module | what it owns |
//! |---|---|
//! | [`storage`] | redb tables, id allocation, row encoding |
//! | [`users`] | staff accounts, roles, password checks |
//! | [`catalog`] | suppliers, locations, products |
//! | [`inventory`] | stock per (location, product) |
//! | [`promotion`] | percentage discounts and best-discount selection |
//! | [`pos`] | atomic checkout and price quotes |
//! | [`restock`] | restocking requests |
//! | [`transfer`] | stock transfers between locations |
//! | [`closing`] | cash-register closings |
//! | [`report`] | sales summaries |
//! | [`snapshot`] | full export / import |

#![forbid(unsafe_code)]

pub mod catalog;
pub mod closing;
mod error;
pub mod inventory;
pub mod pos;
pub mod primitives;
pub mod promotion;
pub mod report;
pub mod restock;
pub mod snapshot;
pub mod storage;
pub mod transfer;
pub mod users;

pub use catalog::{Location, LocationKind, NewLocation, NewProduct, NewSupplier, Product, Supplier};
pub use closing::{CashClosing, NewClosing};
pub use error::{Result, StoreError};
pub use inventory::{InventoryItem, StockAdjustment, StockLevel};
pub use pos::{CheckoutLine, CheckoutRequest, PaymentMethod, Quote, Sale, SaleFilter, SaleLine};
pub use primitives::{Money, Timestamp};
pub use promotion::{NewPromotion, Promotion, best_promotion, line_discount};
pub use report::{ProductSales, SalesSummary};
pub use restock::{NewRestock, RestockRequest, RestockStatus};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot};
pub use storage::{Record, Store};
pub use transfer::{NewTransfer, Transfer, TransferStatus};
pub use users::{NewUser, Role, User, UserPatch, UserProfile};
