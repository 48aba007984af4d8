//! Loyalty Points Engine
//!
//! The engine is the durable core of the loyalty points service. It keeps orders, user balances and withdrawals
//! consistent with each other, and it is the only place where an accrual verdict may change an order's status or
//! credit a balance.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You should never need to
//!    access the database directly; use the public API instead. The exception is the data types used in the
//!    database, which are defined in the `db_types` module and are public.
//! 2. The engine public API ([`LedgerApi`]) together with the storage traits ([`LedgerDatabase`],
//!    [`AccountManagement`]). The reconciliation daemon consumes the traits directly; the (external) HTTP layer is
//!    expected to go through `LedgerApi`.
mod api;
pub mod db_types;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{LedgerApi, LedgerApiError, OrderUploadStatus};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{AccountManagement, InsertOrderResult, LedgerDatabase, LedgerError};
