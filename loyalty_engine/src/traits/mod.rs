//! Storage traits for the loyalty engine.
//!
//! Backends implement [`AccountManagement`] and [`LedgerDatabase`]; everything above these traits (the
//! [`crate::LedgerApi`], the reconciliation daemon) is backend-agnostic.
mod ledger_database;

pub use ledger_database::{AccountManagement, InsertOrderResult, LedgerDatabase, LedgerError};
