use lps_common::Points;
use thiserror::Error;

use crate::db_types::{Balance, Order, OrderNumber, User, Verdict, Withdrawal};

/// User records and read-side balance queries.
#[allow(async_fn_in_trait)]
pub trait AccountManagement: Clone {
    /// Creates a user with the given login and (already hashed) password. Fails with
    /// [`LedgerError::UserAlreadyExists`] when the login is taken.
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, LedgerError>;

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, LedgerError>;

    /// The user's spendable balance and lifetime withdrawn total.
    async fn balance_for_user(&self, user_id: i64) -> Result<Balance, LedgerError>;

    /// All withdrawals for the user, newest first.
    async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerError>;
}

/// The highest level of behaviour for backends supporting the loyalty engine: order intake, the reconciliation
/// worker's discovery and verdict application, and the withdrawal flow.
#[allow(async_fn_in_trait)]
pub trait LedgerDatabase: Clone + AccountManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Stores a new order in status `NEW`. This call is idempotent: re-submitting an existing number returns the
    /// stored order (with its current owner) instead of inserting.
    async fn insert_order(&self, user_id: i64, number: &OrderNumber) -> Result<InsertOrderResult, LedgerError>;

    /// All orders uploaded by the user, newest first.
    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerError>;

    /// All orders that have not reached a terminal status (`NEW` or `PROCESSING`), oldest first. Safe to call
    /// concurrently with [`Self::apply_verdict`].
    async fn list_unaccrued(&self) -> Result<Vec<Order>, LedgerError>;

    /// Applies an accrual verdict as a single atomic unit: the order's status and accrual amount are updated, and,
    /// if and only if the order was not already terminal and the verdict is `PROCESSED`, the owner's balance is
    /// credited by the accrual amount. Re-applying a verdict to an already-terminal order is a balance no-op and
    /// returns the stored row, so a replayed verdict can never double-credit.
    ///
    /// Fails with [`LedgerError::OrderNotFound`] if the order vanished, and with
    /// [`LedgerError::InsufficientBalance`] only if a concurrent debit races the credit, which the persistence
    /// layer rejects rather than letting the balance go negative.
    async fn apply_verdict(&self, verdict: &Verdict) -> Result<Order, LedgerError>;

    /// Records a withdrawal and debits the user's balance in one transaction. Nothing is applied when the debit
    /// would drive the balance negative; the call fails with [`LedgerError::InsufficientBalance`] instead.
    async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &OrderNumber,
        amount: Points,
    ) -> Result<Withdrawal, LedgerError>;
}

/// The result of an order insertion attempt.
#[derive(Debug, Clone)]
pub enum InsertOrderResult {
    /// The order was inserted with status `NEW`.
    Inserted(Order),
    /// An order with this number already exists; the stored row is returned untouched.
    AlreadyExists(Order),
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("A user with login {0} already exists")]
    UserAlreadyExists(String),
    #[error("The requested user id {0} does not exist")]
    UserNotFound(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("The mutation would drive the balance of user {0} negative")]
    InsufficientBalance(i64),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}
