//! `SqliteDatabase` is a concrete implementation of a loyalty engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements the traits defined in the [`crate::traits`] module.
use std::fmt::Debug;

use log::*;
use lps_common::Points;
use sqlx::SqlitePool;

use super::db::{db_url, new_pool, orders, users, withdrawals};
use crate::{
    db_types::{Balance, Order, OrderNumber, OrderStatusType, User, Verdict, Withdrawal},
    traits::{AccountManagement, InsertOrderResult, LedgerDatabase, LedgerError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool against the database indicated by the `LPS_DATABASE_URL` environment
    /// variable, or the default URL if it is not set.
    pub async fn new(max_connections: u32) -> Result<Self, LedgerError> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, LedgerError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Embedded migrations, so the binary carries everything it needs.
    pub async fn run_migrations(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./migrations").run(&self.pool).await.map_err(|e| LedgerError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl AccountManagement for SqliteDatabase {
    async fn create_user(&self, login: &str, password_hash: &str) -> Result<i64, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let id = users::create_user(login, password_hash, &mut conn).await?;
        debug!("🗃️ User {login} created with id {id}");
        Ok(id)
    }

    async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_login(login, &mut conn).await?;
        Ok(user)
    }

    async fn balance_for_user(&self, user_id: i64) -> Result<Balance, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_balance(user_id, &mut conn).await
    }

    async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let withdrawals = withdrawals::fetch_withdrawals_for_user(user_id, &mut conn).await?;
        Ok(withdrawals)
    }
}

impl LedgerDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, user_id: i64, number: &OrderNumber) -> Result<InsertOrderResult, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        orders::idempotent_insert(user_id, number, &mut conn).await
    }

    async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(orders)
    }

    async fn list_unaccrued(&self) -> Result<Vec<Order>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_unaccrued(&mut conn).await?;
        Ok(orders)
    }

    /// Takes a verdict, and in a single atomic transaction,
    /// * writes the verdict's status and accrual to the order row, guarded by the order still being unaccrued,
    /// * credits the owner's balance when, and only when, that guarded update moved the order into `PROCESSED`.
    ///
    /// A verdict replayed against an already-terminal order leaves the balance untouched and returns the stored
    /// row.
    async fn apply_verdict(&self, verdict: &Verdict) -> Result<Order, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::settle_order(verdict, &mut tx).await? {
            Some(order) => {
                if order.status == OrderStatusType::Processed {
                    let amount = verdict.accrual.unwrap_or_default();
                    users::credit_balance(order.user_id, amount, &mut tx).await?;
                    debug!("🗃️ Order [{}] processed. {amount} credited to user #{}", order.number, order.user_id);
                }
                order
            },
            None => {
                // The guard did not match: the order is either gone or already terminal.
                let existing = orders::fetch_order_by_id(verdict.order_id, &mut tx)
                    .await?
                    .ok_or_else(|| LedgerError::OrderNotFound(verdict.number.clone()))?;
                debug!("🗃️ Order [{}] is already {}. Verdict replay ignored", existing.number, existing.status);
                existing
            },
        };
        tx.commit().await?;
        Ok(order)
    }

    /// Records the withdrawal and debits the balance together or not at all. The balance check constraint makes
    /// an overdraft roll the whole transaction back.
    async fn create_withdrawal(
        &self,
        user_id: i64,
        order_number: &OrderNumber,
        amount: Points,
    ) -> Result<Withdrawal, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let withdrawal = withdrawals::insert_withdrawal(user_id, order_number, amount, &mut tx).await?;
        users::debit_balance(user_id, amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ User #{user_id} withdrew {amount} against order [{order_number}]");
        Ok(withdrawal)
    }
}
