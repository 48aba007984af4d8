use std::fmt::Debug;

use log::*;
use lps_common::{luhn_valid, Points};

use crate::{
    db_types::{Balance, Order, OrderNumber, User, Withdrawal},
    traits::{InsertOrderResult, LedgerDatabase},
    LedgerApiError,
};

/// `LedgerApi` is the primary API for the user-facing flows: order intake, order and withdrawal listings, and
/// spending points. The (external) HTTP layer is expected to consume this API rather than the storage traits.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerDatabase
{
    /// Registers a new user. The password must already be hashed; the engine never sees plaintext credentials.
    pub async fn register_user(&self, login: &str, password_hash: &str) -> Result<i64, LedgerApiError> {
        let id = self.db.create_user(login, password_hash).await?;
        Ok(id)
    }

    pub async fn fetch_user_by_login(&self, login: &str) -> Result<Option<User>, LedgerApiError> {
        let user = self.db.fetch_user_by_login(login).await?;
        Ok(user)
    }

    /// Submits an order number for accrual. The number must pass the Luhn check; beyond that the order starts out
    /// as `NEW` and the reconciliation worker takes it from there.
    ///
    /// Re-uploading a number is not an error: the result distinguishes a fresh insert from a repeat by the same
    /// user and a number claimed by someone else.
    pub async fn upload_order(&self, user_id: i64, number: &str) -> Result<OrderUploadStatus, LedgerApiError> {
        if !luhn_valid(number) {
            return Err(LedgerApiError::InvalidOrderNumber(number.to_string()));
        }
        let number = OrderNumber::from(number);
        let status = match self.db.insert_order(user_id, &number).await? {
            InsertOrderResult::Inserted(order) => {
                debug!("📦️ Order [{}] accepted for user #{user_id}", order.number);
                OrderUploadStatus::Accepted(order)
            },
            InsertOrderResult::AlreadyExists(order) if order.user_id == user_id => {
                OrderUploadStatus::AlreadyUploaded(order)
            },
            InsertOrderResult::AlreadyExists(order) => {
                info!("📦️ Order [{}] was already claimed by another user", order.number);
                OrderUploadStatus::AlreadyUploadedByAnother
            },
        };
        Ok(status)
    }

    /// All orders the user has uploaded, newest first.
    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, LedgerApiError> {
        let orders = self.db.orders_for_user(user_id).await?;
        Ok(orders)
    }

    pub async fn balance_for_user(&self, user_id: i64) -> Result<Balance, LedgerApiError> {
        let balance = self.db.balance_for_user(user_id).await?;
        Ok(balance)
    }

    pub async fn withdrawals_for_user(&self, user_id: i64) -> Result<Vec<Withdrawal>, LedgerApiError> {
        let withdrawals = self.db.withdrawals_for_user(user_id).await?;
        Ok(withdrawals)
    }

    /// Spends points against a (possibly external) order number. The target must pass the Luhn check and the
    /// amount must be positive; the debit and the withdrawal record are applied as one unit, and an overdraft is
    /// rejected without any partial effect.
    pub async fn withdraw(
        &self,
        user_id: i64,
        order_number: &str,
        amount: Points,
    ) -> Result<Withdrawal, LedgerApiError> {
        if !luhn_valid(order_number) {
            return Err(LedgerApiError::InvalidOrderNumber(order_number.to_string()));
        }
        if !amount.is_positive() {
            return Err(LedgerApiError::InvalidAmount(amount));
        }
        let number = OrderNumber::from(order_number);
        let withdrawal = self.db.create_withdrawal(user_id, &number, amount).await?;
        debug!("📦️ Withdrawal of {amount} against order [{number}] recorded for user #{user_id}");
        Ok(withdrawal)
    }
}

/// The outcome of an order upload.
#[derive(Debug, Clone)]
pub enum OrderUploadStatus {
    /// The order is new and has been queued for accrual.
    Accepted(Order),
    /// The same user uploaded this number before; the stored order is returned.
    AlreadyUploaded(Order),
    /// The number belongs to a different user's order.
    AlreadyUploadedByAnother,
}
