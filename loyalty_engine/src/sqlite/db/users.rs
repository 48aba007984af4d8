use lps_common::Points;
use sqlx::SqliteConnection;

use super::{is_check_violation, is_unique_violation};
use crate::{
    db_types::{Balance, User},
    traits::LedgerError,
};

pub async fn create_user(login: &str, password_hash: &str, conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let result = sqlx::query("INSERT INTO users (login, password_hash) VALUES ($1, $2)")
        .bind(login)
        .bind(password_hash)
        .execute(conn)
        .await;
    match result {
        Ok(r) => Ok(r.last_insert_rowid()),
        Err(e) if is_unique_violation(&e) => Err(LedgerError::UserAlreadyExists(login.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user_by_login(login: &str, conn: &mut SqliteConnection) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as("SELECT * FROM users WHERE login = $1").bind(login).fetch_optional(conn).await?;
    Ok(user)
}

/// The user's spendable balance together with the lifetime withdrawn total.
pub async fn fetch_balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Balance, LedgerError> {
    let balance: Option<Balance> = sqlx::query_as(
        r#"
            SELECT u.balance AS current,
                   COALESCE((SELECT SUM(amount) FROM withdrawals WHERE user_id = u.id), 0) AS withdrawn
            FROM users u WHERE u.id = $1;
        "#,
    )
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    balance.ok_or(LedgerError::UserNotFound(user_id))
}

/// Adds the accrual amount to the user's spendable balance.
pub(crate) async fn credit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE users SET balance = balance + $1 WHERE id = $2")
        .bind(amount.value())
        .bind(user_id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::UserNotFound(user_id));
    }
    Ok(())
}

/// Subtracts the withdrawal amount from the user's spendable balance. The database's check constraint is the
/// enforcement point for balance non-negativity; a violation maps to [`LedgerError::InsufficientBalance`] and the
/// surrounding transaction rolls back.
pub(crate) async fn debit_balance(
    user_id: i64,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<(), LedgerError> {
    let result = sqlx::query("UPDATE users SET balance = balance - $1 WHERE id = $2")
        .bind(amount.value())
        .bind(user_id)
        .execute(conn)
        .await;
    match result {
        Ok(r) if r.rows_affected() == 0 => Err(LedgerError::UserNotFound(user_id)),
        Ok(_) => Ok(()),
        Err(e) if is_check_violation(&e) => Err(LedgerError::InsufficientBalance(user_id)),
        Err(e) => Err(e.into()),
    }
}
