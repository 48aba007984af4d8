use lps_common::Points;
use sqlx::SqliteConnection;

use crate::db_types::{OrderNumber, Withdrawal};

/// Inserts a withdrawal row. This is not atomic with the balance debit on its own; [`insert_withdrawal`] is meant
/// to be composed with [`super::users::debit_balance`] inside one transaction.
pub(crate) async fn insert_withdrawal(
    user_id: i64,
    order_number: &OrderNumber,
    amount: Points,
    conn: &mut SqliteConnection,
) -> Result<Withdrawal, sqlx::Error> {
    let withdrawal = sqlx::query_as(
        r#"
            INSERT INTO withdrawals (user_id, order_number, amount) VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(order_number.as_str())
    .bind(amount.value())
    .fetch_one(conn)
    .await?;
    Ok(withdrawal)
}

/// Fetches all withdrawals for the given user, newest first.
pub async fn fetch_withdrawals_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let withdrawals = sqlx::query_as("SELECT * FROM withdrawals WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(withdrawals)
}
