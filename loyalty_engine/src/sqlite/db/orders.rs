use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Order, OrderNumber, Verdict},
    traits::{InsertOrderResult, LedgerError},
};

/// Inserts the order into the database with status `NEW`, returning the existing row instead if the number was
/// already uploaded.
pub async fn idempotent_insert(
    user_id: i64,
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<InsertOrderResult, LedgerError> {
    let inserted = match fetch_order_by_number(number, conn).await? {
        Some(order) => InsertOrderResult::AlreadyExists(order),
        None => {
            let order = insert_order(user_id, number, conn).await?;
            debug!("📝️ Order [{}] inserted with id {} for user #{user_id}", order.number, order.id);
            InsertOrderResult::Inserted(order)
        },
    };
    Ok(inserted)
}

/// Inserts a new order using the given connection. This is not atomic. You can embed this call inside a
/// transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
async fn insert_order(user_id: i64, number: &OrderNumber, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (number, user_id, status) VALUES ($1, $2, 'NEW')
            RETURNING *;
        "#,
    )
    .bind(number.as_str())
    .bind(user_id)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

/// Returns the entry in the orders table for the corresponding order number.
pub async fn fetch_order_by_number(
    number: &OrderNumber,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE number = $1").bind(number.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches all orders for the given user, newest first.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches every order that has not reached a terminal status, oldest first. This is the reconciliation worker's
/// discovery query.
pub async fn fetch_unaccrued(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE status IN ('NEW', 'PROCESSING') ORDER BY id ASC")
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Writes the verdict's status and accrual amount to the order row, guarded by the order still being unaccrued.
/// Returns `None` when the guard did not match, i.e. the order is already terminal (or does not exist); the caller
/// decides which of the two it is. The guard is what makes verdict application replay-safe: a terminal order can
/// never transition again, so the credit tied to the `PROCESSED` transition can happen at most once.
pub(crate) async fn settle_order(verdict: &Verdict, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET status = $1, accrual = $2
            WHERE id = $3 AND status IN ('NEW', 'PROCESSING')
            RETURNING *;
        "#,
    )
    .bind(verdict.status.order_status().to_string())
    .bind(verdict.accrual.map(|a| a.value()))
    .bind(verdict.order_id)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
