use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewOrder, Order, OrderCode, OrderStatus};

/// Inserts the order into the database, returning `false` in the second parameter if the order already exists.
///
/// The insert runs first so that a surrounding transaction takes the write lock before it reads anything.
pub async fn idempotent_insert(order: NewOrder, conn: &mut SqliteConnection) -> Result<(Order, bool), sqlx::Error> {
    let (event_id, code) = (order.event_id, order.code.clone());
    match insert_order(order, &mut *conn).await? {
        Some(order) => {
            debug!("📝️ Order [{}] inserted with id {}", order.code, order.id);
            Ok((order, true))
        },
        None => {
            let existing = fetch_order(event_id, &code, conn).await?.ok_or(sqlx::Error::RowNotFound)?;
            Ok((existing, false))
        },
    }
}

/// Inserts a new order into the database using the given connection. Returns `None` if an order with the same code
/// already exists for the event.
async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        r#"
            INSERT INTO orders (
                event_id,
                code,
                secret,
                status,
                total,
                email,
                locale,
                require_approval,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (event_id, code) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.event_id)
    .bind(order.code)
    .bind(order.secret)
    .bind(order.status)
    .bind(order.total)
    .bind(order.email)
    .bind(order.locale)
    .bind(order.require_approval)
    .bind(now)
    .fetch_all(conn)
    .await
    .map(|rows| rows.into_iter().next())
}

pub async fn fetch_order(event_id: i64, code: &OrderCode, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE event_id = $1 AND code = $2")
        .bind(event_id)
        .bind(code.as_str())
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn update_order_status(
    id: i64,
    status: OrderStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .fetch_all(conn)
        .await
        .map(|rows| rows.into_iter().next())
}
