use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{Amount, NewPayment, OrderPayment, PaymentState};

/// Inserts the payment, unless a payment with the same `local_id` already exists for the order, in which case the
/// existing record is returned.
///
/// The insert runs first so that a surrounding transaction takes the write lock before it reads anything.
pub async fn idempotent_insert(
    order_id: i64,
    payment: NewPayment,
    conn: &mut SqliteConnection,
) -> Result<OrderPayment, sqlx::Error> {
    let local_id = payment.local_id;
    let inserted: Option<OrderPayment> = sqlx::query_as(
        r#"
            INSERT INTO payments (order_id, local_id, provider, amount, state, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            ON CONFLICT (order_id, local_id) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(local_id)
    .bind(payment.provider)
    .bind(payment.amount)
    .bind(payment.state)
    .bind(Utc::now())
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .next();
    match inserted {
        Some(payment) => {
            debug!("📝️ Payment {}-P-{} inserted with id {}", order_id, payment.local_id, payment.id);
            Ok(payment)
        },
        None => sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 AND local_id = $2")
            .bind(order_id)
            .bind(local_id)
            .fetch_one(conn)
            .await,
    }
}

pub async fn fetch_payment(id: i64, conn: &mut SqliteConnection) -> Result<Option<OrderPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_payments_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderPayment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE order_id = $1 ORDER BY local_id").bind(order_id).fetch_all(conn).await
}

pub async fn update_info(id: i64, info: &str, conn: &mut SqliteConnection) -> Result<Option<OrderPayment>, sqlx::Error> {
    sqlx::query_as("UPDATE payments SET info = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(info)
        .bind(Utc::now())
        .bind(id)
        .fetch_all(conn)
        .await
        .map(|rows| rows.into_iter().next())
}

pub async fn update_state(
    id: i64,
    state: PaymentState,
    conn: &mut SqliteConnection,
) -> Result<Option<OrderPayment>, sqlx::Error> {
    sqlx::query_as("UPDATE payments SET state = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(state)
        .bind(Utc::now())
        .bind(id)
        .fetch_all(conn)
        .await
        .map(|rows| rows.into_iter().next())
}

/// Sum of all confirmed payments for the order.
pub async fn confirmed_total(order_id: i64, conn: &mut SqliteConnection) -> Result<Amount, sqlx::Error> {
    let total: Option<i64> = sqlx::query_scalar("SELECT SUM(amount) FROM payments WHERE order_id = $1 AND state = $2")
        .bind(order_id)
        .bind(PaymentState::Confirmed)
        .fetch_one(conn)
        .await?;
    Ok(Amount::from_cents(total.unwrap_or(0)))
}
