use chrono::Utc;
use sqlx::SqliteConnection;

use super::first_row;
use crate::db_types::{NewTransactionToken, TransactionToken};

pub async fn upsert_token(token: NewTransactionToken, conn: &mut SqliteConnection) -> Result<TransactionToken, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO transaction_tokens (token, gateway_token, event_id, order_code, payment_id, navigate_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (token) DO UPDATE SET
                gateway_token = excluded.gateway_token,
                event_id = excluded.event_id,
                order_code = excluded.order_code,
                payment_id = excluded.payment_id,
                navigate_url = excluded.navigate_url,
                created_at = excluded.created_at,
                consumed_at = NULL
            RETURNING *;
        "#,
    )
    .bind(token.token)
    .bind(token.gateway_token)
    .bind(token.event_id)
    .bind(token.order_code)
    .bind(token.payment_id)
    .bind(token.navigate_url)
    .bind(Utc::now())
    .fetch_all(conn)
    .await
    .and_then(first_row)
}

/// Matches on either the transaction reference or the gateway session token.
pub async fn fetch_token(token: &str, conn: &mut SqliteConnection) -> Result<Option<TransactionToken>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM transaction_tokens WHERE token = $1 OR gateway_token = $1 ORDER BY token = $1 DESC LIMIT 1",
    )
    .bind(token)
    .fetch_optional(conn)
    .await
}

pub async fn consume_token(token: &str, conn: &mut SqliteConnection) -> Result<Option<TransactionToken>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE transaction_tokens SET consumed_at = COALESCE(consumed_at, $1)
            WHERE token = $2 OR gateway_token = $2
            RETURNING *;
        "#,
    )
    .bind(Utc::now())
    .bind(token)
    .fetch_all(conn)
    .await
    .map(|rows| rows.into_iter().next())
}
