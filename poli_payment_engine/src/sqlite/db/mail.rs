use chrono::Utc;
use sqlx::SqliteConnection;

use super::first_row;
use crate::db_types::{EmailMessage, NewEmail};

pub async fn insert_email(email: NewEmail, conn: &mut SqliteConnection) -> Result<EmailMessage, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO email_outbox (event_id, order_id, recipient, subject, body, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(email.event_id)
    .bind(email.order_id)
    .bind(email.recipient)
    .bind(email.subject)
    .bind(email.body)
    .bind(Utc::now())
    .fetch_all(conn)
    .await
    .and_then(first_row)
}

pub async fn fetch_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<EmailMessage>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM email_outbox WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}
