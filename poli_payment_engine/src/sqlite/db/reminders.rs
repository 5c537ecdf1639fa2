use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::first_row;
use crate::db_types::{OrderCode, ReminderStatus, ScheduledReminder};

pub async fn insert_reminder(
    event_id: i64,
    order_code: &OrderCode,
    run_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<ScheduledReminder, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as(
        r#"
            INSERT INTO reminders (event_id, order_code, run_at, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *;
        "#,
    )
    .bind(event_id)
    .bind(order_code.as_str())
    .bind(run_at)
    .bind(ReminderStatus::Scheduled)
    .bind(now)
    .fetch_all(conn)
    .await
    .and_then(first_row)
}

pub async fn fetch_due(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<ScheduledReminder>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM reminders WHERE status = $1 AND julianday(run_at) <= julianday($2) ORDER BY run_at, id",
    )
    .bind(ReminderStatus::Scheduled)
    .bind(now)
    .fetch_all(conn)
    .await
}

pub async fn update_status(id: i64, status: ReminderStatus, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE reminders SET status = $1, updated_at = $2 WHERE id = $3")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Marks every still scheduled reminder for the order as skipped. Returns the number of reminders withdrawn.
pub async fn skip_for_order(event_id: i64, order_code: &OrderCode, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE reminders SET status = $1, updated_at = $2 WHERE event_id = $3 AND order_code = $4 AND status = $5",
    )
    .bind(ReminderStatus::Skipped)
    .bind(Utc::now())
    .bind(event_id)
    .bind(order_code.as_str())
    .bind(ReminderStatus::Scheduled)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
