use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::OrderLogEntry;

pub async fn insert_entry(
    order_id: i64,
    action_type: &str,
    data: &str,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO order_log (order_id, action_type, data, created_at) VALUES ($1, $2, $3, $4)")
        .bind(order_id)
        .bind(action_type)
        .bind(data)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_entries(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderLogEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_log WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}
