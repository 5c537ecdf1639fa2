use sqlx::SqliteConnection;

pub async fn fetch_setting(event_id: i64, key: &str, conn: &mut SqliteConnection) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT value FROM settings WHERE event_id = $1 AND key = $2")
        .bind(event_id)
        .bind(key)
        .fetch_optional(conn)
        .await
}

pub async fn save_setting(event_id: i64, key: &str, value: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO settings (event_id, key, value) VALUES ($1, $2, $3)
            ON CONFLICT (event_id, key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(event_id)
    .bind(key)
    .bind(value)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_setting(event_id: i64, key: &str, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM settings WHERE event_id = $1 AND key = $2").bind(event_id).bind(key).execute(conn).await?;
    Ok(())
}
