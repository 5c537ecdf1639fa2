use log::debug;
use sqlx::SqliteConnection;

use super::first_row;
use crate::db_types::{Event, NewEvent};

pub async fn upsert_event(event: NewEvent, conn: &mut SqliteConnection) -> Result<Event, sqlx::Error> {
    let event: Event = sqlx::query_as(
        r#"
            INSERT INTO events (organizer, slug, name, currency) VALUES ($1, $2, $3, $4)
            ON CONFLICT (organizer, slug) DO UPDATE SET name = excluded.name, currency = excluded.currency
            RETURNING *;
        "#,
    )
    .bind(event.organizer)
    .bind(event.slug)
    .bind(event.name)
    .bind(event.currency)
    .fetch_all(conn)
    .await
    .and_then(first_row)?;
    debug!("📝️ Event {}/{} stored with id {}", event.organizer, event.slug, event.id);
    Ok(event)
}

pub async fn fetch_event(organizer: &str, slug: &str, conn: &mut SqliteConnection) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM events WHERE organizer = $1 AND slug = $2")
        .bind(organizer)
        .bind(slug)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_event_by_id(id: i64, conn: &mut SqliteConnection) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM events WHERE id = $1").bind(id).fetch_optional(conn).await
}
