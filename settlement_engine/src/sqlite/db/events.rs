use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cents, Event, EventId, NewEvent},
    traits::StoreError,
};

pub async fn insert_event(event: NewEvent, conn: &mut SqliteConnection) -> Result<Event, StoreError> {
    let now = Utc::now();
    let event: Event = sqlx::query_as(
        r#"
            INSERT INTO events (id, slug, name, created_at, updated_at) VALUES ($1, $2, $3, $4, $4)
            RETURNING *;
        "#,
    )
    .bind(event.id)
    .bind(event.slug)
    .bind(event.name)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Event {} ({}) created", event.id, event.slug);
    Ok(event)
}

pub async fn fetch_event(id: &EventId, conn: &mut SqliteConnection) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM events WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_event_by_slug(slug: &str, conn: &mut SqliteConnection) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM events WHERE slug = $1").bind(slug).fetch_optional(conn).await
}

pub async fn update_price_range(
    id: &EventId,
    min_price: Option<Cents>,
    max_price: Option<Cents>,
    conn: &mut SqliteConnection,
) -> Result<Event, StoreError> {
    let event = sqlx::query_as(
        r#"
            UPDATE events SET min_price = $1, max_price = $2, updated_at = $3 WHERE id = $4
            RETURNING *;
        "#,
    )
    .bind(min_price)
    .bind(max_price)
    .bind(Utc::now())
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| StoreError::EventNotFound(id.clone()))?;
    Ok(event)
}
