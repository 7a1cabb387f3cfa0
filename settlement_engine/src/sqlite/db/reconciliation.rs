use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{NewUnresolvedNotification, UnresolvedNotification};

pub async fn insert_unresolved(note: NewUnresolvedNotification, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
            INSERT INTO unresolved_notifications (external_ref, kind, reason, payload, attempts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id;
        "#,
    )
    .bind(note.external_ref.as_str())
    .bind(note.kind)
    .bind(note.reason)
    .bind(note.payload)
    .bind(note.attempts)
    .bind(chrono::Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Notification for {} added to the reconciliation list as #{id}", note.external_ref);
    Ok(id)
}

pub async fn fetch_unresolved(conn: &mut SqliteConnection) -> Result<Vec<UnresolvedNotification>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM unresolved_notifications ORDER BY id").fetch_all(conn).await
}
