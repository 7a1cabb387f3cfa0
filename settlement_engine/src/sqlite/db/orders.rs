use log::debug;
use sqlx::SqliteConnection;

use crate::db_types::{EventId, NewOrder, Order, UserId};

/// Inserts the order unless one already exists with the same `external_ref`, in which case `None` is returned and
/// nothing is written.
///
/// This is a write statement, so when it is the first statement of a transaction, the transaction takes the database
/// write lock immediately. Concurrent settlements for the same reference therefore serialise here, and the loser sees
/// the winner's row.
pub async fn insert_order_if_absent(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
            INSERT INTO orders (
                user_id,
                event_id,
                external_ref,
                quantity,
                subtotal,
                fees,
                tax,
                total,
                currency,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (external_ref) DO NOTHING
            RETURNING *;
        "#,
    )
    .bind(order.user_id.as_str())
    .bind(order.event_id.as_str())
    .bind(order.external_ref.as_str())
    .bind(order.quantity)
    .bind(order.subtotal)
    .bind(order.fees)
    .bind(order.tax)
    .bind(order.total)
    .bind(order.currency.as_str())
    .bind(order.created_at)
    .fetch_optional(conn)
    .await?;
    if let Some(o) = &order {
        debug!("🗃️ Order #{} inserted for reference {}", o.id, o.external_ref);
    }
    Ok(order)
}

pub async fn fetch_order_by_external_ref(
    external_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE external_ref = $1").bind(external_ref).fetch_optional(conn).await
}

pub async fn fetch_order_by_alias(alias: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
            SELECT orders.* FROM orders
            JOIN order_aliases ON order_aliases.order_id = orders.id
            WHERE order_aliases.external_ref = $1
        "#,
    )
    .bind(alias)
    .fetch_optional(conn)
    .await
}

/// Records `alias` as another reference for `order_id`. Returns `false` if the alias was already recorded.
pub async fn insert_order_alias(alias: &str, order_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO order_aliases (external_ref, order_id, created_at) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(alias)
    .bind(order_id)
    .bind(chrono::Utc::now())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns the most recently inserted order for the user and event.
pub async fn fetch_latest_order_for_user_event(
    user_id: &UserId,
    event_id: &EventId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 AND event_id = $2 ORDER BY id DESC LIMIT 1")
        .bind(user_id.as_str())
        .bind(event_id.as_str())
        .fetch_optional(conn)
        .await
}
