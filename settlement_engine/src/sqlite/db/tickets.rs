use chrono::Utc;
use sqlx::SqliteConnection;

use crate::db_types::{Order, Ticket, TicketStatus, TicketType, User};

/// Issues a single ticket for the order. Not atomic on its own; embed it in the settlement transaction.
pub async fn issue_ticket(
    order: &Order,
    ticket_type: &TicketType,
    holder: &User,
    conn: &mut SqliteConnection,
) -> Result<Ticket, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO tickets (order_id, ticket_type_id, price, holder_name, holder_email, status, issued_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.id)
    .bind(ticket_type.id.as_str())
    .bind(ticket_type.price)
    .bind(holder.name.as_str())
    .bind(holder.email.as_str())
    .bind(TicketStatus::Valid)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

pub async fn fetch_tickets_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Ticket>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tickets WHERE order_id = $1 ORDER BY id").bind(order_id).fetch_all(conn).await
}

pub async fn count_tickets_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM tickets WHERE order_id = $1").bind(order_id).fetch_one(conn).await
}
