use chrono::Utc;
use log::{debug, trace, warn};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Cents, EventId, InventoryMode, NewTicketType, TicketType, TicketTypeId},
    traits::{InventoryDecrement, StoreError},
};

pub async fn insert_ticket_type(
    ticket_type: NewTicketType,
    conn: &mut SqliteConnection,
) -> Result<TicketType, StoreError> {
    if ticket_type.quantity < 0 {
        return Err(StoreError::InvalidInput(format!("Ticket quantity cannot be negative: {}", ticket_type.quantity)));
    }
    let now = Utc::now();
    let ticket_type: TicketType = sqlx::query_as(
        r#"
            INSERT INTO ticket_types (
                id,
                event_id,
                name,
                price,
                fee,
                total_quantity,
                available_quantity,
                external_product_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $8)
            RETURNING *;
        "#,
    )
    .bind(ticket_type.id)
    .bind(ticket_type.event_id)
    .bind(ticket_type.name)
    .bind(ticket_type.price)
    .bind(ticket_type.fee)
    .bind(ticket_type.quantity)
    .bind(ticket_type.external_product_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Ticket type {} created with {} tickets", ticket_type.id, ticket_type.total_quantity);
    Ok(ticket_type)
}

pub async fn fetch_ticket_type(
    id: &TicketTypeId,
    conn: &mut SqliteConnection,
) -> Result<Option<TicketType>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ticket_types WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_ticket_type_for_product(
    product_ref: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<TicketType>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ticket_types WHERE external_product_id = $1")
        .bind(product_ref)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_ticket_types_for_event(
    event_id: &EventId,
    conn: &mut SqliteConnection,
) -> Result<Vec<TicketType>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ticket_types WHERE event_id = $1 ORDER BY id")
        .bind(event_id.as_str())
        .fetch_all(conn)
        .await
}

pub async fn update_price(
    id: &TicketTypeId,
    price: Cents,
    fee: Cents,
    conn: &mut SqliteConnection,
) -> Result<TicketType, StoreError> {
    if price.is_negative() || fee.is_negative() {
        return Err(StoreError::InvalidInput(format!("Prices cannot be negative. Price: {price}, fee: {fee}")));
    }
    sqlx::query_as("UPDATE ticket_types SET price = $1, fee = $2, updated_at = $3 WHERE id = $4 RETURNING *")
        .bind(price)
        .bind(fee)
        .bind(Utc::now())
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| StoreError::TicketTypeNotFound(id.clone()))
}

pub async fn set_active(id: &TicketTypeId, active: bool, conn: &mut SqliteConnection) -> Result<TicketType, StoreError> {
    sqlx::query_as("UPDATE ticket_types SET active = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(active)
        .bind(Utc::now())
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| StoreError::TicketTypeNotFound(id.clone()))
}

pub async fn set_external_product(
    id: &TicketTypeId,
    product_ref: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<TicketType, StoreError> {
    sqlx::query_as("UPDATE ticket_types SET external_product_id = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(product_ref)
        .bind(Utc::now())
        .bind(id.as_str())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| StoreError::TicketTypeNotFound(id.clone()))
}

pub async fn restock(id: &TicketTypeId, additional: i64, conn: &mut SqliteConnection) -> Result<TicketType, StoreError> {
    if additional <= 0 {
        return Err(StoreError::InvalidInput(format!("Restock quantity must be positive, not {additional}")));
    }
    sqlx::query_as(
        r#"
            UPDATE ticket_types SET
                total_quantity = total_quantity + $1,
                available_quantity = available_quantity + $1,
                updated_at = $2
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(additional)
    .bind(Utc::now())
    .bind(id.as_str())
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| StoreError::TicketTypeNotFound(id.clone()))
}

/// Takes `quantity` tickets out of the ticket type's available stock.
///
/// In [`InventoryMode::Clamp`] mode the available quantity is floored at zero, so the decrement always succeeds. In
/// [`InventoryMode::Strict`] mode, an [`StoreError::InsufficientInventory`] error is returned if fewer than `quantity`
/// tickets remain. The caller is expected to roll back the surrounding transaction in that case.
pub async fn decrement_available(
    id: &TicketTypeId,
    quantity: i64,
    mode: InventoryMode,
    conn: &mut SqliteConnection,
) -> Result<InventoryDecrement, StoreError> {
    let before: i64 = sqlx::query_scalar("SELECT available_quantity FROM ticket_types WHERE id = $1")
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::TicketTypeNotFound(id.clone()))?;
    let after: Option<i64> = match mode {
        InventoryMode::Strict => {
            sqlx::query_scalar(
                r#"
                UPDATE ticket_types SET available_quantity = available_quantity - $1, updated_at = $2
                WHERE id = $3 AND available_quantity >= $1
                RETURNING available_quantity;
            "#,
            )
            .bind(quantity)
            .bind(Utc::now())
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await?
        },
        InventoryMode::Clamp => {
            sqlx::query_scalar(
                r#"
                UPDATE ticket_types SET available_quantity = MAX(available_quantity - $1, 0), updated_at = $2
                WHERE id = $3
                RETURNING available_quantity;
            "#,
            )
            .bind(quantity)
            .bind(Utc::now())
            .bind(id.as_str())
            .fetch_optional(&mut *conn)
            .await?
        },
    };
    let after = after.ok_or_else(|| StoreError::InsufficientInventory {
        ticket_type: id.clone(),
        requested: quantity,
        available: before,
    })?;
    let decrement = InventoryDecrement { requested: quantity, before, after };
    if decrement.oversold() {
        warn!(
            "🗃️ Ticket type {id} was oversold. {quantity} tickets were issued but only {before} were available. \
             Available quantity has been clamped to zero."
        );
    } else {
        trace!("🗃️ Ticket type {id} available quantity {before} -> {after}");
    }
    Ok(decrement)
}
