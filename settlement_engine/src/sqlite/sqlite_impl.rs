//! `SqliteDatabase` is a concrete implementation of a settlement engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the storage traits defined in the [`traits`]
//! module.
//!
//! [`traits`]: crate::traits
use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{db_url, events, new_pool, orders, reconciliation, ticket_types, tickets, users};
use crate::{
    db_types::{
        Cents,
        Event,
        EventId,
        InventoryMode,
        NewEvent,
        NewOrder,
        NewTicketType,
        NewUnresolvedNotification,
        NewUser,
        Order,
        Ticket,
        TicketType,
        TicketTypeId,
        UnresolvedNotification,
        User,
        UserId,
    },
    traits::{
        InsertSettlementResult,
        InventoryManagement,
        SettledOrder,
        SettlementLedger,
        StoreError,
        UserDirectory,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_event(&self, id: &EventId) -> Result<Option<Event>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(events::fetch_event(id, &mut conn).await?)
    }

    async fn fetch_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(events::fetch_event_by_slug(slug, &mut conn).await?)
    }

    async fn fetch_ticket_type(&self, id: &TicketTypeId) -> Result<Option<TicketType>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ticket_types::fetch_ticket_type(id, &mut conn).await?)
    }

    async fn fetch_ticket_type_for_product(&self, product_ref: &str) -> Result<Option<TicketType>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ticket_types::fetch_ticket_type_for_product(product_ref, &mut conn).await?)
    }

    async fn fetch_ticket_types_for_event(&self, event_id: &EventId) -> Result<Vec<TicketType>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(ticket_types::fetch_ticket_types_for_event(event_id, &mut conn).await?)
    }

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = events::insert_event(event, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn insert_ticket_type(&self, ticket_type: NewTicketType) -> Result<TicketType, StoreError> {
        let mut tx = self.pool.begin().await?;
        if events::fetch_event(&ticket_type.event_id, &mut tx).await?.is_none() {
            return Err(StoreError::EventNotFound(ticket_type.event_id));
        }
        let result = ticket_types::insert_ticket_type(ticket_type, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn update_ticket_type_price(
        &self,
        id: &TicketTypeId,
        price: Cents,
        fee: Cents,
    ) -> Result<TicketType, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = ticket_types::update_price(id, price, fee, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn set_ticket_type_active(&self, id: &TicketTypeId, active: bool) -> Result<TicketType, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = ticket_types::set_active(id, active, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn restock_ticket_type(&self, id: &TicketTypeId, additional: i64) -> Result<TicketType, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = ticket_types::restock(id, additional, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn set_ticket_type_product(
        &self,
        id: &TicketTypeId,
        product_ref: Option<&str>,
    ) -> Result<TicketType, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = ticket_types::set_external_product(id, product_ref, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }

    async fn update_event_price_range(
        &self,
        id: &EventId,
        min_price: Option<Cents>,
        max_price: Option<Cents>,
    ) -> Result<Event, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = events::update_price_range(id, min_price, max_price, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

impl SettlementLedger for SqliteDatabase {
    async fn fetch_order_by_external_ref(&self, external_ref: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_external_ref(external_ref, &mut conn).await?)
    }

    async fn fetch_order_by_alias(&self, alias: &str) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_alias(alias, &mut conn).await?)
    }

    async fn record_reference_alias(&self, alias: &str, order_id: i64) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let added = orders::insert_order_alias(alias, order_id, &mut tx).await?;
        tx.commit().await?;
        if added {
            debug!("🗃️ Reference {alias} recorded as an alias of order #{order_id}");
        }
        Ok(())
    }

    async fn fetch_latest_order_for_user_event(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_latest_order_for_user_event(user_id, event_id, &mut conn).await?)
    }

    async fn fetch_tickets_for_order(&self, order_id: i64) -> Result<Vec<Ticket>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(tickets::fetch_tickets_for_order(order_id, &mut conn).await?)
    }

    /// The order insert is the first statement in the transaction, so the write lock is taken before anything else is
    /// read. If the reference already has an order, the transaction is rolled back without writing anything and the
    /// existing order is returned.
    ///
    /// Ticket writes are checked against the requested quantity before inventory is touched. A shortfall or a failed
    /// insert rolls everything back and is reported as [`StoreError::PartialWrite`].
    async fn insert_settlement(
        &self,
        order: NewOrder,
        holder: &User,
        ticket_type: &TicketType,
        mode: InventoryMode,
    ) -> Result<InsertSettlementResult, StoreError> {
        let mut tx = self.pool.begin().await?;
        let order = match orders::insert_order_if_absent(&order, &mut tx).await? {
            Some(o) => o,
            None => {
                tx.rollback().await?;
                debug!("🗃️ Reference {} has already been settled. Nothing written.", order.external_ref);
                let mut conn = self.pool.acquire().await?;
                let existing = orders::fetch_order_by_external_ref(&order.external_ref, &mut conn).await?.ok_or_else(
                    || StoreError::DatabaseError(format!("Order for {} vanished after a conflict", order.external_ref)),
                )?;
                return Ok(InsertSettlementResult::AlreadyExists(existing));
            },
        };
        let expected = order.quantity;
        let mut issued = Vec::with_capacity(usize::try_from(expected).unwrap_or_default());
        for _ in 0..expected {
            match tickets::issue_ticket(&order, ticket_type, holder, &mut tx).await {
                Ok(ticket) => issued.push(ticket),
                Err(e) => {
                    let written = tickets::count_tickets_for_order(order.id, &mut tx).await.unwrap_or(0);
                    rollback_quietly(tx, &order.external_ref).await;
                    return Err(StoreError::PartialWrite {
                        external_ref: order.external_ref,
                        expected,
                        written,
                        reason: e.to_string(),
                    });
                },
            }
        }
        let written = tickets::count_tickets_for_order(order.id, &mut tx).await?;
        if written != expected {
            rollback_quietly(tx, &order.external_ref).await;
            return Err(StoreError::PartialWrite {
                external_ref: order.external_ref,
                expected,
                written,
                reason: "Ticket count does not match the order quantity".to_string(),
            });
        }
        let inventory = match ticket_types::decrement_available(&ticket_type.id, expected, mode, &mut tx).await {
            Ok(d) => d,
            Err(e) => {
                rollback_quietly(tx, &order.external_ref).await;
                return Err(e);
            },
        };
        tx.commit().await?;
        info!("🗃️ Order #{} for {} committed with {written} tickets", order.id, order.external_ref);
        Ok(InsertSettlementResult::Inserted(SettledOrder { order, tickets: issued, inventory }))
    }

    async fn record_unresolved_notification(&self, note: NewUnresolvedNotification) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let id = reconciliation::insert_unresolved(note, &mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn fetch_unresolved_notifications(&self) -> Result<Vec<UnresolvedNotification>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(reconciliation::fetch_unresolved(&mut conn).await?)
    }
}

impl UserDirectory for SqliteDatabase {
    async fn fetch_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user(id, &mut conn).await?)
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_by_email(email, &mut conn).await?)
    }

    async fn fetch_user_for_customer_ref(&self, customer_ref: &str) -> Result<Option<User>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(users::fetch_user_for_customer_ref(customer_ref, &mut conn).await?)
    }

    async fn link_customer_ref(&self, customer_ref: &str, user_id: &UserId) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let linked = users::link_customer_ref(customer_ref, user_id, &mut tx).await?;
        tx.commit().await?;
        if linked {
            debug!("🗃️ Customer {customer_ref} linked to user {user_id}");
        }
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = users::insert_user(user, &mut tx).await?;
        tx.commit().await?;
        Ok(result)
    }
}

async fn rollback_quietly(tx: sqlx::Transaction<'_, sqlx::Sqlite>, external_ref: &str) {
    match tx.rollback().await {
        Ok(()) => warn!("🗃️ Settlement for {external_ref} rolled back"),
        Err(e) => error!("🗃️ Could not roll back settlement for {external_ref}: {e}. The connection will discard it."),
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date using the migrations embedded in the binary.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}
