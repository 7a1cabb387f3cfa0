use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Cents, Event, EventId, NewEvent, NewTicketType, TicketType, TicketTypeId},
    traits::{InventoryManagement, StoreError},
};

/// Organiser-facing management of events and ticket types.
///
/// Every change that can affect what a ticket costs, or whether it is on sale, recomputes the event's advertised
/// price range from its active ticket types.
pub struct InventoryApi<B> {
    db: B,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> InventoryApi<B>
where B: InventoryManagement
{
    pub async fn create_event(&self, event: NewEvent) -> Result<Event, StoreError> {
        self.db.insert_event(event).await
    }

    pub async fn fetch_event(&self, id: &EventId) -> Result<Option<Event>, StoreError> {
        self.db.fetch_event(id).await
    }

    pub async fn ticket_types_for_event(&self, id: &EventId) -> Result<Vec<TicketType>, StoreError> {
        self.db.fetch_ticket_types_for_event(id).await
    }

    pub async fn create_ticket_type(&self, ticket_type: NewTicketType) -> Result<TicketType, StoreError> {
        if ticket_type.price.is_negative() || ticket_type.fee.is_negative() {
            return Err(StoreError::InvalidInput("Ticket prices cannot be negative".to_string()));
        }
        let result = self.db.insert_ticket_type(ticket_type).await?;
        self.refresh_price_range(&result.event_id).await?;
        Ok(result)
    }

    pub async fn update_price(&self, id: &TicketTypeId, price: Cents, fee: Cents) -> Result<TicketType, StoreError> {
        let result = self.db.update_ticket_type_price(id, price, fee).await?;
        self.refresh_price_range(&result.event_id).await?;
        Ok(result)
    }

    pub async fn activate(&self, id: &TicketTypeId) -> Result<TicketType, StoreError> {
        self.set_active(id, true).await
    }

    pub async fn deactivate(&self, id: &TicketTypeId) -> Result<TicketType, StoreError> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: &TicketTypeId, active: bool) -> Result<TicketType, StoreError> {
        let result = self.db.set_ticket_type_active(id, active).await?;
        info!("🎟️ Ticket type {id} is {}", if active { "on sale" } else { "off sale" });
        self.refresh_price_range(&result.event_id).await?;
        Ok(result)
    }

    pub async fn restock(&self, id: &TicketTypeId, additional: i64) -> Result<TicketType, StoreError> {
        let result = self.db.restock_ticket_type(id, additional).await?;
        info!("🎟️ Ticket type {id} restocked by {additional}. {} now available", result.available_quantity);
        Ok(result)
    }

    pub async fn map_product(&self, id: &TicketTypeId, product_ref: Option<&str>) -> Result<TicketType, StoreError> {
        self.db.set_ticket_type_product(id, product_ref).await
    }

    /// Sets the event's min and max price to the cheapest and dearest active ticket type (price plus fee). An event
    /// with nothing on sale has no price range.
    pub async fn refresh_price_range(&self, event_id: &EventId) -> Result<Event, StoreError> {
        let ticket_types = self.db.fetch_ticket_types_for_event(event_id).await?;
        let prices = ticket_types.iter().filter(|t| t.active).map(TicketType::unit_total).collect::<Vec<_>>();
        let min = prices.iter().min().copied();
        let max = prices.iter().max().copied();
        trace!("🎟️ Event {event_id} price range is now {min:?} - {max:?}");
        self.db.update_event_price_range(event_id, min, max).await
    }
}
