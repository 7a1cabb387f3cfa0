use crate::{
    db_types::{Cents, Event, EventId, NewEvent, NewTicketType, TicketType, TicketTypeId},
    traits::StoreError,
};

/// Storage of events and ticket types.
///
/// Inventory counts change in two places only: here, via [`InventoryManagement::restock_ticket_type`] when an
/// organiser adds stock, and in [`crate::traits::SettlementLedger::insert_settlement`] when tickets are issued.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    async fn fetch_event(&self, id: &EventId) -> Result<Option<Event>, StoreError>;

    async fn fetch_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;

    async fn fetch_ticket_type(&self, id: &TicketTypeId) -> Result<Option<TicketType>, StoreError>;

    /// Fetch the ticket type mapped to the payment provider's product identifier.
    async fn fetch_ticket_type_for_product(&self, product_ref: &str) -> Result<Option<TicketType>, StoreError>;

    /// All ticket types for the event, active or not, ordered by id.
    async fn fetch_ticket_types_for_event(&self, event_id: &EventId) -> Result<Vec<TicketType>, StoreError>;

    async fn insert_event(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Create a ticket type. `available_quantity` starts out equal to the total quantity.
    async fn insert_ticket_type(&self, ticket_type: NewTicketType) -> Result<TicketType, StoreError>;

    async fn update_ticket_type_price(
        &self,
        id: &TicketTypeId,
        price: Cents,
        fee: Cents,
    ) -> Result<TicketType, StoreError>;

    async fn set_ticket_type_active(&self, id: &TicketTypeId, active: bool) -> Result<TicketType, StoreError>;

    /// Add `additional` tickets to both the total and the available quantity.
    async fn restock_ticket_type(&self, id: &TicketTypeId, additional: i64) -> Result<TicketType, StoreError>;

    /// Map (or unmap, with `None`) a ticket type to a payment provider product.
    async fn set_ticket_type_product(
        &self,
        id: &TicketTypeId,
        product_ref: Option<&str>,
    ) -> Result<TicketType, StoreError>;

    async fn update_event_price_range(
        &self,
        id: &EventId,
        min_price: Option<Cents>,
        max_price: Option<Cents>,
    ) -> Result<Event, StoreError>;
}
