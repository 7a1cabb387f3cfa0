use crate::{
    db_types::{
        EventId,
        InventoryMode,
        NewOrder,
        NewUnresolvedNotification,
        Order,
        Ticket,
        TicketType,
        UnresolvedNotification,
        User,
        UserId,
    },
    traits::{InsertSettlementResult, StoreError},
};

/// Storage of settled orders and issued tickets.
#[allow(async_fn_in_trait)]
pub trait SettlementLedger {
    /// Fetch the order created for the given payment provider transaction reference, if any.
    async fn fetch_order_by_external_ref(&self, external_ref: &str) -> Result<Option<Order>, StoreError>;

    /// Fetch the order that `alias` was recorded against by [`SettlementLedger::record_reference_alias`], if any.
    async fn fetch_order_by_alias(&self, alias: &str) -> Result<Option<Order>, StoreError>;

    /// Remember that the purchase settled as `order_id` was also reported under `alias`.
    async fn record_reference_alias(&self, alias: &str, order_id: i64) -> Result<(), StoreError>;

    /// The most recently created order for this user and event.
    async fn fetch_latest_order_for_user_event(
        &self,
        user_id: &UserId,
        event_id: &EventId,
    ) -> Result<Option<Order>, StoreError>;

    async fn fetch_tickets_for_order(&self, order_id: i64) -> Result<Vec<Ticket>, StoreError>;

    /// Settle a paid checkout in a single atomic transaction:
    /// * insert the order. If an order with the same `external_ref` already exists nothing is written and
    ///   [`InsertSettlementResult::AlreadyExists`] is returned;
    /// * issue `order.quantity` tickets to `holder`, verifying that every one was written;
    /// * decrement the ticket type's available quantity according to `mode`.
    ///
    /// Any failure rolls back all three steps. So does dropping the returned future before it completes.
    async fn insert_settlement(
        &self,
        order: NewOrder,
        holder: &User,
        ticket_type: &TicketType,
        mode: InventoryMode,
    ) -> Result<InsertSettlementResult, StoreError>;

    /// Add a notification to the reconciliation worklist. Returns the new row's id.
    async fn record_unresolved_notification(&self, note: NewUnresolvedNotification) -> Result<i64, StoreError>;

    async fn fetch_unresolved_notifications(&self) -> Result<Vec<UnresolvedNotification>, StoreError>;
}
