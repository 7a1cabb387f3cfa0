use serde::{Deserialize, Serialize};

use crate::{db_types::Order, traits::InventoryDecrement};

/// Published once for every order the engine commits. Replays of an already-settled reference do not publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettledEvent {
    pub order: Order,
    pub ticket_ids: Vec<i64>,
    pub inventory: InventoryDecrement,
}

impl OrderSettledEvent {
    pub fn new(order: Order, ticket_ids: Vec<i64>, inventory: InventoryDecrement) -> Self {
        Self { order, ticket_ids, inventory }
    }

    pub fn oversold(&self) -> bool {
        self.inventory.oversold()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderSettled(OrderSettledEvent),
}
