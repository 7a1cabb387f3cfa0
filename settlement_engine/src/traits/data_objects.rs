use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::db_types::{Order, Ticket, TicketTypeId};

/// The result of [`crate::traits::SettlementLedger::insert_settlement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertSettlementResult {
    /// The order, its tickets and the inventory decrement were committed together.
    Inserted(SettledOrder),
    /// An order with the same external reference already exists. Nothing was written.
    AlreadyExists(Order),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledOrder {
    pub order: Order,
    pub tickets: Vec<Ticket>,
    pub inventory: InventoryDecrement,
}

impl SettledOrder {
    pub fn ticket_ids(&self) -> Vec<i64> {
        self.tickets.iter().map(|t| t.id).collect()
    }
}

/// The inventory change applied as part of a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDecrement {
    pub requested: i64,
    pub before: i64,
    pub after: i64,
}

impl InventoryDecrement {
    /// True when more tickets were issued than were available, i.e. the decrement was clamped at zero.
    pub fn oversold(&self) -> bool {
        self.requested > self.before
    }
}

/// A provider checkout session, reduced to the fields the settlement engine cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub id: String,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub customer_ref: Option<String>,
    pub customer_email: Option<String>,
    pub product_ref: Option<String>,
    pub payment_reference: Option<String>,
    pub metadata: HashMap<String, String>,
    pub return_url: Option<String>,
}

impl CheckoutDetails {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self { id: id.into(), ..Default::default() }
    }

    /// The transaction reference a settlement for this checkout is keyed on: the payment reference when the provider
    /// supplies one, otherwise the checkout id itself.
    pub fn external_ref(&self) -> &str {
        self.payment_reference.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn metadata_ticket_type(&self) -> Option<TicketTypeId> {
        self.metadata.get(crate::TICKET_TYPE_METADATA_KEY).map(|s| TicketTypeId::from(s.as_str()))
    }

    /// Returns true if either the checkout or the payment status is on the given allowlist. Matching is exact.
    pub fn has_status_in(&self, allowed: &[String]) -> bool {
        [self.status.as_deref(), self.payment_status.as_deref()]
            .into_iter()
            .flatten()
            .any(|s| allowed.iter().any(|a| a == s))
    }

    /// The status to report when the checkout is not complete.
    pub fn status_description(&self) -> String {
        match (&self.status, &self.payment_status) {
            (Some(s), Some(p)) => format!("{s}/{p}"),
            (Some(s), None) => s.clone(),
            (None, Some(p)) => p.clone(),
            (None, None) => "unknown".to_string(),
        }
    }
}
