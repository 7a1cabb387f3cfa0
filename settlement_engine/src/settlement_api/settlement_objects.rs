use std::{collections::HashMap, fmt::Display};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db_types::{InventoryMode, Order, TicketType, TicketTypeId, User},
    traits::CheckoutDetails,
};

pub const DEFAULT_DUPLICATE_WINDOW_MINUTES: i64 = 10;
pub const DEFAULT_MAX_QUANTITY: i64 = 20;
pub const DEFAULT_SUCCESS_STATUSES: [&str; 2] = ["complete", "paid"];

/// Tunables for the settlement flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOptions {
    /// The currency recorded on every order.
    pub currency: String,
    /// How far back the recent-duplicate check looks for an earlier order by the same user for the same event.
    pub duplicate_window: Duration,
    pub inventory_mode: InventoryMode,
    /// Checkout or payment statuses that count as paid. Matching is exact.
    pub success_statuses: Vec<String>,
    /// The largest number of tickets a client may confirm in one request. Paid provider notifications are not capped.
    pub max_quantity: i64,
}

impl Default for SettlementOptions {
    fn default() -> Self {
        Self {
            currency: tkt_common::DEFAULT_CURRENCY_CODE.to_string(),
            duplicate_window: Duration::minutes(DEFAULT_DUPLICATE_WINDOW_MINUTES),
            inventory_mode: InventoryMode::default(),
            success_statuses: DEFAULT_SUCCESS_STATUSES.iter().map(|s| s.to_string()).collect(),
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }
}

impl SettlementOptions {
    pub fn with_inventory_mode(mut self, mode: InventoryMode) -> Self {
        self.inventory_mode = mode;
        self
    }

    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.duplicate_window = window;
        self
    }

    pub fn is_success_status(&self, status: &str) -> bool {
        self.success_statuses.iter().any(|s| s == status)
    }
}

/// Which kind of provider notification a [`CompletionRecord`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionKind {
    PaymentConfirmed,
    CheckoutCompleted,
}

impl Display for CompletionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionKind::PaymentConfirmed => write!(f, "payment.confirmed"),
            CompletionKind::CheckoutCompleted => write!(f, "checkout.completed"),
        }
    }
}

/// A provider notification, normalised into the shape the settlement flow works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub kind: CompletionKind,
    /// The transaction reference this settlement is keyed on.
    pub external_ref: String,
    pub customer_ref: Option<String>,
    pub customer_email: Option<String>,
    pub product_ref: Option<String>,
    pub checkout_id: Option<String>,
    pub status: Option<String>,
    pub metadata: HashMap<String, String>,
    pub return_url: Option<String>,
    /// The notification as it was received, kept for the reconciliation log.
    pub raw: Value,
}

impl CompletionRecord {
    pub fn new<S: Into<String>>(kind: CompletionKind, external_ref: S) -> Self {
        Self {
            kind,
            external_ref: external_ref.into(),
            customer_ref: None,
            customer_email: None,
            product_ref: None,
            checkout_id: None,
            status: None,
            metadata: HashMap::new(),
            return_url: None,
            raw: Value::Null,
        }
    }

    pub fn with_customer<S: Into<String>>(mut self, customer_ref: S) -> Self {
        self.customer_ref = Some(customer_ref.into());
        self
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_product<S: Into<String>>(mut self, product_ref: S) -> Self {
        self.product_ref = Some(product_ref.into());
        self
    }

    pub fn with_checkout<S: Into<String>>(mut self, checkout_id: S) -> Self {
        self.checkout_id = Some(checkout_id.into());
        self
    }

    pub fn with_status<S: Into<String>>(mut self, status: S) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_return_url<S: Into<String>>(mut self, url: S) -> Self {
        self.return_url = Some(url.into());
        self
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }

    pub fn metadata_ticket_type(&self) -> Option<TicketTypeId> {
        self.metadata.get(crate::TICKET_TYPE_METADATA_KEY).map(|s| TicketTypeId::from(s.as_str()))
    }

    /// Fill in anything this record is missing from the checkout session it refers to. Fields already present on the
    /// record win.
    pub fn merge_checkout(&mut self, checkout: &CheckoutDetails) {
        fn fill(field: &mut Option<String>, value: &Option<String>) {
            if field.is_none() {
                field.clone_from(value);
            }
        }
        fill(&mut self.customer_ref, &checkout.customer_ref);
        fill(&mut self.customer_email, &checkout.customer_email);
        fill(&mut self.product_ref, &checkout.product_ref);
        fill(&mut self.return_url, &checkout.return_url);
        for (k, v) in &checkout.metadata {
            self.metadata.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

/// How a ticket type was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    /// The provider product is mapped to a ticket type.
    ProductMapping,
    /// The checkout metadata names the ticket type.
    CheckoutMetadata,
    /// The return URL names the ticket type.
    ReturnUrlTicketType,
    /// The return URL names an event with a single active ticket type. This is a guess.
    EventSlugFallback,
}

impl ResolutionStrategy {
    pub fn is_low_confidence(&self) -> bool {
        matches!(self, ResolutionStrategy::EventSlugFallback)
    }
}

impl Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionStrategy::ProductMapping => write!(f, "product mapping"),
            ResolutionStrategy::CheckoutMetadata => write!(f, "checkout metadata"),
            ResolutionStrategy::ReturnUrlTicketType => write!(f, "return URL ticket type"),
            ResolutionStrategy::EventSlugFallback => write!(f, "event slug fallback"),
        }
    }
}

/// Everything needed to settle a completion record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub user: User,
    pub ticket_type: TicketType,
    pub quantity: i64,
    pub strategy: ResolutionStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    /// A new order was committed.
    Created,
    /// An order already existed for the transaction reference.
    AlreadySettled,
    /// The same user bought tickets for the same event moments ago. That order is returned instead.
    RecentDuplicate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub order: Order,
    pub ticket_ids: Vec<i64>,
    pub outcome: SettlementOutcome,
}

impl SettlementResult {
    pub fn new(order: Order, ticket_ids: Vec<i64>, outcome: SettlementOutcome) -> Self {
        Self { order, ticket_ids, outcome }
    }

    pub fn order_id(&self) -> i64 {
        self.order.id
    }

    pub fn is_new(&self) -> bool {
        self.outcome == SettlementOutcome::Created
    }
}

/// A purchase confirmation sent by the client after it returns from checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmPurchase {
    pub session_token: String,
    pub ticket_type_id: TicketTypeId,
    pub quantity: i64,
}

impl ConfirmPurchase {
    pub fn new<S: Into<String>, T: Into<TicketTypeId>>(session_token: S, ticket_type_id: T, quantity: i64) -> Self {
        Self { session_token: session_token.into(), ticket_type_id: ticket_type_id.into(), quantity }
    }
}
