use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use tkt_common::Cents;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

//--------------------------------------      Identifiers      ---------------------------------------------------------
string_id!(
    /// The platform's identifier for a ticket type, e.g. `tt_42`
    TicketTypeId
);
string_id!(
    /// The platform's identifier for an event listing
    EventId
);
string_id!(
    /// The platform's identifier for a user account
    UserId
);

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// Payment has been taken and tickets have been issued.
    Confirmed,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Confirmed" => Ok(Self::Confirmed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Confirmed");
            OrderStatusType::Confirmed
        })
    }
}

//--------------------------------------     TicketStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TicketStatus {
    /// The ticket has been issued and can be presented at the door.
    Valid,
}

impl Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Valid => write!(f, "Valid"),
        }
    }
}

impl FromStr for TicketStatus {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Valid" => Ok(Self::Valid),
            s => Err(ConversionError(format!("Invalid ticket status: {s}"))),
        }
    }
}

//--------------------------------------     InventoryMode     ---------------------------------------------------------
/// How the settlement transaction treats a purchase that exceeds the remaining inventory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InventoryMode {
    /// The customer has already paid, so tickets are issued anyway and `available_quantity` is floored at zero.
    #[default]
    Clamp,
    /// The settlement is rejected with an insufficient-inventory error and nothing is written.
    Strict,
}

impl Display for InventoryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InventoryMode::Clamp => write!(f, "clamp"),
            InventoryMode::Strict => write!(f, "strict"),
        }
    }
}

impl FromStr for InventoryMode {
    type Err = ConversionError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "strict" => Ok(Self::Strict),
            s => Err(ConversionError(format!("Invalid inventory mode: {s}"))),
        }
    }
}

//--------------------------------------         User          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl NewUser {
    pub fn new<I: Into<UserId>, S: Into<String>>(id: I, name: S, email: S) -> Self {
        Self { id: id.into(), name: name.into(), email: email.into() }
    }
}

//--------------------------------------         Event         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub slug: String,
    pub name: String,
    /// The cheapest active ticket type's price plus fee. Kept in sync by the inventory API.
    pub min_price: Option<Cents>,
    /// The most expensive active ticket type's price plus fee.
    pub max_price: Option<Cents>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
    pub id: EventId,
    pub slug: String,
    pub name: String,
}

impl NewEvent {
    pub fn new<I: Into<EventId>, S: Into<String>>(id: I, slug: S, name: S) -> Self {
        Self { id: id.into(), slug: slug.into(), name: name.into() }
    }
}

//--------------------------------------      TicketType       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TicketType {
    pub id: TicketTypeId,
    pub event_id: EventId,
    pub name: String,
    pub price: Cents,
    pub fee: Cents,
    pub total_quantity: i64,
    pub available_quantity: i64,
    /// The payment provider's product identifier, if this ticket type has been mapped to one.
    pub external_product_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketType {
    /// The amount a single ticket of this type costs the purchaser.
    pub fn unit_total(&self) -> Cents {
        self.price + self.fee
    }
}

#[derive(Debug, Clone)]
pub struct NewTicketType {
    pub id: TicketTypeId,
    pub event_id: EventId,
    pub name: String,
    pub price: Cents,
    pub fee: Cents,
    pub quantity: i64,
    pub external_product_id: Option<String>,
}

impl NewTicketType {
    pub fn new<I: Into<TicketTypeId>, E: Into<EventId>, S: Into<String>>(
        id: I,
        event_id: E,
        name: S,
        price: Cents,
        quantity: i64,
    ) -> Self {
        Self {
            id: id.into(),
            event_id: event_id.into(),
            name: name.into(),
            price,
            fee: Cents::from(0),
            quantity,
            external_product_id: None,
        }
    }

    pub fn with_fee(mut self, fee: Cents) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_external_product_id<S: Into<String>>(mut self, product_id: S) -> Self {
        self.external_product_id = Some(product_id.into());
        self
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: UserId,
    pub event_id: EventId,
    /// The payment provider's transaction reference. At most one order exists per reference.
    pub external_ref: String,
    pub quantity: i64,
    pub subtotal: Cents,
    pub fees: Cents,
    pub tax: Cents,
    pub total: Cents,
    pub currency: String,
    pub status: OrderStatusType,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub event_id: EventId,
    pub external_ref: String,
    pub quantity: i64,
    pub subtotal: Cents,
    pub fees: Cents,
    pub tax: Cents,
    pub total: Cents,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Prices an order of `quantity` tickets of the given type. Tax is not charged on tickets.
    pub fn for_ticket_type<S: Into<String>>(
        user_id: UserId,
        ticket_type: &TicketType,
        quantity: i64,
        external_ref: S,
        currency: S,
    ) -> Self {
        let subtotal = ticket_type.price * quantity;
        let fees = ticket_type.fee * quantity;
        let tax = Cents::from(0);
        Self {
            user_id,
            event_id: ticket_type.event_id.clone(),
            external_ref: external_ref.into(),
            quantity,
            subtotal,
            fees,
            tax,
            total: subtotal + fees + tax,
            currency: currency.into(),
            created_at: Utc::now(),
        }
    }
}

//--------------------------------------        Ticket         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub order_id: i64,
    pub ticket_type_id: TicketTypeId,
    pub price: Cents,
    pub holder_name: String,
    pub holder_email: String,
    pub status: TicketStatus,
    pub issued_at: DateTime<Utc>,
}

//------------------------------------ UnresolvedNotification ------------------------------------------------------
/// A completion notification that could not be settled after all retries were exhausted. These rows are the
/// reconciliation worklist for support staff.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UnresolvedNotification {
    pub id: i64,
    pub external_ref: String,
    pub kind: String,
    pub reason: String,
    pub payload: String,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUnresolvedNotification {
    pub external_ref: String,
    pub kind: String,
    pub reason: String,
    pub payload: String,
    pub attempts: i64,
}
