//! Checkout Settlement Engine
//!
//! The settlement engine turns paid checkouts from an external payment provider into confirmed orders and issued
//! tickets. It is provider-agnostic: everything it needs from the provider goes through the
//! [`traits::CheckoutLookup`] trait.
//!
//! The library is divided into these main sections:
//! 1. Storage ([`mod@traits`] and [`mod@sqlite`]). SQLite is the supported backend. The data types stored in the
//!    database are defined in [`mod@db_types`].
//! 2. The public API ([`mod@settlement_api`]). [`SettlementApi`] settles purchases exactly once, no matter how many
//!    times or through how many channels the provider reports them. [`InventoryApi`] manages events and ticket types.
//!
//! Every committed order is published as an [`events::OrderSettledEvent`], which you can hook into for emails,
//! analytics and so on.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod settlement_api;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod test_utils;

/// The checkout metadata key that carries the platform's ticket type id.
pub const TICKET_TYPE_METADATA_KEY: &str = "ticket_type_id";

pub use settlement_api::{
    errors::SettlementError,
    inventory_api::InventoryApi,
    settlement_flow_api::SettlementApi,
    settlement_objects,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    CheckoutDetails,
    CheckoutLookup,
    InsertSettlementResult,
    InventoryManagement,
    LookupError,
    SettlementBackend,
    SettlementLedger,
    StoreError,
    UserDirectory,
};
