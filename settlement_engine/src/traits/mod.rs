//! # Backend contracts for the settlement engine.
//!
//! This module defines the interfaces that storage backends and upstream provider clients must expose so that the
//! settlement engine can run on top of them.
//!
//! ## Storage
//! * [`InventoryManagement`] manages events and ticket types, and is the only way inventory counts are edited outside
//!   of a settlement.
//! * [`SettlementLedger`] records settled orders and their tickets. Its [`SettlementLedger::insert_settlement`] method
//!   is the single atomic unit of work that turns a paid checkout into an order.
//! * [`UserDirectory`] looks up platform users and remembers which payment provider customers map to which user.
//!
//! ## Upstream
//! * [`CheckoutLookup`] is the read-only view the engine needs of the payment provider: customer emails and checkout
//!   sessions.
mod checkout_lookup;
mod data_objects;
mod errors;
mod inventory_management;
mod settlement_ledger;
mod user_directory;

pub use checkout_lookup::CheckoutLookup;
pub use data_objects::{CheckoutDetails, InsertSettlementResult, InventoryDecrement, SettledOrder};
pub use errors::{LookupError, StoreError};
pub use inventory_management::InventoryManagement;
pub use settlement_ledger::SettlementLedger;
pub use user_directory::UserDirectory;

/// Everything [`crate::SettlementApi`] needs from a storage backend.
pub trait SettlementBackend: InventoryManagement + SettlementLedger + UserDirectory {}

impl<T> SettlementBackend for T where T: InventoryManagement + SettlementLedger + UserDirectory {}
