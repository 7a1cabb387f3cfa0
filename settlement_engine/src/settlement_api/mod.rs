//! The public API of the settlement engine.
//!
//! * [`SettlementApi`] settles paid checkouts, from either provider notifications or client confirmations.
//! * [`InventoryApi`] manages events and ticket types.
//!
//! Backends plug in by implementing the traits in [`crate::traits`].
pub mod errors;
pub mod idempotency;
pub mod identity_resolver;
pub mod inventory_api;
pub mod settlement_flow_api;
pub mod settlement_objects;
