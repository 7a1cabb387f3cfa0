//! # Provider tools
//!
//! A thin REST client for the upstream payment provider. The settlement engine only ever needs three read-only
//! lookups from the provider:
//!
//! * fetch a customer by id,
//! * search for customers by email address,
//! * fetch a checkout (session) by id.
//!
//! All calls are simple `GET`s with bearer authentication and a bounded timeout. Any non-success HTTP status is
//! reported as "no result" (`Ok(None)`), so that callers can fall through to their next resolution strategy. Only
//! timeouts and transport failures are surfaced as errors, since those are worth retrying.
mod api;
mod config;
mod data_objects;
mod error;

pub use api::ProviderApi;
pub use config::ProviderConfig;
pub use data_objects::{CustomerList, ProviderCheckout, ProviderCustomer};
pub use error::ProviderApiError;
