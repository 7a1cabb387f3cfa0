//! # Settlement server
//! This crate hosts the HTTP front end of the settlement engine. It is responsible for:
//! * Listening for payment provider notifications, verifying their signatures and queueing them for settlement.
//! * Settling queued notifications in the background, retrying transient failures and logging the rest for
//!   reconciliation.
//! * Letting the client confirm a checkout synchronously after the provider redirects the purchaser back.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/provider/webhook`: Notifications from the payment provider.
//! * `/api/checkout/confirm`: Client confirmation of a paid checkout.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod dispatcher;
pub mod errors;
pub mod helpers;
pub mod ingestion;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
