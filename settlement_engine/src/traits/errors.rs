use thiserror::Error;

use crate::db_types::{EventId, TicketTypeId, UserId};

/// Errors raised by storage backends.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The requested ticket type {0} does not exist")]
    TicketTypeNotFound(TicketTypeId),
    #[error("The requested event {0} does not exist")]
    EventNotFound(EventId),
    #[error("The requested user {0} does not exist")]
    UserNotFound(UserId),
    #[error("Only {available} tickets of type {ticket_type} remain, but {requested} were requested")]
    InsufficientInventory { ticket_type: TicketTypeId, requested: i64, available: i64 },
    #[error(
        "Ticket issuance for {external_ref} stopped after {written} of {expected} tickets. Nothing was committed. \
         {reason}"
    )]
    PartialWrite { external_ref: String, expected: i64, written: i64, reason: String },
    #[error("Invalid input. {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

/// Errors raised by [`crate::traits::CheckoutLookup`] implementations. A record that simply does not exist upstream
/// is not an error; lookups return `Ok(None)` for that case.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("The payment provider did not respond in time. {0}")]
    Timeout(String),
    #[error("The payment provider could not be reached. {0}")]
    Unavailable(String),
}
