use thiserror::Error;

use crate::{
    db_types::{TicketTypeId, UserId},
    traits::{LookupError, StoreError},
};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Could not resolve the purchaser or ticket type for {external_ref}. {reason}")]
    IdentityUnresolved { external_ref: String, reason: String },
    #[error("The payment provider did not respond in time. {0}")]
    UpstreamTimeout(String),
    #[error("The payment provider is unavailable. {0}")]
    UpstreamUnavailable(String),
    #[error(
        "Ticket issuance for {external_ref} failed after {written} of {expected} tickets. The settlement was rolled \
         back. {reason}"
    )]
    PartialWriteFailure { external_ref: String, expected: i64, written: i64, reason: String },
    #[error("Only {available} tickets of type {ticket_type} remain, but {requested} were requested")]
    InsufficientInventory { ticket_type: TicketTypeId, requested: i64, available: i64 },
    #[error("A purchase must be for between 1 and {max} tickets. {requested} is not allowed.")]
    InvalidQuantity { requested: i64, max: i64 },
    #[error("Checkout session {0} does not exist")]
    CheckoutNotFound(String),
    #[error("Checkout session {checkout_id} has not been paid. Its status is {status}")]
    PaymentIncomplete { checkout_id: String, status: String },
    #[error("The purchase does not match checkout session {checkout_id}. {reason}")]
    CheckoutMismatch { checkout_id: String, reason: String },
    #[error("Ticket type {0} does not exist")]
    TicketTypeNotFound(TicketTypeId),
    #[error("User {0} does not exist")]
    UserNotFound(UserId),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl SettlementError {
    /// Whether a background caller should try the same notification again.
    ///
    /// Upstream and storage failures are transient. Identity resolution is also retried, since the provider lookups
    /// it depends on may have failed quietly, but callers must bound the number of attempts. Everything else will fail
    /// the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SettlementError::IdentityUnresolved { .. } |
                SettlementError::UpstreamTimeout(_) |
                SettlementError::UpstreamUnavailable(_) |
                SettlementError::PartialWriteFailure { .. } |
                SettlementError::DatabaseError(_)
        )
    }
}

impl From<StoreError> for SettlementError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::TicketTypeNotFound(id) => SettlementError::TicketTypeNotFound(id),
            StoreError::UserNotFound(id) => SettlementError::UserNotFound(id),
            StoreError::InsufficientInventory { ticket_type, requested, available } => {
                SettlementError::InsufficientInventory { ticket_type, requested, available }
            },
            StoreError::PartialWrite { external_ref, expected, written, reason } => {
                SettlementError::PartialWriteFailure { external_ref, expected, written, reason }
            },
            e => SettlementError::DatabaseError(e.to_string()),
        }
    }
}

impl From<LookupError> for SettlementError {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::Timeout(s) => SettlementError::UpstreamTimeout(s),
            LookupError::Unavailable(s) => SettlementError::UpstreamUnavailable(s),
        }
    }
}
