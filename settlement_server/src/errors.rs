use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use settlement_engine::SettlementError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The settlement queue is not accepting new work. {0}")]
    QueueClosed(String),
    #[error("{0}")]
    Settlement(#[from] SettlementError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingIdentity(_) => StatusCode::UNAUTHORIZED,
                AuthError::UnknownUser(_) => StatusCode::UNAUTHORIZED,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::Settlement(e) => settlement_status(e),
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::QueueClosed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

fn settlement_status(e: &SettlementError) -> StatusCode {
    match e {
        SettlementError::UserNotFound(_) => StatusCode::UNAUTHORIZED,
        SettlementError::InvalidQuantity { .. } => StatusCode::BAD_REQUEST,
        SettlementError::PaymentIncomplete { .. } => StatusCode::BAD_REQUEST,
        SettlementError::CheckoutMismatch { .. } => StatusCode::BAD_REQUEST,
        SettlementError::CheckoutNotFound(_) => StatusCode::NOT_FOUND,
        SettlementError::TicketTypeNotFound(_) => StatusCode::NOT_FOUND,
        SettlementError::InsufficientInventory { .. } => StatusCode::CONFLICT,
        SettlementError::UpstreamTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        SettlementError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        SettlementError::IdentityUnresolved { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        SettlementError::PartialWriteFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        SettlementError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No user id was supplied in the {0} header.")]
    MissingIdentity(String),
    #[error("User {0} is not known to this server.")]
    UnknownUser(String),
    #[error("Requests from this address are not allowed.")]
    ForbiddenPeer,
}
