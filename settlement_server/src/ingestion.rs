//! Decoding of provider webhook calls.
//!
//! Webhook bodies are decoded at the boundary into a [`ProviderNotification`]. The two recognised kinds are turned into
//! the engine's provider-agnostic [`CompletionRecord`]; everything else is [`ProviderNotification::Unrecognized`] and
//! is only acknowledged.
use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use settlement_engine::settlement_objects::{CompletionKind, CompletionRecord, SettlementOptions};
use thiserror::Error;

use crate::data_objects::WebhookEnvelope;

pub const PAYMENT_CONFIRMED: &str = "payment.confirmed";
pub const CHECKOUT_COMPLETED: &str = "checkout.completed";

#[derive(Debug, Clone, Error)]
#[error("Could not decode the {event_type} notification. {reason}")]
pub struct IngestionError {
    pub event_type: String,
    pub reason: String,
}

/// `data` of a `payment.confirmed` notification. The payment id is the transaction reference.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmed {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    /// The checkout session this payment completed, if the provider links them.
    #[serde(default)]
    pub checkout: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

/// `data` of a `checkout.completed` notification.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutCompleted {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

impl CheckoutCompleted {
    /// The payment reference when the provider has linked one, so that this and the matching `payment.confirmed`
    /// notification collapse onto the same order. Otherwise, the checkout id.
    pub fn external_ref(&self) -> &str {
        self.payment_reference.as_deref().filter(|s| !s.is_empty()).unwrap_or(self.id.as_str())
    }

    /// True if either status field is on the allow-list. Matching is exact.
    pub fn is_successful(&self, options: &SettlementOptions) -> bool {
        [self.status.as_deref(), self.payment_status.as_deref()]
            .into_iter()
            .flatten()
            .any(|s| options.is_success_status(s))
    }

    pub fn status_description(&self) -> String {
        match (&self.status, &self.payment_status) {
            (Some(s), Some(p)) => format!("{s}/{p}"),
            (Some(s), None) | (None, Some(s)) => s.clone(),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProviderNotification {
    PaymentConfirmed(PaymentConfirmed),
    CheckoutCompleted(CheckoutCompleted),
    /// Any other event type. Carries the type name for logging.
    Unrecognized(String),
}

impl ProviderNotification {
    pub fn from_envelope(envelope: &WebhookEnvelope) -> Result<Self, IngestionError> {
        let decode_error = |e: serde_json::Error| IngestionError {
            event_type: envelope.event_type.clone(),
            reason: e.to_string(),
        };
        match envelope.event_type.as_str() {
            PAYMENT_CONFIRMED => serde_json::from_value::<PaymentConfirmed>(envelope.data.clone())
                .map(Self::PaymentConfirmed)
                .map_err(decode_error),
            CHECKOUT_COMPLETED => serde_json::from_value::<CheckoutCompleted>(envelope.data.clone())
                .map(Self::CheckoutCompleted)
                .map_err(decode_error),
            other => Ok(Self::Unrecognized(other.to_string())),
        }
    }

    /// Normalizes the notification into a settlement record. `raw` is kept on the record for the reconciliation log.
    pub fn into_record(self, raw: Value) -> Option<CompletionRecord> {
        match self {
            Self::PaymentConfirmed(p) => Some(p.into_record(raw)),
            Self::CheckoutCompleted(c) => Some(c.into_record(raw)),
            Self::Unrecognized(_) => None,
        }
    }
}

impl PaymentConfirmed {
    pub fn into_record(self, raw: Value) -> CompletionRecord {
        let mut record = CompletionRecord::new(CompletionKind::PaymentConfirmed, self.id);
        record.customer_ref = self.customer;
        record.customer_email = self.customer_email;
        record.product_ref = self.product;
        record.checkout_id = self.checkout;
        record.status = self.status;
        record.metadata = self.metadata;
        record.return_url = self.return_url;
        record.with_raw(raw)
    }
}

impl CheckoutCompleted {
    pub fn into_record(self, raw: Value) -> CompletionRecord {
        let external_ref = self.external_ref().to_string();
        let mut record = CompletionRecord::new(CompletionKind::CheckoutCompleted, external_ref);
        record.status = self.status.or(self.payment_status);
        record.checkout_id = Some(self.id);
        record.customer_ref = self.customer;
        record.customer_email = self.customer_email;
        record.product_ref = self.product;
        record.metadata = self.metadata;
        record.return_url = self.return_url;
        record.with_raw(raw)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn envelope(event_type: &str, data: Value) -> WebhookEnvelope {
        WebhookEnvelope { event_type: event_type.to_string(), data }
    }

    #[test]
    fn payment_confirmed_uses_payment_id() {
        let data = json!({
            "id": "TXN-1",
            "customer": "cus_7",
            "product": "prod_9",
            "checkout": "cs_1",
            "metadata": { "ticket_type_id": "tt_42" }
        });
        let env = envelope(PAYMENT_CONFIRMED, data.clone());
        let note = ProviderNotification::from_envelope(&env).unwrap();
        let record = note.into_record(data).unwrap();
        assert_eq!(record.kind, CompletionKind::PaymentConfirmed);
        assert_eq!(record.external_ref, "TXN-1");
        assert_eq!(record.customer_ref.as_deref(), Some("cus_7"));
        assert_eq!(record.product_ref.as_deref(), Some("prod_9"));
        assert_eq!(record.checkout_id.as_deref(), Some("cs_1"));
        assert_eq!(record.metadata_ticket_type().unwrap().as_str(), "tt_42");
        assert_eq!(record.raw["id"], "TXN-1");
    }

    #[test]
    fn checkout_completed_prefers_payment_reference() {
        let data = json!({ "id": "cs_1", "status": "complete", "payment_reference": "TXN-1" });
        let env = envelope(CHECKOUT_COMPLETED, data.clone());
        let record = ProviderNotification::from_envelope(&env).unwrap().into_record(data).unwrap();
        assert_eq!(record.kind, CompletionKind::CheckoutCompleted);
        assert_eq!(record.external_ref, "TXN-1");
        assert_eq!(record.checkout_id.as_deref(), Some("cs_1"));

        let data = json!({ "id": "cs_2", "status": "complete", "payment_reference": "" });
        let env = envelope(CHECKOUT_COMPLETED, data.clone());
        let record = ProviderNotification::from_envelope(&env).unwrap().into_record(data).unwrap();
        assert_eq!(record.external_ref, "cs_2");
    }

    #[test]
    fn status_matching_is_exact() {
        let options = SettlementOptions::default();
        let checkout = |status: &str| CheckoutCompleted {
            id: "cs_1".into(),
            status: Some(status.into()),
            payment_status: None,
            customer: None,
            customer_email: None,
            product: None,
            payment_reference: None,
            metadata: HashMap::new(),
            return_url: None,
        };
        assert!(checkout("complete").is_successful(&options));
        assert!(checkout("paid").is_successful(&options));
        assert!(!checkout("Complete").is_successful(&options));
        assert!(!checkout("complete ").is_successful(&options));
        assert!(!checkout("open").is_successful(&options));
    }

    #[test]
    fn unknown_types_are_unrecognized() {
        let env = envelope("customer.updated", json!({ "id": "cus_7" }));
        let note = ProviderNotification::from_envelope(&env).unwrap();
        assert!(matches!(note, ProviderNotification::Unrecognized(ref t) if t == "customer.updated"));
        assert!(note.into_record(Value::Null).is_none());
    }

    #[test]
    fn malformed_recognised_payloads_are_errors() {
        let env = envelope(PAYMENT_CONFIRMED, json!({ "customer": "cus_7" }));
        let err = ProviderNotification::from_envelope(&env).unwrap_err();
        assert_eq!(err.event_type, PAYMENT_CONFIRMED);
    }
}
