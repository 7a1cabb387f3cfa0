use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use settlement_engine::settlement_objects::{ConfirmPurchase, SettlementOutcome, SettlementResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The outer shape of every provider webhook call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPurchaseRequest {
    pub session_token: String,
    pub ticket_type_id: String,
    pub quantity: i64,
}

impl From<ConfirmPurchaseRequest> for ConfirmPurchase {
    fn from(req: ConfirmPurchaseRequest) -> Self {
        ConfirmPurchase::new(req.session_token, req.ticket_type_id, req.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPurchaseResponse {
    pub order_id: i64,
    pub ticket_ids: Vec<i64>,
    /// True if the purchase had already been settled, by an earlier confirm or a provider notification.
    pub already_settled: bool,
}

impl From<SettlementResult> for ConfirmPurchaseResponse {
    fn from(result: SettlementResult) -> Self {
        let already_settled = !matches!(result.outcome, SettlementOutcome::Created);
        Self { order_id: result.order_id(), ticket_ids: result.ticket_ids, already_settled }
    }
}
