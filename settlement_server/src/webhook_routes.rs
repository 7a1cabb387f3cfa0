//----------------------------------------------   Provider webhook  ----------------------------------------------------

use actix_web::{web, HttpRequest, HttpResponse};
use log::*;
use serde_json::Value;
use settlement_engine::{CheckoutLookup, SettlementApi, SettlementBackend};

use crate::{
    data_objects::{JsonResponse, WebhookEnvelope},
    dispatcher::SettlementQueue,
    errors::ServerError,
    ingestion::ProviderNotification,
    route,
};

route!(provider_webhook => Post "/webhook" impl SettlementBackend, CheckoutLookup);
/// Receives payment provider notifications.
///
/// Recognised notifications are queued for settlement and acknowledged straight away; settlement itself happens in
/// the background. Everything the provider sends gets a 200 unless something went wrong on our side, otherwise the
/// provider would keep redelivering events we are never going to act on.
pub async fn provider_webhook<B, L>(
    req: HttpRequest,
    body: web::Json<Value>,
    api: web::Data<SettlementApi<B, L>>,
    queue: web::Data<SettlementQueue>,
) -> Result<HttpResponse, ServerError>
where
    B: SettlementBackend,
    L: CheckoutLookup,
{
    trace!("🪝️ Received webhook request: {}", req.uri());
    let raw = body.into_inner();
    let envelope = serde_json::from_value::<WebhookEnvelope>(raw.clone()).map_err(|e| {
        warn!("🪝️ Webhook body is not a notification envelope. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    let notification = match ProviderNotification::from_envelope(&envelope) {
        Ok(n) => n,
        Err(e) => {
            error!("🪝️ {e}. Raw notification: {raw}");
            return Ok(HttpResponse::Ok().json(JsonResponse::failure(e)));
        },
    };
    let record = match notification {
        ProviderNotification::Unrecognized(event_type) => {
            info!("🪝️ Ignoring {event_type} notification.");
            return Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Ignored {event_type} notification."))));
        },
        ProviderNotification::CheckoutCompleted(checkout) => {
            if !checkout.is_successful(api.options()) {
                info!(
                    "🪝️ Checkout {} completed with status {}, which is not a paid status. Nothing to settle.",
                    checkout.id,
                    checkout.status_description()
                );
                return Ok(HttpResponse::Ok().json(JsonResponse::success("Checkout is not paid. Nothing to settle.")));
            }
            if let Some(existing) = api.already_settled(checkout.external_ref()).await? {
                info!(
                    "🪝️ Checkout {} was already settled as order #{}. Not scheduling it again.",
                    checkout.id,
                    existing.order_id()
                );
                return Ok(HttpResponse::Ok().json(JsonResponse::success("Already settled.")));
            }
            checkout.into_record(raw)
        },
        ProviderNotification::PaymentConfirmed(payment) => payment.into_record(raw),
    };
    info!("🪝️ Received {} notification for {}", record.kind, record.external_ref);
    queue.schedule(record).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Notification accepted.")))
}
