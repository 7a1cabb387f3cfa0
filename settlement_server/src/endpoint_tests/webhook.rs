use std::net::IpAddr;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};
use settlement_engine::{
    settlement_objects::{CompletionKind, SettlementOptions},
    SettlementApi,
    SqliteDatabase,
};
use tkt_common::Secret;
use tokio::sync::mpsc;

use super::{
    helpers::{post_json, sign, TestStore, HMAC_HEADER, WEBHOOK_SECRET},
    mocks::MockLookup,
};
use crate::{
    dispatcher::{SettlementJob, SettlementQueue},
    middleware::{sign_body, HmacMiddlewareFactory, WhitelistMiddlewareFactory},
    webhook_routes::ProviderWebhookRoute,
};

const PATH: &str = "/provider/webhook";

fn configure(
    api: SettlementApi<SqliteDatabase, MockLookup>,
    queue: SettlementQueue,
    whitelist: Option<Vec<IpAddr>>,
    hmac_checks: bool,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        let scope = web::scope("/provider")
            .wrap(HmacMiddlewareFactory::new(HMAC_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), hmac_checks))
            .wrap(WhitelistMiddlewareFactory::new(whitelist, false, false))
            .service(ProviderWebhookRoute::<SqliteDatabase, MockLookup>::new());
        cfg.app_data(web::Data::new(api)).app_data(web::Data::new(queue)).service(scope);
    }
}

fn payment_confirmed() -> Value {
    json!({
        "type": "payment.confirmed",
        "data": { "id": "TXN-1", "customer": "cus_7", "product": "prod_42" }
    })
}

fn checkout_completed(status: &str) -> Value {
    json!({
        "type": "checkout.completed",
        "data": { "id": "cs_1", "status": status, "customer": "cus_7", "payment_reference": "TXN-1" }
    })
}

async fn post_signed(store: &TestStore, body: &Value) -> (StatusCode, String, mpsc::Receiver<SettlementJob>) {
    let (queue, jobs) = SettlementQueue::new(8);
    let signature = sign(&body.to_string());
    let config = configure(store.api(MockLookup::new()), queue, None, true);
    let (status, body) = post_json(PATH, &[(HMAC_HEADER, signature.as_str())], body, config).await;
    (status, body, jobs)
}

#[actix_web::test]
async fn unsigned_webhooks_are_forbidden() {
    let store = TestStore::new().await;
    let (queue, mut jobs) = SettlementQueue::new(8);
    let config = configure(store.api(MockLookup::new()), queue, None, true);
    let (status, _) = post_json(PATH, &[], &payment_confirmed(), config).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(jobs.try_recv().is_err());
    store.cleanup().await;
}

#[actix_web::test]
async fn badly_signed_webhooks_are_forbidden() {
    let store = TestStore::new().await;
    let (queue, mut jobs) = SettlementQueue::new(8);
    let config = configure(store.api(MockLookup::new()), queue, None, true);
    let wrong = sign("{\"type\":\"payment.confirmed\"}");
    let (status, body) = post_json(PATH, &[(HMAC_HEADER, wrong.as_str())], &payment_confirmed(), config).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Invalid HMAC signature.");
    assert!(jobs.try_recv().is_err());
    store.cleanup().await;
}

#[actix_web::test]
async fn malformed_signatures_are_forbidden() {
    let store = TestStore::new().await;
    let (queue, mut jobs) = SettlementQueue::new(8);
    let config = configure(store.api(MockLookup::new()), queue, None, true);
    let (status, body) = post_json(PATH, &[(HMAC_HEADER, "sig:not-base64!")], &payment_confirmed(), config).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, "Malformed HMAC signature.");
    assert!(jobs.try_recv().is_err());
    store.cleanup().await;
}

#[actix_web::test]
async fn any_signature_from_a_rotation_is_accepted() {
    let store = TestStore::new().await;
    let body = payment_confirmed();
    let stale = sign_body(&Secret::new("whsec_retired".to_string()), body.to_string().as_bytes()).unwrap();
    let header = format!("v1={stale}, v1={}", sign(&body.to_string()));
    let (queue, mut jobs) = SettlementQueue::new(8);
    let config = configure(store.api(MockLookup::new()), queue, None, true);
    let (status, _) = post_json(PATH, &[(HMAC_HEADER, header.as_str())], &body, config).await;
    assert_eq!(status, StatusCode::OK);
    assert!(jobs.try_recv().is_ok());
    store.cleanup().await;
}

#[actix_web::test]
async fn hmac_checks_can_be_disabled() {
    let store = TestStore::new().await;
    let (queue, mut jobs) = SettlementQueue::new(8);
    let config = configure(store.api(MockLookup::new()), queue, None, false);
    let (status, _) = post_json(PATH, &[], &payment_confirmed(), config).await;
    assert_eq!(status, StatusCode::OK);
    assert!(jobs.try_recv().is_ok());
    store.cleanup().await;
}

#[actix_web::test]
async fn peers_off_the_whitelist_are_forbidden() {
    let store = TestStore::new().await;
    let body = payment_confirmed();
    let signature = sign(&body.to_string());

    let (queue, mut jobs) = SettlementQueue::new(8);
    let whitelist = Some(vec!["192.0.2.10".parse().unwrap()]);
    let config = configure(store.api(MockLookup::new()), queue, whitelist, true);
    let (status, _) = post_json(PATH, &[(HMAC_HEADER, signature.as_str())], &body, config).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(jobs.try_recv().is_err());

    // post_json always calls from 10.0.0.1
    let (queue, mut jobs) = SettlementQueue::new(8);
    let whitelist = Some(vec!["10.0.0.1".parse().unwrap()]);
    let config = configure(store.api(MockLookup::new()), queue, whitelist, true);
    let (status, _) = post_json(PATH, &[(HMAC_HEADER, signature.as_str())], &body, config).await;
    assert_eq!(status, StatusCode::OK);
    assert!(jobs.try_recv().is_ok());
    store.cleanup().await;
}

#[actix_web::test]
async fn payment_confirmed_is_queued_and_acknowledged() {
    let store = TestStore::new().await;
    let body = payment_confirmed();
    let (status, response, mut jobs) = post_signed(&store, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, r#"{"success":true,"message":"Notification accepted."}"#);
    let job = jobs.try_recv().expect("Expected a settlement job");
    assert_eq!(job.record.kind, CompletionKind::PaymentConfirmed);
    assert_eq!(job.record.external_ref, "TXN-1");
    assert_eq!(job.record.product_ref.as_deref(), Some("prod_42"));
    assert_eq!(job.record.raw, body);
    store.cleanup().await;
}

#[actix_web::test]
async fn unrecognised_notifications_are_acknowledged() {
    let store = TestStore::new().await;
    let body = json!({ "type": "customer.updated", "data": { "id": "cus_7" } });
    let (status, response, mut jobs) = post_signed(&store, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("Ignored customer.updated notification"));
    assert!(jobs.try_recv().is_err());
    store.cleanup().await;
}

#[actix_web::test]
async fn malformed_notifications_are_acknowledged_as_failures() {
    let store = TestStore::new().await;
    let body = json!({ "type": "payment.confirmed", "data": { "customer": "cus_7" } });
    let (status, response, mut jobs) = post_signed(&store, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.starts_with(r#"{"success":false"#));
    assert!(jobs.try_recv().is_err());
    store.cleanup().await;
}

#[actix_web::test]
async fn unpaid_checkouts_are_not_queued() {
    let store = TestStore::new().await;
    for status in ["open", "Complete", "expired"] {
        let (code, response, mut jobs) = post_signed(&store, &checkout_completed(status)).await;
        assert_eq!(code, StatusCode::OK);
        assert!(response.contains("not paid"), "{status}: {response}");
        assert!(jobs.try_recv().is_err());
    }
    store.cleanup().await;
}

#[actix_web::test]
async fn paid_checkouts_are_queued_under_the_payment_reference() {
    let store = TestStore::new().await;
    let (status, _, mut jobs) = post_signed(&store, &checkout_completed("complete")).await;
    assert_eq!(status, StatusCode::OK);
    let job = jobs.try_recv().expect("Expected a settlement job");
    assert_eq!(job.record.kind, CompletionKind::CheckoutCompleted);
    assert_eq!(job.record.external_ref, "TXN-1");
    assert_eq!(job.record.checkout_id.as_deref(), Some("cs_1"));
    store.cleanup().await;
}

#[actix_web::test]
async fn settled_checkouts_are_not_queued_again() {
    let store = TestStore::new().await;
    let api = store.api_with_options(MockLookup::new(), SettlementOptions::default());
    let settled = api.settle(&store.user, &store.ticket_type, 2, "TXN-1").await.expect("Settlement failed");
    assert!(settled.is_new());

    let (status, response, mut jobs) = post_signed(&store, &checkout_completed("complete")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("Already settled"));
    assert!(jobs.try_recv().is_err());
    store.cleanup().await;
}

#[actix_web::test]
async fn closed_queue_is_a_server_error() {
    let store = TestStore::new().await;
    let (queue, jobs) = SettlementQueue::new(8);
    drop(jobs);
    let body = payment_confirmed();
    let signature = sign(&body.to_string());
    let config = configure(store.api(MockLookup::new()), queue, None, true);
    let (status, _) = post_json(PATH, &[(HMAC_HEADER, signature.as_str())], &body, config).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    store.cleanup().await;
}
