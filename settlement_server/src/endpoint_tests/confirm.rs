use actix_web::{http::StatusCode, web, web::ServiceConfig};
use serde_json::{json, Value};
use settlement_engine::{
    db_types::InventoryMode,
    settlement_objects::SettlementOptions,
    CheckoutDetails,
    InventoryManagement,
    LookupError,
    SettlementApi,
    SqliteDatabase,
};

use super::{
    helpers::{post_json, TestStore, IDENTITY_HEADER},
    mocks::MockLookup,
};
use crate::{auth::IdentityHeader, data_objects::ConfirmPurchaseResponse, routes::ConfirmCheckoutRoute};

const PATH: &str = "/api/checkout/confirm";

fn configure(api: SettlementApi<SqliteDatabase, MockLookup>) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg: &mut ServiceConfig| {
        cfg.app_data(web::Data::new(api))
            .app_data(web::Data::new(IdentityHeader(IDENTITY_HEADER.to_string())))
            .service(web::scope("/api").service(ConfirmCheckoutRoute::<SqliteDatabase, MockLookup>::new()));
    }
}

fn request(quantity: i64) -> Value {
    json!({ "sessionToken": "cs_1", "ticketTypeId": "tt_42", "quantity": quantity })
}

fn paid_checkout() -> CheckoutDetails {
    let mut checkout = CheckoutDetails::new("cs_1");
    checkout.status = Some("complete".into());
    checkout.payment_reference = Some("TXN-1".into());
    checkout.metadata.insert("ticket_type_id".into(), "tt_42".into());
    checkout
}

fn lookup_returning(checkout: Option<CheckoutDetails>, times: usize) -> MockLookup {
    let mut lookup = MockLookup::new();
    lookup.expect_fetch_checkout().times(times).returning(move |_| Ok(checkout.clone()));
    lookup.expect_fetch_customer_email().never();
    lookup
}

async fn confirm(api: SettlementApi<SqliteDatabase, MockLookup>, user: &str, body: &Value) -> (StatusCode, String) {
    let headers = if user.is_empty() { vec![] } else { vec![(IDENTITY_HEADER, user)] };
    post_json(PATH, &headers, body, configure(api)).await
}

#[actix_web::test]
async fn missing_identity_is_unauthorized() {
    let store = TestStore::new().await;
    let api = store.api(lookup_returning(Some(paid_checkout()), 0));
    let (status, body) = confirm(api, "", &request(2)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("x-tkt-user-id"));
    store.cleanup().await;
}

#[actix_web::test]
async fn unknown_user_is_unauthorized() {
    let store = TestStore::new().await;
    let api = store.api(lookup_returning(Some(paid_checkout()), 0));
    let (status, _) = confirm(api, "u_nobody", &request(2)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    store.cleanup().await;
}

#[actix_web::test]
async fn confirm_settles_once() {
    let store = TestStore::new().await;
    let (status, body) = confirm(store.api(lookup_returning(Some(paid_checkout()), 1)), "u_9", &request(2)).await;
    assert_eq!(status, StatusCode::OK);
    let first: ConfirmPurchaseResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(first.ticket_ids.len(), 2);
    assert!(!first.already_settled);

    let (status, body) = confirm(store.api(lookup_returning(Some(paid_checkout()), 1)), "u_9", &request(2)).await;
    assert_eq!(status, StatusCode::OK);
    let second: ConfirmPurchaseResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(second.order_id, first.order_id);
    assert_eq!(second.ticket_ids, first.ticket_ids);
    assert!(second.already_settled);

    let tt = store.db.fetch_ticket_type(&"tt_42".into()).await.unwrap().unwrap();
    assert_eq!(tt.available_quantity, 3);
    store.cleanup().await;
}

#[actix_web::test]
async fn response_uses_camel_case() {
    let store = TestStore::new().await;
    let (status, body) = confirm(store.api(lookup_returning(Some(paid_checkout()), 1)), "u_9", &request(1)).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["orderId"].is_i64());
    assert_eq!(body["ticketIds"].as_array().unwrap().len(), 1);
    assert_eq!(body["alreadySettled"], false);
    store.cleanup().await;
}

#[actix_web::test]
async fn unpaid_checkout_is_rejected() {
    let store = TestStore::new().await;
    let mut checkout = paid_checkout();
    checkout.status = Some("open".into());
    let (status, body) = confirm(store.api(lookup_returning(Some(checkout), 1)), "u_9", &request(2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("has not been paid"));
    store.cleanup().await;
}

#[actix_web::test]
async fn unknown_session_is_not_found() {
    let store = TestStore::new().await;
    let (status, _) = confirm(store.api(lookup_returning(None, 1)), "u_9", &request(2)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    store.cleanup().await;
}

#[actix_web::test]
async fn conflicting_ticket_type_is_rejected() {
    let store = TestStore::new().await;
    let mut checkout = paid_checkout();
    checkout.metadata.insert("ticket_type_id".into(), "tt_7".into());
    let (status, body) = confirm(store.api(lookup_returning(Some(checkout), 1)), "u_9", &request(2)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("tt_7"));
    let tt = store.db.fetch_ticket_type(&"tt_42".into()).await.unwrap().unwrap();
    assert_eq!(tt.available_quantity, 5);
    store.cleanup().await;
}

#[actix_web::test]
async fn invalid_quantities_never_reach_the_provider() {
    let store = TestStore::new().await;
    for quantity in [0, -1, 21] {
        let (status, _) = confirm(store.api(lookup_returning(Some(paid_checkout()), 0)), "u_9", &request(quantity)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "quantity {quantity}");
    }
    store.cleanup().await;
}

#[actix_web::test]
async fn provider_timeouts_are_unavailable() {
    let store = TestStore::new().await;
    let mut lookup = MockLookup::new();
    lookup.expect_fetch_checkout().times(1).returning(|_| Err(LookupError::Timeout("5000ms".into())));
    let (status, _) = confirm(store.api(lookup), "u_9", &request(2)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    store.cleanup().await;
}

#[actix_web::test]
async fn strict_mode_refuses_to_oversell() {
    let store = TestStore::new().await;
    let options = SettlementOptions::default().with_inventory_mode(InventoryMode::Strict);
    let api = store.api_with_options(lookup_returning(Some(paid_checkout()), 1), options);
    let (status, body) = confirm(api, "u_9", &request(6)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Only 5 tickets"));
    let tt = store.db.fetch_ticket_type(&"tt_42".into()).await.unwrap().unwrap();
    assert_eq!(tt.available_quantity, 5);
    store.cleanup().await;
}
