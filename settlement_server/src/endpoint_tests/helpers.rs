use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use log::debug;
use serde_json::Value;
use settlement_engine::{
    db_types::{Cents, NewEvent, NewTicketType, NewUser, TicketType, User},
    settlement_objects::SettlementOptions,
    test_utils::prepare_env::{drop_database, prepare_test_db, random_db_path},
    InventoryApi,
    SettlementApi,
    SqliteDatabase,
    UserDirectory,
};
use tkt_common::Secret;

use super::mocks::MockLookup;
use crate::middleware::sign_body;

pub const WEBHOOK_SECRET: &str = "whsec_test_only";
pub const HMAC_HEADER: &str = "x-provider-signature";
pub const IDENTITY_HEADER: &str = "x-tkt-user-id";

/// A fresh database with one event (`ev_1`, slug `my-show`), one ticket type (`tt_42`: 1000 + 100 fee, 5 available,
/// mapped to product `prod_42`) and one user (`u_9`, ada@example.com).
pub struct TestStore {
    pub url: String,
    pub db: SqliteDatabase,
    pub ticket_type: TicketType,
    pub user: User,
}

impl TestStore {
    pub async fn new() -> Self {
        let _ = env_logger::try_init();
        let url = random_db_path();
        let db = prepare_test_db(&url).await.expect("Error preparing test database");
        let inventory = InventoryApi::new(db.clone());
        inventory.create_event(NewEvent::new("ev_1", "my-show", "My Show")).await.expect("Error creating event");
        let ticket_type = NewTicketType::new("tt_42", "ev_1", "General Admission", Cents::from(1000), 5)
            .with_fee(Cents::from(100))
            .with_external_product_id("prod_42");
        let ticket_type = inventory.create_ticket_type(ticket_type).await.expect("Error creating ticket type");
        let user =
            db.insert_user(NewUser::new("u_9", "Ada Lovelace", "ada@example.com")).await.expect("Error creating user");
        Self { url, db, ticket_type, user }
    }

    pub fn api(&self, lookup: MockLookup) -> SettlementApi<SqliteDatabase, MockLookup> {
        self.api_with_options(lookup, SettlementOptions::default())
    }

    pub fn api_with_options(
        &self,
        lookup: MockLookup,
        options: SettlementOptions,
    ) -> SettlementApi<SqliteDatabase, MockLookup> {
        SettlementApi::new(self.db.clone(), lookup, options)
    }

    pub async fn cleanup(self) {
        let mut db = self.db;
        let _ = db.close().await;
        drop_database(&self.url).await;
    }
}

pub fn sign(body: &str) -> String {
    sign_body(&Secret::new(WEBHOOK_SECRET.to_string()), body.as_bytes()).expect("HMAC failed")
}

/// Posts `body` to `path` on an app built by `configure`, returning the status and body of the response.
///
/// Errors raised by middleware are turned into their response status, the same way the server would.
pub async fn post_json<F>(path: &str, headers: &[(&str, &str)], body: &Value, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let mut req = TestRequest::post().uri(path).peer_addr("10.0.0.1:443".parse().unwrap());
    for (name, value) in headers {
        req = req.insert_header((*name, *value));
    }
    let req = req.insert_header(("content-type", "application/json")).set_payload(body.to_string()).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request to {path}");
    match test::try_call_service(&service, req).await {
        Ok(res) => {
            let (_, res) = res.into_parts();
            let status = res.status();
            let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
            (status, body)
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}
