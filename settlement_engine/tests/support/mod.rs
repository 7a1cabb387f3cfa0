#![allow(dead_code)]
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
        Mutex,
    },
};

use settlement_engine::{
    db_types::{Cents, InventoryMode, NewEvent, NewTicketType, NewUser, TicketType, User},
    events::EventProducers,
    settlement_objects::SettlementOptions,
    test_utils::prepare_env::{prepare_test_db, random_db_path},
    CheckoutDetails,
    CheckoutLookup,
    InventoryApi,
    InventoryManagement,
    LookupError,
    SettlementApi,
    SqliteDatabase,
    UserDirectory,
};

/// An in-memory stand-in for the payment provider.
#[derive(Clone, Default)]
pub struct StubLookup {
    emails: Arc<Mutex<HashMap<String, String>>>,
    checkouts: Arc<Mutex<HashMap<String, CheckoutDetails>>>,
    failure: Arc<Mutex<Option<LookupError>>>,
    pub checkout_calls: Arc<AtomicUsize>,
    pub customer_calls: Arc<AtomicUsize>,
    pub search_calls: Arc<AtomicUsize>,
}

impl StubLookup {
    pub fn add_customer(&self, customer_ref: &str, email: &str) {
        self.emails.lock().unwrap().insert(customer_ref.to_string(), email.to_string());
    }

    pub fn add_checkout(&self, checkout: CheckoutDetails) {
        self.checkouts.lock().unwrap().insert(checkout.id.clone(), checkout);
    }

    pub fn fail_with(&self, error: Option<LookupError>) {
        *self.failure.lock().unwrap() = error;
    }

    fn check_failure(&self) -> Result<(), LookupError> {
        match self.failure.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl CheckoutLookup for StubLookup {
    async fn fetch_customer_email(&self, customer_ref: &str) -> Result<Option<String>, LookupError> {
        self.customer_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.emails.lock().unwrap().get(customer_ref).cloned())
    }

    async fn find_customer_refs(&self, email: &str) -> Result<Vec<String>, LookupError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let emails = self.emails.lock().unwrap();
        let mut refs =
            emails.iter().filter(|(_, e)| e.eq_ignore_ascii_case(email)).map(|(cref, _)| cref.clone()).collect::<Vec<_>>();
        refs.sort();
        Ok(refs)
    }

    async fn fetch_checkout(&self, checkout_id: &str) -> Result<Option<CheckoutDetails>, LookupError> {
        self.checkout_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        Ok(self.checkouts.lock().unwrap().get(checkout_id).cloned())
    }
}

pub struct TestSystem {
    pub db_path: String,
    pub api: SettlementApi<SqliteDatabase, StubLookup>,
    pub inventory: InventoryApi<SqliteDatabase>,
    pub lookup: StubLookup,
    pub user: User,
}

impl std::fmt::Debug for TestSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TestSystem ({})", self.db_path)
    }
}

impl TestSystem {
    pub async fn new(mode: InventoryMode) -> Self {
        dotenvy::from_filename(".env.test").ok();
        let _ = env_logger::try_init();
        let db_path = random_db_path();
        let db = prepare_test_db(&db_path).await.expect("Error preparing test database");
        let lookup = StubLookup::default();
        let options = SettlementOptions::default().with_inventory_mode(mode);
        let api = SettlementApi::new(db.clone(), lookup.clone(), options);
        let inventory = InventoryApi::new(db.clone());
        inventory.create_event(NewEvent::new("ev_1", "my-show", "My Show")).await.expect("Error creating event");
        let user = db_user(&db, NewUser::new("u_9", "Ada Lovelace", "ada@example.com")).await;
        Self { db_path, api, inventory, lookup, user }
    }

    pub fn with_producers(self, producers: EventProducers) -> Self {
        let TestSystem { db_path, api, inventory, lookup, user } = self;
        Self { db_path, api: api.with_producers(producers), inventory, lookup, user }
    }

    pub fn db(&self) -> &SqliteDatabase {
        self.api.db()
    }

    pub async fn add_ticket_type(&self, id: &str, price: i64, fee: i64, quantity: i64) -> TicketType {
        let tt = NewTicketType::new(id, "ev_1", "General Admission", Cents::from(price), quantity)
            .with_fee(Cents::from(fee));
        self.inventory.create_ticket_type(tt).await.expect("Error creating ticket type")
    }

    pub async fn add_mapped_ticket_type(&self, id: &str, product: &str, price: i64, quantity: i64) -> TicketType {
        let tt = NewTicketType::new(id, "ev_1", "Mapped", Cents::from(price), quantity).with_external_product_id(product);
        self.inventory.create_ticket_type(tt).await.expect("Error creating ticket type")
    }

    pub async fn ticket_type(&self, id: &str) -> TicketType {
        self.db().fetch_ticket_type(&id.into()).await.unwrap().expect("ticket type should exist")
    }

    pub async fn order_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(self.db().pool()).await.unwrap()
    }

    pub async fn ticket_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM tickets").fetch_one(self.db().pool()).await.unwrap()
    }

    pub async fn link_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM customer_links").fetch_one(self.db().pool()).await.unwrap()
    }

    pub async fn cleanup(mut self) {
        let _ = self.api.db_mut().close().await;
        settlement_engine::test_utils::prepare_env::drop_database(&self.db_path).await;
    }
}

async fn db_user(db: &SqliteDatabase, user: NewUser) -> User {
    db.insert_user(user).await.expect("Error creating user")
}
