use cucumber::{given, then, when};
use settlement_engine::{
    db_types::{Cents, InventoryMode, NewTicketType},
    settlement_objects::{CompletionKind, CompletionRecord},
    SettlementLedger,
};

use crate::{cucumber::SettlementWorld, support::TestSystem};

#[given(expr = "a fresh settlement engine in {word} mode")]
async fn fresh_engine(world: &mut SettlementWorld, mode: String) {
    let mode: InventoryMode = mode.parse().expect("Not an inventory mode");
    world.system = Some(TestSystem::new(mode).await);
}

#[given(expr = "the provider knows customer {string} as {string}")]
async fn provider_customer(world: &mut SettlementWorld, customer: String, email: String) {
    world.system().lookup.add_customer(&customer, &email);
}

#[given(expr = "ticket type {string} priced {int} with fee {int} and {int} available")]
async fn ticket_type(world: &mut SettlementWorld, id: String, price: i64, fee: i64, quantity: i64) {
    world.system().add_ticket_type(&id, price, fee, quantity).await;
}

#[given(expr = "ticket type {string} priced {int} with fee {int} and {int} available, mapped to product {string}")]
async fn mapped_ticket_type(world: &mut SettlementWorld, id: String, price: i64, fee: i64, quantity: i64, product: String) {
    let tt = NewTicketType::new(id.as_str(), "ev_1", "General Admission", Cents::from(price), quantity)
        .with_fee(Cents::from(fee))
        .with_external_product_id(product);
    world.system().inventory.create_ticket_type(tt).await.expect("Error creating ticket type");
}

async fn deliver(world: &mut SettlementWorld, record: CompletionRecord) {
    let result = world.system().api.process_completion(record).await;
    world.last_result = Some(result);
}

#[when(expr = "payment {string} arrives from customer {string} for product {string}")]
async fn payment_for_product(world: &mut SettlementWorld, txn: String, customer: String, product: String) {
    let record = CompletionRecord::new(CompletionKind::PaymentConfirmed, txn).with_customer(customer).with_product(product);
    deliver(world, record).await;
}

#[when(expr = "payment {string} arrives from customer {string} for product {string} with return url {string}")]
async fn payment_for_product_with_url(
    world: &mut SettlementWorld,
    txn: String,
    customer: String,
    product: String,
    url: String,
) {
    let record = CompletionRecord::new(CompletionKind::PaymentConfirmed, txn)
        .with_customer(customer)
        .with_product(product)
        .with_return_url(url);
    deliver(world, record).await;
}

#[when(expr = "payment {string} arrives from customer {string} with return url {string}")]
async fn payment_with_url(world: &mut SettlementWorld, txn: String, customer: String, url: String) {
    let record = CompletionRecord::new(CompletionKind::PaymentConfirmed, txn).with_customer(customer).with_return_url(url);
    deliver(world, record).await;
}

#[when(expr = "checkout {string} completes for customer {string} and product {string}")]
async fn checkout_for_product(world: &mut SettlementWorld, checkout: String, customer: String, product: String) {
    let record = CompletionRecord::new(CompletionKind::CheckoutCompleted, checkout)
        .with_status("complete")
        .with_customer(customer)
        .with_product(product);
    deliver(world, record).await;
}

#[then(expr = "the settlement outcome is {word}")]
async fn outcome_is(world: &mut SettlementWorld, outcome: String) {
    let result = world.last_result().as_ref().expect("Settlement failed");
    assert_eq!(format!("{:?}", result.outcome), outcome);
}

#[then(expr = "settlement fails with {word}")]
async fn fails_with(world: &mut SettlementWorld, error: String) {
    let err = world.last_result().as_ref().expect_err("Settlement should have failed");
    assert!(format!("{err:?}").starts_with(&error), "Unexpected error {err:?}");
}

#[then(expr = "the settled order is for {string}")]
async fn settled_order_ref(world: &mut SettlementWorld, txn: String) {
    let result = world.last_result().as_ref().expect("Settlement failed");
    assert_eq!(result.order.external_ref, txn);
}

#[then(expr = "the order for {string} has a total of {int}")]
async fn order_total(world: &mut SettlementWorld, txn: String, total: i64) {
    let order = world.system().db().fetch_order_by_external_ref(&txn).await.unwrap().expect("Order does not exist");
    assert_eq!(order.total, Cents::from(total));
}

#[then(expr = "the order for {string} has {int} tickets priced {int}")]
async fn order_tickets(world: &mut SettlementWorld, txn: String, count: usize, price: i64) {
    let db = world.system().db();
    let order = db.fetch_order_by_external_ref(&txn).await.unwrap().expect("Order does not exist");
    let tickets = db.fetch_tickets_for_order(order.id).await.unwrap();
    assert_eq!(tickets.len(), count);
    assert!(tickets.iter().all(|t| t.price == Cents::from(price)));
}

#[then(expr = "ticket type {string} has {int} available")]
async fn available(world: &mut SettlementWorld, id: String, quantity: i64) {
    assert_eq!(world.system().ticket_type(&id).await.available_quantity, quantity);
}

#[then(expr = "there is/are {int} order(s)")]
async fn order_count(world: &mut SettlementWorld, count: i64) {
    assert_eq!(world.system().order_count().await, count);
}

#[then(expr = "there is/are {int} ticket(s)")]
async fn ticket_count(world: &mut SettlementWorld, count: i64) {
    assert_eq!(world.system().ticket_count().await, count);
}
