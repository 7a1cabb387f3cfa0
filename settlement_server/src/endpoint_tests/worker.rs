use std::time::Duration;

use mockall::Sequence;
use serde_json::json;
use settlement_engine::{
    db_types::InventoryMode,
    settlement_objects::{CompletionKind, CompletionRecord, SettlementOptions, SettlementOutcome},
    InventoryManagement,
    LookupError,
    SettlementError,
    SettlementLedger,
    UserDirectory,
};

use super::{helpers::TestStore, mocks::MockLookup};
use crate::{
    config::RetryPolicy,
    dispatcher::{process_job, start_settlement_worker, JobOutcome, SettlementJob, SettlementQueue},
};

fn no_delay(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::ZERO)
}

fn payment(external_ref: &str, customer: &str) -> CompletionRecord {
    CompletionRecord::new(CompletionKind::PaymentConfirmed, external_ref)
        .with_customer(customer)
        .with_product("prod_42")
        .with_return_url("https://t.test/event/my-show/success?quantity=2")
}

fn email_lookup(email: Option<&'static str>, times: usize) -> MockLookup {
    let mut lookup = MockLookup::new();
    lookup.expect_fetch_customer_email().times(times).returning(move |_| Ok(email.map(String::from)));
    lookup.expect_fetch_checkout().never();
    lookup
}

#[actix_web::test]
async fn resolvable_payments_are_settled() {
    let store = TestStore::new().await;
    let api = store.api(email_lookup(Some("ada@example.com"), 1));
    let job = SettlementJob::new(payment("TXN-1", "cus_7"));
    let result = match process_job(&api, job, no_delay(3)).await {
        JobOutcome::Settled(result) => result,
        JobOutcome::Unresolved { error, .. } => panic!("Expected a settlement, got {error}"),
    };
    assert_eq!(result.outcome, SettlementOutcome::Created);
    assert_eq!(result.ticket_ids.len(), 2);
    assert_eq!(result.order.user_id, store.user.id);
    // The customer is linked on first match, so later notifications skip the email lookup
    let linked = store.db.fetch_user_for_customer_ref("cus_7").await.unwrap();
    assert_eq!(linked.map(|u| u.id), Some(store.user.id.clone()));
    store.cleanup().await;
}

#[actix_web::test]
async fn unresolvable_payments_end_up_in_the_reconciliation_log() {
    let store = TestStore::new().await;
    let api = store.api(email_lookup(None, 3));
    let mut record = payment("TXN-2", "cus_unknown");
    record.raw = json!({ "type": "payment.confirmed", "data": { "id": "TXN-2" } });
    let outcome = process_job(&api, SettlementJob::new(record), no_delay(3)).await;
    let JobOutcome::Unresolved { error, attempts, log_id } = outcome else {
        panic!("Expected the job to be given up on");
    };
    assert!(matches!(error, SettlementError::IdentityUnresolved { .. }));
    assert_eq!(attempts, 3);
    assert!(log_id.is_some());

    let log = store.db.fetch_unresolved_notifications().await.unwrap();
    assert_eq!(log.len(), 1);
    let entry = &log[0];
    assert_eq!(Some(entry.id), log_id);
    assert_eq!(entry.external_ref, "TXN-2");
    assert_eq!(entry.kind, "payment.confirmed");
    assert_eq!(entry.attempts, 3);
    assert!(entry.reason.contains("cus_unknown"));
    assert!(entry.payload.contains("TXN-2"));
    assert!(store.db.fetch_order_by_external_ref("TXN-2").await.unwrap().is_none());
    store.cleanup().await;
}

#[actix_web::test]
async fn permanent_failures_are_not_retried() {
    let store = TestStore::new().await;
    let options = SettlementOptions::default().with_inventory_mode(InventoryMode::Strict);
    let api = store.api_with_options(email_lookup(Some("ada@example.com"), 1), options);
    let record = CompletionRecord::new(CompletionKind::PaymentConfirmed, "TXN-3")
        .with_customer("cus_7")
        .with_metadata("ticket_type_id", "tt_42")
        .with_return_url("https://t.test/event/my-show/success?quantity=9");
    let outcome = process_job(&api, SettlementJob::new(record), no_delay(3)).await;
    let JobOutcome::Unresolved { error, attempts, .. } = outcome else {
        panic!("Expected the job to be given up on");
    };
    assert!(matches!(error, SettlementError::InsufficientInventory { .. }));
    assert_eq!(attempts, 1);
    let tt = store.db.fetch_ticket_type(&"tt_42".into()).await.unwrap().unwrap();
    assert_eq!(tt.available_quantity, 5);
    assert_eq!(store.db.fetch_unresolved_notifications().await.unwrap().len(), 1);
    store.cleanup().await;
}

#[actix_web::test]
async fn transient_failures_are_retried() {
    let store = TestStore::new().await;
    let mut lookup = MockLookup::new();
    let mut seq = Sequence::new();
    lookup
        .expect_fetch_customer_email()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(LookupError::Timeout("5000ms".into())));
    lookup
        .expect_fetch_customer_email()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(Some("ada@example.com".into())));
    let api = store.api(lookup);
    let outcome = process_job(&api, SettlementJob::new(payment("TXN-4", "cus_7")), no_delay(3)).await;
    let JobOutcome::Settled(result) = outcome else {
        panic!("Expected the retry to succeed");
    };
    assert!(result.is_new());
    assert!(store.db.fetch_unresolved_notifications().await.unwrap().is_empty());
    store.cleanup().await;
}

#[actix_web::test]
async fn settled_references_are_not_settled_twice() {
    let store = TestStore::new().await;
    let api = store.api(email_lookup(Some("ada@example.com"), 1));
    let first = process_job(&api, SettlementJob::new(payment("TXN-5", "cus_7")), no_delay(1)).await;
    let second = process_job(&api, SettlementJob::new(payment("TXN-5", "cus_7")), no_delay(1)).await;
    let (JobOutcome::Settled(first), JobOutcome::Settled(second)) = (first, second) else {
        panic!("Expected both jobs to settle");
    };
    assert_eq!(first.order_id(), second.order_id());
    assert_eq!(second.outcome, SettlementOutcome::AlreadySettled);
    let tt = store.db.fetch_ticket_type(&"tt_42".into()).await.unwrap().unwrap();
    assert_eq!(tt.available_quantity, 3);
    store.cleanup().await;
}

#[actix_web::test]
async fn worker_drains_the_queue() {
    let store = TestStore::new().await;
    let (queue, jobs) = SettlementQueue::new(8);
    let worker = start_settlement_worker(store.api(email_lookup(Some("ada@example.com"), 1)), jobs, no_delay(3));
    queue.schedule(payment("TXN-6", "cus_7")).await.expect("Could not schedule job");

    let mut order = None;
    for _ in 0..100 {
        order = store.db.fetch_order_by_external_ref("TXN-6").await.unwrap();
        if order.is_some() {
            break;
        }
        actix_web::rt::time::sleep(Duration::from_millis(20)).await;
    }
    let order = order.expect("The worker did not settle the job");
    assert_eq!(order.quantity, 2);

    drop(queue);
    worker.await.expect("Worker panicked");
    store.cleanup().await;
}
