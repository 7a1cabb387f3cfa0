//! Background settlement of provider notifications.
//!
//! The webhook route acknowledges the provider as soon as a notification has been accepted onto the
//! [`SettlementQueue`]. A single worker task drains the queue and settles every job on its own task, so a slow
//! provider lookup for one notification does not hold up the others.
//!
//! Failed attempts are retried according to the [`RetryPolicy`] as long as the error is transient. Once the attempts
//! run out, or the error is one that will never go away, the notification is written to the reconciliation log so
//! that support staff can settle it by hand.
use std::rc::Rc;

use actix_web::rt::task::JoinHandle;
use log::*;
use settlement_engine::{
    db_types::NewUnresolvedNotification,
    settlement_objects::{CompletionRecord, SettlementResult},
    CheckoutLookup,
    SettlementApi,
    SettlementBackend,
    SettlementError,
};
use tokio::sync::mpsc;

use crate::{config::RetryPolicy, errors::ServerError};

pub const DEFAULT_QUEUE_SIZE: usize = 1024;

#[derive(Debug, Clone)]
pub struct SettlementJob {
    pub record: CompletionRecord,
}

impl SettlementJob {
    pub fn new(record: CompletionRecord) -> Self {
        Self { record }
    }
}

/// The sending half of the settlement queue. Cheap to clone; one copy lives in each HTTP worker.
#[derive(Debug, Clone)]
pub struct SettlementQueue {
    sender: mpsc::Sender<SettlementJob>,
}

impl SettlementQueue {
    pub fn new(buffer_size: usize) -> (Self, mpsc::Receiver<SettlementJob>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        (Self { sender }, receiver)
    }

    pub async fn schedule(&self, record: CompletionRecord) -> Result<(), ServerError> {
        let external_ref = record.external_ref.clone();
        self.sender.send(SettlementJob::new(record)).await.map_err(|e| {
            error!("🎟️ Could not schedule settlement of {external_ref}. {e}");
            ServerError::QueueClosed(e.to_string())
        })?;
        debug!("🎟️ Settlement of {external_ref} has been scheduled");
        Ok(())
    }
}

/// What became of a settlement job.
#[derive(Debug)]
pub enum JobOutcome {
    Settled(SettlementResult),
    /// The job was given up on. `log_id` is the reconciliation log entry, if one could be written.
    Unresolved { error: SettlementError, attempts: u32, log_id: Option<i64> },
}

/// Spawns the worker that drains the settlement queue. The worker stops once every [`SettlementQueue`] has been
/// dropped and the queue is empty.
///
/// Must be called from within an actix (or tokio `LocalSet`) runtime.
pub fn start_settlement_worker<B, L>(
    api: SettlementApi<B, L>,
    mut jobs: mpsc::Receiver<SettlementJob>,
    policy: RetryPolicy,
) -> JoinHandle<()>
where
    B: SettlementBackend + 'static,
    L: CheckoutLookup + 'static,
{
    let api = Rc::new(api);
    actix_web::rt::spawn(async move {
        info!("🎟️ Settlement worker started. Up to {} attempts per notification.", policy.max_attempts);
        while let Some(job) = jobs.recv().await {
            let api = Rc::clone(&api);
            actix_web::rt::spawn(async move {
                process_job(api.as_ref(), job, policy).await;
            });
        }
        info!("🎟️ Settlement queue closed. Worker is shutting down.");
    })
}

/// Settles a single job, retrying transient failures.
pub async fn process_job<B, L>(api: &SettlementApi<B, L>, job: SettlementJob, policy: RetryPolicy) -> JobOutcome
where
    B: SettlementBackend,
    L: CheckoutLookup,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;
    loop {
        attempts += 1;
        match api.process_completion(job.record.clone()).await {
            Ok(result) => {
                debug!(
                    "🎟️ {} notification {} settled as order #{} ({:?})",
                    job.record.kind,
                    job.record.external_ref,
                    result.order_id(),
                    result.outcome
                );
                return JobOutcome::Settled(result);
            },
            Err(e) if e.is_retryable() && attempts < max_attempts => {
                warn!(
                    "🎟️ Attempt {attempts} of {max_attempts} to settle {} failed. Retrying in {:?}. {e}",
                    job.record.external_ref, policy.delay
                );
                actix_web::rt::time::sleep(policy.delay).await;
            },
            Err(e) => return give_up(api, &job.record, e, attempts).await,
        }
    }
}

async fn give_up<B, L>(
    api: &SettlementApi<B, L>,
    record: &CompletionRecord,
    error: SettlementError,
    attempts: u32,
) -> JobOutcome
where
    B: SettlementBackend,
{
    error!(
        "🎟️ Giving up on {} notification {} after {attempts} attempt(s). {error}. Raw notification: {}",
        record.kind, record.external_ref, record.raw
    );
    let note = NewUnresolvedNotification {
        external_ref: record.external_ref.clone(),
        kind: record.kind.to_string(),
        reason: error.to_string(),
        payload: record.raw.to_string(),
        attempts: i64::from(attempts),
    };
    let log_id = match api.db().record_unresolved_notification(note).await {
        Ok(id) => {
            info!("🎟️ Notification {} was added to the reconciliation log as entry #{id}", record.external_ref);
            Some(id)
        },
        Err(e) => {
            error!("🎟️ Could not add {} to the reconciliation log. {e}", record.external_ref);
            None
        },
    };
    JobOutcome::Unresolved { error, attempts, log_id }
}
