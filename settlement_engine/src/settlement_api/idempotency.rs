//! Guards that stop a purchase from being settled twice.
//!
//! The primary guard is keyed on the provider's transaction reference and backed by the unique index on
//! `orders.external_ref`, so it holds under any interleaving. The secondary guard catches the case where one purchase
//! arrives under two different references (e.g. the checkout id via one channel and the payment id via another) in
//! quick succession. The second reference is then recorded as an alias of the first order, so a later redelivery
//! under it is caught by the primary guard even after the grace period has passed.
use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{EventId, Order, UserId},
    traits::{SettlementLedger, StoreError},
};

/// An earlier order under a different reference counts as a duplicate only if it is younger than this.
pub const RECENT_DUPLICATE_GRACE_SECONDS: i64 = 60;

pub struct IdempotencyGuard<'a, B> {
    db: &'a B,
    window: Duration,
}

impl<'a, B> IdempotencyGuard<'a, B>
where B: SettlementLedger
{
    pub fn new(db: &'a B, window: Duration) -> Self {
        Self { db, window }
    }

    /// Returns the order already created for `external_ref`, if there is one. References that were matched as recent
    /// duplicates of another order resolve to that order.
    pub async fn already_settled(&self, external_ref: &str) -> Result<Option<Order>, StoreError> {
        if let Some(order) = self.db.fetch_order_by_external_ref(external_ref).await? {
            debug!("🎟️ Reference {external_ref} was settled as order #{}", order.id);
            return Ok(Some(order));
        }
        let order = self.db.fetch_order_by_alias(external_ref).await?;
        if let Some(o) = &order {
            debug!("🎟️ Reference {external_ref} is an alias of order #{} ({})", o.id, o.external_ref);
        }
        Ok(order)
    }

    /// Returns the most recent order for this user and event if it falls inside the duplicate window and either
    /// carries the same reference or was created less than a minute ago.
    pub async fn recent_duplicate(
        &self,
        user_id: &UserId,
        event_id: &EventId,
        external_ref: &str,
    ) -> Result<Option<Order>, StoreError> {
        let Some(latest) = self.db.fetch_latest_order_for_user_event(user_id, event_id).await? else {
            return Ok(None);
        };
        let age = Utc::now() - latest.created_at;
        if age > self.window {
            return Ok(None);
        }
        let same_ref = latest.external_ref == external_ref;
        let very_recent = age < Duration::seconds(RECENT_DUPLICATE_GRACE_SECONDS);
        if same_ref || very_recent {
            info!(
                "🎟️ Order #{} ({}) for user {user_id} and event {event_id} was created {}s ago. Treating {external_ref} \
                 as a duplicate of it.",
                latest.id,
                latest.external_ref,
                age.num_seconds()
            );
            if !same_ref {
                self.db.record_reference_alias(external_ref, latest.id).await?;
            }
            Ok(Some(latest))
        } else {
            Ok(None)
        }
    }
}
