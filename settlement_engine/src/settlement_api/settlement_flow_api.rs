use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewOrder, Order, TicketType, User, UserId},
    events::{EventProducers, OrderSettledEvent},
    helpers::parse_return_url,
    settlement_api::{
        errors::SettlementError,
        idempotency::IdempotencyGuard,
        identity_resolver::IdentityResolver,
        settlement_objects::{
            CompletionRecord,
            ConfirmPurchase,
            ResolvedIdentity,
            SettlementOptions,
            SettlementOutcome,
            SettlementResult,
        },
    },
    traits::{
        CheckoutDetails,
        CheckoutLookup,
        InsertSettlementResult,
        InventoryManagement,
        SettlementLedger,
        UserDirectory,
    },
};

/// `SettlementApi` turns paid checkouts into orders and tickets.
///
/// There are two ways in:
/// * [`Self::process_completion`] handles notifications pushed by the payment provider.
/// * [`Self::confirm_purchase`] handles the client confirming a checkout after it is redirected back.
///
/// Both run the same idempotency checks, so whichever arrives first settles the purchase and the other gets the
/// existing order back.
pub struct SettlementApi<B, L> {
    db: B,
    lookup: L,
    options: SettlementOptions,
    producers: EventProducers,
}

impl<B, L> Debug for SettlementApi<B, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi ({:?})", self.options)
    }
}

impl<B, L> SettlementApi<B, L> {
    pub fn new(db: B, lookup: L, options: SettlementOptions) -> Self {
        Self { db, lookup, options, producers: EventProducers::default() }
    }

    pub fn with_producers(mut self, producers: EventProducers) -> Self {
        self.producers = producers;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn options(&self) -> &SettlementOptions {
        &self.options
    }
}

impl<B, L> SettlementApi<B, L>
where
    B: InventoryManagement + SettlementLedger + UserDirectory,
    L: CheckoutLookup,
{
    fn guard(&self) -> IdempotencyGuard<'_, B> {
        IdempotencyGuard::new(&self.db, self.options.duplicate_window)
    }

    /// If `external_ref` has already been settled, returns that order and its tickets.
    pub async fn already_settled(&self, external_ref: &str) -> Result<Option<SettlementResult>, SettlementError> {
        match self.guard().already_settled(external_ref).await? {
            Some(order) => Ok(Some(self.existing(order, SettlementOutcome::AlreadySettled).await?)),
            None => Ok(None),
        }
    }

    /// See [`IdempotencyGuard::recent_duplicate`].
    pub async fn recent_duplicate(
        &self,
        user: &User,
        ticket_type: &TicketType,
        external_ref: &str,
    ) -> Result<Option<SettlementResult>, SettlementError> {
        match self.guard().recent_duplicate(&user.id, &ticket_type.event_id, external_ref).await? {
            Some(order) => Ok(Some(self.existing(order, SettlementOutcome::RecentDuplicate).await?)),
            None => Ok(None),
        }
    }

    pub async fn resolve_identity(&self, record: &CompletionRecord) -> Result<ResolvedIdentity, SettlementError> {
        IdentityResolver::new(&self.db, &self.lookup).resolve(record).await
    }

    /// Writes the order, its tickets and the inventory decrement as one unit.
    ///
    /// If another caller settles the same reference first, their order is returned with
    /// [`SettlementOutcome::AlreadySettled`]. Dropping the returned future before it resolves rolls the transaction
    /// back, so an abandoned request leaves nothing behind.
    ///
    /// The purchase has already been paid for, so any positive quantity is settled. The `max_quantity` limit only
    /// applies to client confirmations.
    pub async fn settle(
        &self,
        user: &User,
        ticket_type: &TicketType,
        quantity: i64,
        external_ref: &str,
    ) -> Result<SettlementResult, SettlementError> {
        if quantity < 1 {
            return Err(SettlementError::InvalidQuantity { requested: quantity, max: self.options.max_quantity });
        }
        let order =
            NewOrder::for_ticket_type(user.id.clone(), ticket_type, quantity, external_ref, self.options.currency.as_str());
        let total = order.total;
        match self.db.insert_settlement(order, user, ticket_type, self.options.inventory_mode).await? {
            InsertSettlementResult::Inserted(settled) => {
                let ticket_ids = settled.ticket_ids();
                info!(
                    "🎟️ Order #{} settled for {external_ref}: {quantity} x {} for user {} ({total})",
                    settled.order.id, ticket_type.id, user.id
                );
                if settled.inventory.oversold() {
                    warn!(
                        "🎟️ Order #{} oversold ticket type {}. Only {} tickets were left.",
                        settled.order.id, ticket_type.id, settled.inventory.before
                    );
                }
                let event = OrderSettledEvent::new(settled.order.clone(), ticket_ids.clone(), settled.inventory);
                self.producers.publish_order_settled(event).await;
                Ok(SettlementResult::new(settled.order, ticket_ids, SettlementOutcome::Created))
            },
            InsertSettlementResult::AlreadyExists(order) => {
                info!("🎟️ {external_ref} was settled concurrently as order #{}", order.id);
                self.existing(order, SettlementOutcome::AlreadySettled).await
            },
        }
    }

    /// Settles a payment provider notification.
    ///
    /// The checks run in this order: the reference has not been settled, the purchaser and ticket type can be
    /// resolved, the same user has not just bought tickets for the same event under another reference. Only then is
    /// anything written.
    pub async fn process_completion(&self, record: CompletionRecord) -> Result<SettlementResult, SettlementError> {
        let external_ref = record.external_ref.as_str();
        debug!("🎟️ Processing {} notification for {external_ref}", record.kind);
        if let Some(existing) = self.already_settled(external_ref).await? {
            return Ok(existing);
        }
        let identity = self.resolve_identity(&record).await?;
        if let Some(duplicate) = self.recent_duplicate(&identity.user, &identity.ticket_type, external_ref).await? {
            return Ok(duplicate);
        }
        self.settle(&identity.user, &identity.ticket_type, identity.quantity, external_ref).await
    }

    /// Settles a purchase the signed-in `user_id` confirms from the client.
    ///
    /// The checkout session is fetched from the provider and must be in a paid state. The ticket type and quantity in
    /// the request must agree with whatever the session itself records.
    pub async fn confirm_purchase(
        &self,
        user_id: &UserId,
        request: ConfirmPurchase,
    ) -> Result<SettlementResult, SettlementError> {
        self.validate_quantity(request.quantity)?;
        let user = self.db.fetch_user(user_id).await?.ok_or_else(|| SettlementError::UserNotFound(user_id.clone()))?;
        let checkout = self
            .lookup
            .fetch_checkout(&request.session_token)
            .await?
            .ok_or_else(|| SettlementError::CheckoutNotFound(request.session_token.clone()))?;
        if !checkout.has_status_in(&self.options.success_statuses) {
            return Err(SettlementError::PaymentIncomplete {
                checkout_id: checkout.id.clone(),
                status: checkout.status_description(),
            });
        }
        let external_ref = checkout.external_ref().to_string();
        if let Some(existing) = self.already_settled(&external_ref).await? {
            return Ok(existing);
        }
        let ticket_type = self
            .db
            .fetch_ticket_type(&request.ticket_type_id)
            .await?
            .ok_or_else(|| SettlementError::TicketTypeNotFound(request.ticket_type_id.clone()))?;
        check_request_against_checkout(&request, &checkout)?;
        if let Some(duplicate) = self.recent_duplicate(&user, &ticket_type, &external_ref).await? {
            return Ok(duplicate);
        }
        self.settle(&user, &ticket_type, request.quantity, &external_ref).await
    }

    fn validate_quantity(&self, quantity: i64) -> Result<(), SettlementError> {
        if quantity < 1 || quantity > self.options.max_quantity {
            return Err(SettlementError::InvalidQuantity { requested: quantity, max: self.options.max_quantity });
        }
        Ok(())
    }

    async fn existing(&self, order: Order, outcome: SettlementOutcome) -> Result<SettlementResult, SettlementError> {
        let ticket_ids = self.db.fetch_tickets_for_order(order.id).await?.into_iter().map(|t| t.id).collect();
        Ok(SettlementResult::new(order, ticket_ids, outcome))
    }
}

/// The session's metadata and return URL were written by us when the checkout was created, so they take precedence
/// over what the client claims.
fn check_request_against_checkout(request: &ConfirmPurchase, checkout: &CheckoutDetails) -> Result<(), SettlementError> {
    let mismatch = |reason: String| SettlementError::CheckoutMismatch { checkout_id: checkout.id.clone(), reason };
    if let Some(id) = checkout.metadata_ticket_type() {
        if id != request.ticket_type_id {
            return Err(mismatch(format!("The session was for ticket type {id}, not {}", request.ticket_type_id)));
        }
    }
    let hints = checkout.return_url.as_deref().and_then(parse_return_url).unwrap_or_default();
    if let Some(id) = hints.ticket_type_id {
        if id != request.ticket_type_id {
            return Err(mismatch(format!("The session was for ticket type {id}, not {}", request.ticket_type_id)));
        }
    }
    if let Some(quantity) = hints.quantity {
        if quantity != request.quantity {
            return Err(mismatch(format!("The session was for {quantity} tickets, not {}", request.quantity)));
        }
    }
    Ok(())
}
