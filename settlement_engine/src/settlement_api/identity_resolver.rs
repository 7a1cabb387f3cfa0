//! Maps a completion record onto a platform user, a ticket type and a quantity.
//!
//! Ticket types are found by trying [`TICKET_TYPE_STRATEGIES`] in order and stopping at the first hit. Users are found
//! through the provider customer link first and by email second, and a successful email match is linked so that the
//! next lookup for that customer is direct. When the notification names the buyer by email only, the provider is
//! asked which of its customers hold that address, and those are linked instead.
//!
//! Notifications that only reference a checkout session have the session fetched at most once, and only when the
//! record is missing something a later step needs.
use log::*;

use crate::{
    db_types::{TicketType, User},
    helpers::{parse_return_url, ReturnUrlHints},
    settlement_api::{
        errors::SettlementError,
        settlement_objects::{CompletionRecord, ResolutionStrategy, ResolvedIdentity},
    },
    traits::{CheckoutLookup, InventoryManagement, UserDirectory},
};

/// The order in which ticket type resolution is attempted.
pub const TICKET_TYPE_STRATEGIES: [ResolutionStrategy; 4] = [
    ResolutionStrategy::ProductMapping,
    ResolutionStrategy::CheckoutMetadata,
    ResolutionStrategy::ReturnUrlTicketType,
    ResolutionStrategy::EventSlugFallback,
];

/// A ticket type match, and the quantity that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketTypeMatch {
    pub ticket_type: TicketType,
    pub quantity: i64,
    pub strategy: ResolutionStrategy,
}

/// The working state for one resolution. Holds a copy of the record that is enriched from the checkout session when
/// one has to be fetched.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    record: CompletionRecord,
    checkout_loaded: bool,
}

impl ResolutionContext {
    pub fn new(record: &CompletionRecord) -> Self {
        Self { record: record.clone(), checkout_loaded: false }
    }

    pub fn record(&self) -> &CompletionRecord {
        &self.record
    }

    fn return_url_hints(&self) -> ReturnUrlHints {
        self.record.return_url.as_deref().and_then(parse_return_url).unwrap_or_default()
    }

    /// Quantity comes from the return URL when it carries one. It is never inferred from the amount paid.
    pub fn quantity(&self) -> i64 {
        self.return_url_hints().quantity.unwrap_or(1)
    }

    fn lacks_user_details(&self) -> bool {
        self.record.customer_ref.is_none() && self.record.customer_email.is_none()
    }

    fn lacks_ticket_details(&self) -> bool {
        self.record.metadata_ticket_type().is_none() || self.record.return_url.is_none()
    }

    /// Fetches the referenced checkout session and merges it into the record. Does nothing if there is no checkout
    /// reference or if it has already been fetched.
    pub async fn load_checkout<L: CheckoutLookup>(&mut self, lookup: &L) -> Result<(), SettlementError> {
        if self.checkout_loaded {
            return Ok(());
        }
        let Some(checkout_id) = self.record.checkout_id.clone() else {
            return Ok(());
        };
        self.checkout_loaded = true;
        trace!("🔎️ Fetching checkout {checkout_id} to fill in {}", self.record.external_ref);
        match lookup.fetch_checkout(&checkout_id).await? {
            Some(checkout) => self.record.merge_checkout(&checkout),
            None => debug!("🔎️ Checkout {checkout_id} referenced by {} is unknown upstream", self.record.external_ref),
        }
        Ok(())
    }
}

pub struct IdentityResolver<'a, B, L> {
    db: &'a B,
    lookup: &'a L,
}

impl<'a, B, L> IdentityResolver<'a, B, L>
where
    B: InventoryManagement + UserDirectory,
    L: CheckoutLookup,
{
    pub fn new(db: &'a B, lookup: &'a L) -> Self {
        Self { db, lookup }
    }

    /// Resolve the user, ticket type and quantity for the record, or fail with
    /// [`SettlementError::IdentityUnresolved`]. Upstream failures are propagated as-is so that the caller can retry.
    pub async fn resolve(&self, record: &CompletionRecord) -> Result<ResolvedIdentity, SettlementError> {
        let mut context = ResolutionContext::new(record);
        let user = self.resolve_user(&mut context).await?;
        let matched = self.resolve_ticket_type(&mut context).await?;
        debug!(
            "🔎️ {} resolved to user {} and {} x ticket type {} via {}",
            record.external_ref, user.id, matched.quantity, matched.ticket_type.id, matched.strategy
        );
        Ok(ResolvedIdentity {
            user,
            ticket_type: matched.ticket_type,
            quantity: matched.quantity,
            strategy: matched.strategy,
        })
    }

    pub async fn resolve_user(&self, context: &mut ResolutionContext) -> Result<User, SettlementError> {
        if context.lacks_user_details() {
            context.load_checkout(self.lookup).await?;
        }
        let record = context.record();
        let customer_ref = record.customer_ref.clone();
        if let Some(cref) = &customer_ref {
            if let Some(user) = self.db.fetch_user_for_customer_ref(cref).await? {
                trace!("🔎️ Customer {cref} is linked to user {}", user.id);
                return Ok(user);
            }
        }
        let mut emails = Vec::with_capacity(2);
        if let Some(cref) = &customer_ref {
            if let Some(email) = self.lookup.fetch_customer_email(cref).await? {
                emails.push(email);
            }
        }
        if let Some(email) = &record.customer_email {
            if !emails.iter().any(|e| e.eq_ignore_ascii_case(email)) {
                emails.push(email.clone());
            }
        }
        for email in &emails {
            if let Some(user) = self.db.fetch_user_by_email(email).await? {
                match &customer_ref {
                    Some(cref) => {
                        self.db.link_customer_ref(cref, &user.id).await?;
                        info!("🔎️ Customer {cref} matched user {} by email and has been linked", user.id);
                    },
                    None => self.link_customers_by_email(email, &user).await?,
                }
                return Ok(user);
            }
        }
        Err(SettlementError::IdentityUnresolved {
            external_ref: record.external_ref.clone(),
            reason: match (&customer_ref, emails.is_empty()) {
                (None, true) => "The notification carries no customer reference or email address.".to_string(),
                (Some(cref), true) => format!("Customer {cref} is not linked and has no email address on file."),
                (_, false) => format!("No user is registered under {}.", emails.join(" or ")),
            },
        })
    }

    /// Links every provider customer registered under `email` to `user`. The user is already known at this point, so
    /// a failed provider search is logged and does not hold up the settlement.
    async fn link_customers_by_email(&self, email: &str, user: &User) -> Result<(), SettlementError> {
        let customer_refs = match self.lookup.find_customer_refs(email).await {
            Ok(refs) => refs,
            Err(e) => {
                warn!("🔎️ Could not search the provider for customers with email {email}. {e}");
                return Ok(());
            },
        };
        for cref in customer_refs {
            self.db.link_customer_ref(&cref, &user.id).await?;
            info!("🔎️ Customer {cref} is registered under {email} and has been linked to user {}", user.id);
        }
        Ok(())
    }

    pub async fn resolve_ticket_type(
        &self,
        context: &mut ResolutionContext,
    ) -> Result<TicketTypeMatch, SettlementError> {
        for strategy in TICKET_TYPE_STRATEGIES {
            if strategy != ResolutionStrategy::ProductMapping && context.lacks_ticket_details() {
                context.load_checkout(self.lookup).await?;
            }
            if let Some(ticket_type) = self.find_ticket_type(strategy, context).await? {
                return Ok(TicketTypeMatch { ticket_type, quantity: context.quantity(), strategy });
            }
            trace!("🔎️ {strategy} found nothing for {}", context.record().external_ref);
        }
        Err(SettlementError::IdentityUnresolved {
            external_ref: context.record().external_ref.clone(),
            reason: "No ticket type could be identified from the product, metadata or return URL.".to_string(),
        })
    }

    /// Runs a single resolution step against the context as it stands.
    pub async fn find_ticket_type(
        &self,
        strategy: ResolutionStrategy,
        context: &ResolutionContext,
    ) -> Result<Option<TicketType>, SettlementError> {
        let record = context.record();
        let found = match strategy {
            ResolutionStrategy::ProductMapping => match &record.product_ref {
                Some(product) => self.db.fetch_ticket_type_for_product(product).await?,
                None => None,
            },
            ResolutionStrategy::CheckoutMetadata => match record.metadata_ticket_type() {
                Some(id) => self.db.fetch_ticket_type(&id).await?,
                None => None,
            },
            ResolutionStrategy::ReturnUrlTicketType => match context.return_url_hints().ticket_type_id {
                Some(id) => self.db.fetch_ticket_type(&id).await?,
                None => None,
            },
            ResolutionStrategy::EventSlugFallback => match context.return_url_hints().event_slug {
                Some(slug) => self.single_active_ticket_type(&slug).await?,
                None => None,
            },
        };
        if let Some(tt) = &found {
            if !tt.active {
                warn!("🔎️ {} resolved to ticket type {}, which is no longer on sale", record.external_ref, tt.id);
            }
            if strategy.is_low_confidence() {
                warn!(
                    "🔎️ {} was matched to ticket type {} by event slug alone. This is a guess and should be checked.",
                    record.external_ref, tt.id
                );
            }
        }
        Ok(found)
    }

    async fn single_active_ticket_type(&self, slug: &str) -> Result<Option<TicketType>, SettlementError> {
        let Some(event) = self.db.fetch_event_by_slug(slug).await? else {
            return Ok(None);
        };
        let mut active =
            self.db.fetch_ticket_types_for_event(&event.id).await?.into_iter().filter(|t| t.active).collect::<Vec<_>>();
        if active.len() == 1 {
            Ok(active.pop())
        } else {
            debug!("🔎️ Event {slug} has {} active ticket types, so the slug alone is ambiguous", active.len());
            Ok(None)
        }
    }
}
