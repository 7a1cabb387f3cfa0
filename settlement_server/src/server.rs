use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use provider_tools::ProviderApi;
use settlement_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    auth::IdentityHeader,
    config::ServerConfig,
    dispatcher::{start_settlement_worker, SettlementQueue, DEFAULT_QUEUE_SIZE},
    errors::ServerError,
    integrations::provider::ProviderLookup,
    middleware::{HmacMiddlewareFactory, WhitelistMiddlewareFactory},
    routes::{health, ConfirmCheckoutRoute},
    webhook_routes::ProviderWebhookRoute,
};

const EVENT_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not migrate the database. {e}")))?;
    let provider = ProviderApi::new(config.provider.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let lookup = ProviderLookup::new(provider);

    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, settlement_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let (queue, jobs) = SettlementQueue::new(DEFAULT_QUEUE_SIZE);
    let worker_api =
        SettlementApi::new(db.clone(), lookup.clone(), config.settlement.clone()).with_producers(producers.clone());
    let _worker = start_settlement_worker(worker_api, jobs, config.retry_policy);

    let srv = create_server_instance(config, db, lookup, producers, queue)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    lookup: ProviderLookup,
    producers: EventProducers,
    queue: SettlementQueue,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let settlement_api = SettlementApi::new(db.clone(), lookup.clone(), config.settlement.clone())
            .with_producers(producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("tkt::access_log"))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(queue.clone()))
            .app_data(web::Data::new(IdentityHeader(config.identity_header.clone())));
        let api_scope = web::scope("/api").service(ConfirmCheckoutRoute::<SqliteDatabase, ProviderLookup>::new());
        let webhook_scope = web::scope("/provider")
            .wrap(HmacMiddlewareFactory::new(
                &config.webhook.hmac_header,
                config.webhook.hmac_secret.clone(),
                config.webhook.hmac_checks,
            ))
            .wrap(WhitelistMiddlewareFactory::new(
                config.webhook.whitelist.clone(),
                config.use_x_forwarded_for,
                config.use_forwarded,
            ))
            .service(ProviderWebhookRoute::<SqliteDatabase, ProviderLookup>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Hooks that run after every new settlement.
pub fn settlement_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_settled(|ev| {
        Box::pin(async move {
            info!(
                "📬️ Order #{} ({}) confirmed with {} ticket(s) for {}. {} left.",
                ev.order.id,
                ev.order.external_ref,
                ev.ticket_ids.len(),
                ev.order.total,
                ev.inventory.after
            );
            if ev.oversold() {
                warn!("📬️ Order #{} oversold its ticket type. Check the event's capacity.", ev.order.id);
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}
