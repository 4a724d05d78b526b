mod api;
mod config;
mod engine;
mod error;
mod events;
mod gateway;
mod models;
mod observability;
mod ratelimit;
mod state;
mod store;
mod workers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::engine::coordinator::Coordinator;
use crate::engine::policy::DeliveryTimePolicy;
use crate::error::ApiError;
use crate::events::consumer::EventConsumer;
use crate::events::processor::EventProcessor;
use crate::gateway::orders::OrderFeedClient;
use crate::gateway::status::OrderStatusGateway;
use crate::observability::metrics::Metrics;
use crate::ratelimit::limiter::TokenBucketLimiter;
use crate::state::AppState;
use crate::store::couriers::CourierStore;
use crate::store::deliveries::DeliveryStore;
use crate::store::tx::TxManager;
use crate::workers::poller::OrderPoller;
use crate::workers::sweeper::run_expiry_sweeper;

const API_RATE: f64 = 5.0;
const API_BURST: u32 = 5;
const API_RATE_TTL: Duration = Duration::from_secs(60);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = config::Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let metrics = Metrics::new();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.postgres.url())
        .await
        .map_err(|err| ApiError::Internal(format!("failed to connect to postgres: {err}")))?;

    let couriers = CourierStore::new(pool.clone());
    let deliveries = DeliveryStore::new(pool.clone());
    let tx = TxManager::new(pool.clone());
    let policy = DeliveryTimePolicy::new(
        config.delivery.on_foot,
        config.delivery.scooter,
        config.delivery.car,
    );
    let coordinator = Arc::new(Coordinator::new(
        couriers.clone(),
        deliveries,
        tx,
        policy,
        metrics.clone(),
    ));

    let limiter = TokenBucketLimiter::new(API_RATE, API_BURST, API_RATE_TTL);
    let state = Arc::new(AppState::new(
        couriers,
        coordinator.clone(),
        limiter,
        metrics.clone(),
    ));

    let app = api::router(state);

    let cancel = CancellationToken::new();
    let mut background: JoinSet<()> = JoinSet::new();

    match config.delivery.monitor_interval {
        Some(interval) => {
            background.spawn(run_expiry_sweeper(
                coordinator.clone(),
                metrics.clone(),
                interval,
                cancel.clone(),
            ));
        }
        None => tracing::warn!("delivery expiry sweeper disabled"),
    }

    if config.order_polling {
        let feed = OrderFeedClient::new(&config.order_service_host)
            .map_err(|err| ApiError::Internal(format!("failed to build order feed: {err}")))?;
        let poller = OrderPoller::new(feed, coordinator.clone());
        background.spawn(poller.run(cancel.clone()));
    }

    if config.kafka.enabled {
        let status_gateway = OrderStatusGateway::new(&config.order_service_http, metrics.clone())
            .map_err(|err| ApiError::Internal(format!("failed to build status gateway: {err}")))?;
        let processor = EventProcessor::new(status_gateway, coordinator.clone());
        let consumer = EventConsumer::new(&config.kafka)
            .map_err(|err| ApiError::Internal(format!("failed to build kafka consumer: {err}")))?;
        background.spawn(consumer.run(processor, cancel.clone()));
    }

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| ApiError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(port = config.port, "http server started");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|err| ApiError::Internal(format!("server error: {err}")))?;

    cancel.cancel();
    let drain = async {
        while background.join_next().await.is_some() {}
    };
    if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        tracing::warn!("background workers did not stop in time, aborting");
        background.shutdown().await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for shutdown signal");
        }
    };

    // orchestrators stop containers with SIGTERM
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for terminate signal");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
