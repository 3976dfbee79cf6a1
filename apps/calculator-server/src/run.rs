use std::sync::Arc;

use anyhow::{Context, Result};
use calculator::domain::readiness::wait_until_ready;
use calculator::events::{EventConsumer, EventIndex, EventPublisher};
use calculator::infra::broker;
use calculator::infra::storage::{self, MeteredHistoryStore, SeaOrmHistoryStore, StoreConnector};
use calculator::{CalculatorMetrics, CalculatorService};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::signals;

/// Gate on the store, wire the pipeline, serve until a shutdown signal.
///
/// # Errors
/// Returns an error if the store never becomes ready, migrations fail or the
/// listener cannot be bound.
pub async fn run_server(config: AppConfig) -> Result<()> {
    let calc = &config.calculator;
    let metrics = Arc::new(
        CalculatorMetrics::new(&calc.metrics.namespace).context("failed to register metrics")?,
    );

    tracing::info!(
        max_attempts = calc.readiness.max_attempts,
        interval = ?calc.readiness.interval,
        "Waiting for history store"
    );
    let connector = StoreConnector::new(calc.database.clone());
    if let Err(e) = wait_until_ready(|| connector.probe(), &calc.readiness, &metrics).await {
        tracing::error!(error = %e, "History store unavailable, refusing to start");
        return Err(e).context("history store did not become ready");
    }
    let db = connector
        .into_connection()
        .context("history store connection missing after readiness")?;
    storage::migrate(&db).await.context("schema migration failed")?;

    let store = MeteredHistoryStore::new(SeaOrmHistoryStore::new(db), metrics.clone());
    let broker = broker::connect(&calc.broker).context("failed to create message broker")?;
    tracing::info!(kind = ?calc.broker.kind, topic = %calc.broker.topic, "Message broker ready");

    let mut service = CalculatorService::new(Arc::new(store), metrics.clone());
    if calc.broker.publish_enabled {
        service = service.with_publisher(EventPublisher::new(broker.clone(), &calc.broker));
    } else {
        tracing::info!("Event publishing disabled");
    }

    let cancel = CancellationToken::new();
    let consumer = calc.consumer.enabled.then(|| {
        EventConsumer::new(
            broker.clone(),
            Arc::new(EventIndex::with_capacity(calc.consumer.index_capacity)),
            calc.broker.topic.clone(),
            calc.consumer.clone(),
            metrics.clone(),
        )
        .spawn(cancel.child_token())
    });

    let app = calculator::api::rest::router(Arc::new(service), metrics)
        .layer(TraceLayer::new_for_http());

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Calculator listening");

    let shutdown_listener = signals::spawn_shutdown_listener(cancel.clone());

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(cancel.clone().cancelled_owned())
        .await
        .context("HTTP server failed");

    // The consumer must stop even when serving failed.
    cancel.cancel();
    if let Ok(cause) = shutdown_listener.await {
        tracing::debug!(?cause, "Shutdown listener finished");
    }
    if let Some(consumer) = consumer {
        if let Err(e) = consumer.join().await {
            tracing::error!(error = %e, "Event consumer task panicked");
        }
    }

    tracing::info!("Calculator stopped");
    served
}

/// Print the effective configuration without serving.
///
/// # Errors
/// Returns an error if the configuration cannot be rendered.
pub fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}
