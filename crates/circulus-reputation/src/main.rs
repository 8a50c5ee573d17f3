//! Circulus Reputation Service Binary

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use prometheus::Registry;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use circulus_common::VERSION;
use circulus_reputation::{
    alerts::TracingAlertSink,
    engine::{EnginePorts, ReputationEngine},
    http::{self, AppState},
    service::ReputationService,
    sources::{FixtureGenerator, InMemoryDirectory, InMemoryEventLog, InMemoryMetricsSource},
    store::InMemoryScoreStore,
    telemetry::ReputationMetrics,
    worker::RecomputeWorker,
    ReputationServiceConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Circulus Reputation Service v{}", VERSION);

    let config = ReputationServiceConfig::load()?;
    info!("Loaded configuration: {:?}", config);

    let params = config.scoring_params()?;
    info!(
        params_version = params.version,
        lookback_days = params.lookback_days,
        "Scoring parameters loaded"
    );

    // In-memory adapters; production deployments swap these for the
    // marketplace's ledger, directory and notification services
    let directory = Arc::new(InMemoryDirectory::new());
    let metrics = Arc::new(InMemoryMetricsSource::new());
    let events = Arc::new(InMemoryEventLog::new());
    let store = Arc::new(InMemoryScoreStore::new());

    if config.demo_entities > 0 {
        let seeded = FixtureGenerator::new(config.demo_seed)
            .populate(config.demo_entities, &directory, &metrics, events.as_ref(), Utc::now())
            .await?;
        info!(entities = seeded.len(), seed = config.demo_seed, "Seeded demo entities");
    }

    let registry = Registry::new();
    let telemetry = Arc::new(ReputationMetrics::new()?);
    telemetry.register(&registry)?;

    let engine = Arc::new(
        ReputationEngine::new(
            params,
            EnginePorts {
                metrics,
                events,
                directory,
                store,
                alerts: Arc::new(TracingAlertSink),
            },
        )?
        .with_compute_timeout(Duration::from_millis(config.engine.compute_timeout_ms))
        .with_telemetry(telemetry),
    );

    let (worker, worker_join) = RecomputeWorker::spawn(engine.clone(), config.worker_config());
    let service = Arc::new(ReputationService::new(
        engine,
        worker,
        config.engine.auto_recompute_on_event,
    ));

    let sweeper = (config.engine.sweep_interval_secs > 0).then(|| {
        service
            .clone()
            .spawn_sweeper(Duration::from_secs(config.engine.sweep_interval_secs))
    });

    let app = http::router(AppState {
        service: service.clone(),
        registry,
    });

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Reputation API listening on {}", addr);
    info!("Endpoints: /health, /metrics, /api/v1/entities/:id/{{score,history,recompute}}, /api/v1/events, /api/v1/worker/status");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    service.shutdown();
    worker_join.await?;

    info!("Shutting down reputation service");
    Ok(())
}
