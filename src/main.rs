//! Fraud Feature Engine - Main Entry Point
//!
//! Consumes transactions from NATS, scores them against per-user history, and
//! publishes the score records. Each user is pinned to one worker queue, so a
//! user's transactions are scored in arrival order while different users are
//! scored in parallel. Shutdown drains every queue before the final summary.

use anyhow::{Context, Result};
use fraud_feature_engine::{
    config::{AppConfig, LoggingConfig},
    consumer::TransactionConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    producer::ScoreProducer,
    types::{ScoredTransaction, Transaction},
    FraudFeatureEngine, StaticGeoResolver, UserDispatcher,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (optional path as first argument)
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;

    info!("Starting Fraud Feature Engine");
    info!(
        workers = config.pipeline.workers,
        geo_addresses = config.geo.addresses.len(),
        "Configuration loaded successfully"
    );

    let metrics = Arc::new(PipelineMetrics::new());

    let resolver = StaticGeoResolver::from_config(&config.geo);
    info!(known_addresses = resolver.len(), "Geo resolver initialized");
    let engine = Arc::new(FraudFeatureEngine::new(Arc::new(resolver)));

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(ScoreProducer::new(client.clone(), &config.nats.score_subject));

    let (dispatcher, queues) =
        UserDispatcher::new(config.pipeline.workers, config.pipeline.queue_capacity);
    info!(
        "Starting transaction scoring loop with {} workers",
        dispatcher.workers()
    );
    info!("Listening on subject: {}", consumer.subject());
    info!("Publishing scores to: {}", producer.subject());

    let processed_count = Arc::new(AtomicU64::new(0));

    // Periodic metrics summary
    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.report_interval_secs);
    tokio::spawn(reporter.start());

    let workers: Vec<JoinHandle<()>> = queues
        .into_iter()
        .enumerate()
        .map(|(worker_id, queue)| {
            tokio::spawn(run_worker(
                worker_id,
                queue,
                engine.clone(),
                producer.clone(),
                metrics.clone(),
                processed_count.clone(),
            ))
        })
        .collect();

    let mut subscription = consumer.subscribe().await?;

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let received_at = Instant::now();
        let transaction = match TransactionConsumer::decode(&message.payload) {
            Ok(transaction) => transaction,
            Err(e) => {
                metrics.record_rejected();
                warn!(error = %e, "Failed to deserialize transaction");
                continue;
            }
        };

        let user_key = transaction.user_id.trim().to_string();
        if let Err(e) = dispatcher.dispatch(&user_key, (transaction, received_at)).await {
            error!(error = %e, "Scoring worker stopped, shutting down");
            break;
        }
    }

    info!("Fraud Feature Engine shutting down, draining queued transactions...");
    drop(subscription);
    drop(dispatcher);
    for (worker_id, worker) in workers.into_iter().enumerate() {
        if let Err(e) = worker.await {
            error!(worker_id, error = %e, "Scoring worker panicked");
        }
    }
    if let Err(e) = client.flush().await {
        warn!(error = %e, "Failed to flush pending score records");
    }
    metrics.print_summary();

    Ok(())
}

/// Score one worker's queue in arrival order until the queue closes.
async fn run_worker(
    worker_id: usize,
    mut queue: mpsc::Receiver<(Transaction, Instant)>,
    engine: Arc<FraudFeatureEngine>,
    producer: Arc<ScoreProducer>,
    metrics: Arc<PipelineMetrics>,
    processed_count: Arc<AtomicU64>,
) {
    debug!(worker_id, "Scoring worker started");

    while let Some((transaction, received_at)) = queue.recv().await {
        match engine.compute(&transaction) {
            Ok(breakdown) => {
                let processing_time = received_at.elapsed();
                metrics.record_scored(processing_time, &breakdown.scores, breakdown.geo_degraded);

                let record = ScoredTransaction::new(
                    transaction.transaction_id.clone(),
                    transaction.user_id.clone(),
                    breakdown.scores,
                )
                .with_geo_degraded(breakdown.geo_degraded);

                if let Err(e) = producer.publish(&record).await {
                    error!(
                        user_id = %record.user_id,
                        error = %e,
                        "Failed to publish score record"
                    );
                } else {
                    debug!(
                        worker_id,
                        user_id = %record.user_id,
                        transaction_id = ?record.transaction_id,
                        fraud_risk_score = record.scores.fraud_risk_score,
                        processing_time_us = processing_time.as_micros(),
                        "Transaction scored"
                    );
                }

                let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

                // Log progress every 100 transactions
                if count % 100 == 0 {
                    let processing_stats = metrics.get_processing_stats();
                    info!(
                        processed = count,
                        throughput = format!("{:.1} tx/s", metrics.get_throughput()),
                        avg_latency_us = processing_stats.mean_us,
                        tracked_users = engine.tracked_users(),
                        "Processing milestone"
                    );
                }
            }
            Err(e) => {
                metrics.record_rejected();
                warn!(
                    transaction_id = ?transaction.transaction_id,
                    error = %e,
                    "Transaction rejected"
                );
            }
        }
    }

    debug!(worker_id, "Scoring worker drained");
}

/// Initialize tracing from the `[logging]` section. `RUST_LOG` wins when set.
fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("fraud_feature_engine={}", logging.level)))
        .context("Invalid log level")?;

    match logging.format.as_str() {
        "json" => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    Ok(())
}
