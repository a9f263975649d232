//! Risk Orchestrator - Main Entry Point
//!
//! Consumes transaction requests from NATS, scores them against all risk
//! signals in parallel, and publishes one decision per request.

use anyhow::Result;
use futures::StreamExt;
use risk_orchestrator::{
    config::{AppConfig, LoggingConfig},
    consumer::{decode_request, TransactionConsumer},
    ledger::NatsLedgerSink,
    metrics::{MetricsReporter, PipelineMetrics},
    orchestrator::RiskOrchestrator,
    producer::{RejectionNotice, ResponseProducer},
    profile::InMemoryProfileStore,
    types::RiskAction,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("risk_orchestrator={}", logging.level)))?;

    if logging.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Risk Orchestrator");
    info!(
        deadline_ms = config.orchestrator.deadline_ms,
        failsafe_budget_ms = config.orchestrator.failsafe_budget_ms,
        medium = config.decision.risk_levels.medium,
        critical = config.decision.risk_levels.critical,
        "Configuration loaded"
    );

    // Initialize metrics
    let metrics = Arc::new(PipelineMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    // Initialize components
    let profiles = Arc::new(InMemoryProfileStore::new());
    let ledger = Arc::new(NatsLedgerSink::new(client.clone(), &config.nats.ledger_subject));
    let orchestrator = Arc::new(
        RiskOrchestrator::from_config(&config, profiles.clone(), ledger)?
            .with_metrics(metrics.clone()),
    );
    info!(
        "Orchestrator initialized with {} signals over {} features",
        orchestrator.provider_count(),
        orchestrator.feature_count()
    );

    let consumer = TransactionConsumer::new(client.clone(), &config.nats.transaction_subject);
    let producer = Arc::new(ResponseProducer::new(
        client.clone(),
        &config.nats.response_subject,
    ));

    // Parallel processing configuration
    let num_workers = config.pipeline.workers;
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.subject());
    info!("Publishing decisions to: {}", producer.subject());

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));
    let learn_profiles = config.pipeline.learn_profiles;

    // Start metrics reporter
    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.report_interval_secs);
    tokio::spawn(reporter.start());

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

        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        let orchestrator = orchestrator.clone();
        let producer = producer.clone();
        let profiles = profiles.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let reply = message.reply.as_deref();

            let request = match decode_request(&message) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Dropping undecodable message");
                    return;
                }
            };
            let tx_id = request.transaction_id.clone();
            let learn = learn_profiles.then(|| request.clone());

            match orchestrator.analyze(request).await {
                Ok(response) => {
                    if let Err(e) = producer.publish(&response, reply).await {
                        error!(
                            transaction_id = %tx_id,
                            error = %e,
                            "Failed to publish risk decision"
                        );
                    }

                    if response.decision.action == RiskAction::Allow && !response.failsafe {
                        if let Some(request) = learn {
                            profiles.record(&request);
                        }
                    }
                }
                Err(e) => {
                    let notice = RejectionNotice::new(&tx_id, &e);
                    if let Err(e) = producer.publish_rejection(&notice, reply).await {
                        error!(
                            transaction_id = %tx_id,
                            error = %e,
                            "Failed to publish rejection notice"
                        );
                    }
                }
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

            // Log progress every 100 requests
            if count % 100 == 0 {
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    failsafe_rate = metrics.failsafe_rate(),
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!("Orchestrator shutting down...");
    metrics.print_summary();

    Ok(())
}
