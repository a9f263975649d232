//! Request orchestration: validate, score under the failsafe guard, record.

use crate::config::AppConfig;
use crate::dispatcher::SignalDispatcher;
use crate::error::{PipelineError, ValidationError};
use crate::failsafe::{FailsafeController, GuardOutcome};
use crate::feature_extractor::FeatureExtractor;
use crate::ledger::{LedgerRecord, LedgerSink};
use crate::metrics::PipelineMetrics;
use crate::profile::ProfileStore;
use crate::scorer::CompositeScorer;
use crate::signals::{default_providers, SignalProvider};
use crate::types::decision::{RiskAction, RiskDecision, TransactionResponse};
use crate::types::signal::SignalResults;
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything that runs inside the deadline
struct Pipeline {
    extractor: FeatureExtractor,
    dispatcher: SignalDispatcher,
    scorer: CompositeScorer,
    profiles: Arc<dyn ProfileStore>,
}

struct Assessment {
    decision: RiskDecision,
    signals: SignalResults,
}

impl Pipeline {
    async fn run(&self, request: Arc<TransactionRequest>) -> Result<Assessment, PipelineError> {
        let profile = self.profiles.get(&request.sender_id).await;
        let features = Arc::new(self.extractor.extract(&request, &profile));
        let signals = self.dispatcher.dispatch(Arc::clone(&request), features).await;
        let decision = self.scorer.compute(&signals)?;

        if let Some((kind, contribution)) = self.scorer.top_contributor(&signals) {
            debug!(
                transaction_id = %request.transaction_id,
                top_signal = %kind,
                contribution,
                "Composite score computed"
            );
        }

        Ok(Assessment { decision, signals })
    }
}

/// Entry point for risk analysis.
///
/// Cheap to share behind an `Arc`; `analyze` takes `&self` and may be
/// called concurrently.
pub struct RiskOrchestrator {
    pipeline: Arc<Pipeline>,
    failsafe: FailsafeController,
    ledger: Arc<dyn LedgerSink>,
    metrics: Option<Arc<PipelineMetrics>>,
}

impl RiskOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn SignalProvider>>,
        scorer: CompositeScorer,
        failsafe: FailsafeController,
        profiles: Arc<dyn ProfileStore>,
        ledger: Arc<dyn LedgerSink>,
    ) -> Self {
        let dispatcher = SignalDispatcher::new(providers);
        if dispatcher.max_timeout() > failsafe.deadline() {
            warn!(
                max_signal_timeout_ms = dispatcher.max_timeout().as_millis() as u64,
                deadline_ms = failsafe.deadline().as_millis() as u64,
                "A signal timeout exceeds the global deadline"
            );
        }

        Self {
            pipeline: Arc::new(Pipeline {
                extractor: FeatureExtractor::new(),
                dispatcher,
                scorer,
                profiles,
            }),
            failsafe,
            ledger,
            metrics: None,
        }
    }

    /// Build the orchestrator with the built-in providers
    pub fn from_config(
        config: &AppConfig,
        profiles: Arc<dyn ProfileStore>,
        ledger: Arc<dyn LedgerSink>,
    ) -> Result<Self> {
        Ok(Self::new(
            default_providers(&config.signals),
            CompositeScorer::from_config(config)?,
            FailsafeController::from_config(config),
            profiles,
            ledger,
        ))
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Arc<PipelineMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn provider_count(&self) -> usize {
        self.pipeline.dispatcher.provider_count()
    }

    pub fn feature_count(&self) -> usize {
        self.pipeline.extractor.feature_count()
    }

    pub fn failsafe(&self) -> &FailsafeController {
        &self.failsafe
    }

    /// Analyze one transaction.
    ///
    /// Only validation failures reach the caller. Every internal failure,
    /// including a deadline overrun, yields a failsafe response instead.
    pub async fn analyze(
        &self,
        request: TransactionRequest,
    ) -> Result<TransactionResponse, ValidationError> {
        if let Err(e) = request.validate() {
            warn!(
                transaction_id = %request.transaction_id,
                error = %e,
                "Transaction rejected"
            );
            if let Some(metrics) = &self.metrics {
                metrics.record_rejection();
            }
            return Err(e);
        }

        let started = Instant::now();
        let request = Arc::new(request);

        let pipeline = Arc::clone(&self.pipeline);
        let guarded = Arc::clone(&request);
        let outcome = self
            .failsafe
            .guard(started, async move { pipeline.run(guarded).await })
            .await;

        let response = match outcome {
            GuardOutcome::Normal(assessment) => TransactionResponse::new(
                request.transaction_id.clone(),
                assessment.decision,
                assessment.signals,
                started.elapsed(),
            ),
            GuardOutcome::Failsafe(fallback) => TransactionResponse::new(
                request.transaction_id.clone(),
                fallback.decision,
                SignalResults::new(),
                started.elapsed(),
            )
            .with_failsafe(fallback.trigger.to_string()),
        };

        self.ledger.append(LedgerRecord::new(&request, &response));
        if let Some(metrics) = &self.metrics {
            metrics.record_response(&response);
        }

        if response.decision.action == RiskAction::Allow {
            debug!(
                transaction_id = %response.transaction_id,
                risk_score = response.decision.score,
                processing_time_us = response.processing_time_us,
                "Transaction allowed"
            );
        } else {
            info!(
                transaction_id = %response.transaction_id,
                risk_score = response.decision.score,
                risk_level = ?response.decision.level,
                action = ?response.decision.action,
                failsafe = response.failsafe,
                processing_time_us = response.processing_time_us,
                "Transaction flagged"
            );
        }

        Ok(response)
    }
}
