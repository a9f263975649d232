//! Parallel signal dispatch with per-signal timeouts
//!
//! Every provider runs in its own task under its own timeout. A provider
//! that times out, errors or panics is replaced by a neutral default so one
//! bad signal never fails the request. A task that outlives its timeout is
//! aborted, so a hung provider never accumulates tasks.

use crate::feature_extractor::FeatureRecord;
use crate::signals::SignalProvider;
use crate::types::signal::{SignalKind, SignalResult, SignalResults};
use crate::types::transaction::TransactionRequest;
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fans a request out to every configured provider and collects the results
/// by provider identity.
pub struct SignalDispatcher {
    providers: Vec<Arc<dyn SignalProvider>>,
}

impl SignalDispatcher {
    pub fn new(providers: Vec<Arc<dyn SignalProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Longest individual timeout, i.e. the dispatch latency bound
    pub fn max_timeout(&self) -> Duration {
        self.providers
            .iter()
            .map(|p| p.timeout())
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Run all providers concurrently.
    ///
    /// Returns once every provider has completed, failed or timed out.
    pub async fn dispatch(
        &self,
        request: Arc<TransactionRequest>,
        features: Arc<FeatureRecord>,
    ) -> SignalResults {
        let calls = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            let request = Arc::clone(&request);
            let features = Arc::clone(&features);
            async move {
                let result = invoke(provider, request, features).await;
                (result.kind, result)
            }
        });

        join_all(calls).await.into_iter().collect()
    }
}

async fn invoke(
    provider: Arc<dyn SignalProvider>,
    request: Arc<TransactionRequest>,
    features: Arc<FeatureRecord>,
) -> SignalResult {
    let kind = provider.kind();
    let timeout = provider.timeout();
    let default_score = provider.default_score();
    let started = Instant::now();

    let mut task = {
        let provider = Arc::clone(&provider);
        let request = Arc::clone(&request);
        tokio::spawn(async move { provider.score(&request, &features).await })
    };

    let mut result = match tokio::time::timeout(timeout, &mut task).await {
        Ok(Ok(Ok(result))) => sanitize(result, kind, default_score),
        Ok(Ok(Err(e))) => {
            warn!(
                transaction_id = %request.transaction_id,
                signal = %kind,
                error = %e,
                "Signal failed, using default score"
            );
            SignalResult::failed(kind, default_score, e.to_string())
        }
        Ok(Err(join_error)) => {
            warn!(
                transaction_id = %request.transaction_id,
                signal = %kind,
                error = %join_error,
                "Signal task aborted, using default score"
            );
            SignalResult::failed(kind, default_score, join_error.to_string())
        }
        Err(_) => {
            task.abort();
            warn!(
                transaction_id = %request.transaction_id,
                signal = %kind,
                timeout_ms = timeout.as_millis() as u64,
                "Signal timed out, using default score"
            );
            SignalResult::timed_out(kind, default_score)
        }
    };

    result.latency_us = started.elapsed().as_micros() as u64;
    debug!(
        transaction_id = %request.transaction_id,
        signal = %kind,
        score = result.score,
        status = ?result.status,
        latency_us = result.latency_us,
        "Signal resolved"
    );
    result
}

/// Enforce the result contract: right identity, finite score in [0, 1].
fn sanitize(mut result: SignalResult, kind: SignalKind, default_score: f64) -> SignalResult {
    if result.kind != kind {
        return SignalResult::failed(
            kind,
            default_score,
            format!("provider returned a result for {}", result.kind),
        );
    }
    if !result.score.is_finite() {
        return SignalResult::failed(kind, default_score, "provider returned a non-finite score");
    }
    if !(0.0..=1.0).contains(&result.score) {
        warn!(signal = %kind, score = result.score, "Signal score out of range, clamping");
        result.score = result.score.clamp(0.0, 1.0);
    }
    result
}
