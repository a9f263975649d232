//! Stub providers for exercising the dispatcher and orchestrator

use super::SignalProvider;
use crate::feature_extractor::FeatureRecord;
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const STUB_TIMEOUT: Duration = Duration::from_millis(100);

/// Returns a fixed score immediately
pub(crate) struct FixedSignal {
    pub kind: SignalKind,
    pub score: f64,
}

#[async_trait]
impl SignalProvider for FixedSignal {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn timeout(&self) -> Duration {
        STUB_TIMEOUT
    }

    async fn score(&self, _: &TransactionRequest, _: &FeatureRecord) -> Result<SignalResult> {
        Ok(SignalResult::completed(self.kind, self.score))
    }
}

/// Sleeps before answering
pub(crate) struct SlowSignal {
    pub kind: SignalKind,
    pub delay: Duration,
    pub timeout: Duration,
    pub default_score: f64,
}

#[async_trait]
impl SignalProvider for SlowSignal {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn default_score(&self) -> f64 {
        self.default_score
    }

    async fn score(&self, _: &TransactionRequest, _: &FeatureRecord) -> Result<SignalResult> {
        tokio::time::sleep(self.delay).await;
        Ok(SignalResult::completed(self.kind, 1.0))
    }
}

/// Always returns an error
pub(crate) struct FailingSignal {
    pub kind: SignalKind,
}

#[async_trait]
impl SignalProvider for FailingSignal {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn timeout(&self) -> Duration {
        STUB_TIMEOUT
    }

    async fn score(&self, _: &TransactionRequest, _: &FeatureRecord) -> Result<SignalResult> {
        bail!("upstream scoring service unavailable")
    }
}

/// Panics inside the provider task
pub(crate) struct PanickingSignal {
    pub kind: SignalKind,
}

#[async_trait]
impl SignalProvider for PanickingSignal {
    fn kind(&self) -> SignalKind {
        self.kind
    }

    fn timeout(&self) -> Duration {
        STUB_TIMEOUT
    }

    async fn score(&self, _: &TransactionRequest, _: &FeatureRecord) -> Result<SignalResult> {
        panic!("provider bug")
    }
}

/// Fixed providers for every kind, using the literal scores in `scores`
pub(crate) fn fixed_providers(scores: [(SignalKind, f64); 6]) -> Vec<Arc<dyn SignalProvider>> {
    scores
        .into_iter()
        .map(|(kind, score)| fixed(kind, score))
        .collect()
}

pub(crate) fn fixed(kind: SignalKind, score: f64) -> Arc<dyn SignalProvider> {
    Arc::new(FixedSignal { kind, score })
}

pub(crate) fn slow(
    kind: SignalKind,
    delay: Duration,
    timeout: Duration,
    default_score: f64,
) -> Arc<dyn SignalProvider> {
    Arc::new(SlowSignal {
        kind,
        delay,
        timeout,
        default_score,
    })
}

pub(crate) fn failing(kind: SignalKind) -> Arc<dyn SignalProvider> {
    Arc::new(FailingSignal { kind })
}

pub(crate) fn panicking(kind: SignalKind) -> Arc<dyn SignalProvider> {
    Arc::new(PanickingSignal { kind })
}
