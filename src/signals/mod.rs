//! Independent risk signal providers
//!
//! Every provider reads only the request and the shared feature record;
//! none of them sees another provider's output.

pub mod amount;
pub mod anomaly;
pub mod behavior;
pub mod biometric;
pub mod merchant;
pub mod network;

#[cfg(test)]
pub(crate) mod testing;

pub use amount::AmountSignal;
pub use anomaly::AnomalySignal;
pub use behavior::BehaviorSignal;
pub use biometric::BiometricSignal;
pub use merchant::MerchantSignal;
pub use network::NetworkSignal;

use crate::config::SignalsConfig;
use crate::feature_extractor::FeatureRecord;
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A single scoring signal.
///
/// Implementations return a score in [0.0, 1.0] or an error. The dispatcher
/// enforces [`timeout`](SignalProvider::timeout) and substitutes
/// [`default_score`](SignalProvider::default_score) on timeout or failure.
#[async_trait]
pub trait SignalProvider: Send + Sync {
    /// Identity used to key the result and look up its weight
    fn kind(&self) -> SignalKind;

    /// Individual time budget for one invocation
    fn timeout(&self) -> Duration;

    /// Score substituted when the provider times out or fails
    fn default_score(&self) -> f64 {
        0.0
    }

    /// Score one request.
    async fn score(
        &self,
        request: &TransactionRequest,
        features: &FeatureRecord,
    ) -> Result<SignalResult>;
}

/// Build the six built-in providers from configuration.
pub fn default_providers(config: &SignalsConfig) -> Vec<Arc<dyn SignalProvider>> {
    vec![
        Arc::new(AnomalySignal::new(config.anomaly.clone())),
        Arc::new(BehaviorSignal::new(config.behavior.clone())),
        Arc::new(AmountSignal::new(config.amount.clone())),
        Arc::new(MerchantSignal::new(config.merchant.clone())),
        Arc::new(BiometricSignal::new(config.biometric.clone())),
        Arc::new(NetworkSignal::new(config.network.clone())),
    ]
}

/// Linear ramp: 0 at or below `low`, 1 at or above `high`.
pub(crate) fn ramp(value: f64, low: f64, high: f64) -> f64 {
    if value <= low {
        0.0
    } else if value >= high {
        1.0
    } else {
        (value - low) / (high - low)
    }
}
