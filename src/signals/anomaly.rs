//! Statistical anomaly signal

use super::{ramp, SignalProvider};
use crate::config::SignalSettings;
use crate::feature_extractor::{names, FeatureRecord};
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// |z| at which the amount starts to look anomalous
const ZSCORE_FLOOR: f64 = 1.0;
/// |z| at which the amount is fully anomalous
const ZSCORE_CEILING: f64 = 5.0;
/// Share of the remaining headroom added for an off-hours transaction
const OFF_HOURS_LIFT: f64 = 0.25;

/// Scores how far the amount sits from the sender's historical distribution.
pub struct AnomalySignal {
    settings: SignalSettings,
}

impl AnomalySignal {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SignalProvider for AnomalySignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Anomaly
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn default_score(&self) -> f64 {
        self.settings.default_score
    }

    async fn score(
        &self,
        _request: &TransactionRequest,
        features: &FeatureRecord,
    ) -> Result<SignalResult> {
        let zscore = features.value_or(names::AMOUNT_ZSCORE, 0.0);
        let unusual_hour = features.flag(names::UNUSUAL_HOUR);

        let mut score = ramp(zscore.abs(), ZSCORE_FLOOR, ZSCORE_CEILING);
        if unusual_hour {
            score += (1.0 - score) * OFF_HOURS_LIFT;
        }

        Ok(SignalResult::completed(self.kind(), score)
            .with_detail("amount_zscore", format!("{zscore:.2}"))
            .with_detail("unusual_hour", unusual_hour))
    }
}
