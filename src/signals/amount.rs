//! Amount size signal

use super::{ramp, SignalProvider};
use crate::config::SignalSettings;
use crate::feature_extractor::{names, FeatureRecord};
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Ratio to the sender's average at which the amount starts to count
const RATIO_FLOOR: f64 = 2.0;
const RATIO_CEILING: f64 = 10.0;
/// Absolute amounts that stay suspicious regardless of history
const LARGE_AMOUNT_FLOOR: f64 = 5_000.0;
const LARGE_AMOUNT_CEILING: f64 = 50_000.0;
const LARGE_AMOUNT_CAP: f64 = 0.8;

/// Scores the amount relative to the sender's average and in absolute terms.
pub struct AmountSignal {
    settings: SignalSettings,
}

impl AmountSignal {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SignalProvider for AmountSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Amount
    }

    fn timeout(&self) -> Duration {
        self.settings.timeout()
    }

    fn default_score(&self) -> f64 {
        self.settings.default_score
    }

    async fn score(
        &self,
        request: &TransactionRequest,
        features: &FeatureRecord,
    ) -> Result<SignalResult> {
        let ratio = features.value_or(names::AMOUNT_TO_AVG_RATIO, 1.0);
        let relative = ramp(ratio, RATIO_FLOOR, RATIO_CEILING);
        let absolute =
            LARGE_AMOUNT_CAP * ramp(request.amount, LARGE_AMOUNT_FLOOR, LARGE_AMOUNT_CEILING);

        Ok(SignalResult::completed(self.kind(), relative.max(absolute))
            .with_detail("amount_to_avg_ratio", format!("{ratio:.2}")))
    }
}
