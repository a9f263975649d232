//! Behavioral familiarity signal

use super::SignalProvider;
use crate::config::SignalSettings;
use crate::feature_extractor::{names, FeatureRecord};
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

const UNUSUAL_HOUR_WEIGHT: f64 = 0.4;
const UNKNOWN_DEVICE_WEIGHT: f64 = 0.4;
const NEW_RECEIVER_WEIGHT: f64 = 0.2;

/// Scores departures from the sender's habits: time of day, device and payee.
pub struct BehaviorSignal {
    settings: SignalSettings,
}

impl BehaviorSignal {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SignalProvider for BehaviorSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Behavior
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
        let unusual_hour = features.value_or(names::UNUSUAL_HOUR, 0.0);
        // known_device/known_receiver are 1 (known), 0 (new) or 0.5 (no history)
        let device_novelty = 1.0 - features.value_or(names::KNOWN_DEVICE, 0.5);
        let receiver_novelty = 1.0 - features.value_or(names::KNOWN_RECEIVER, 0.5);

        let score = (UNUSUAL_HOUR_WEIGHT * unusual_hour
            + UNKNOWN_DEVICE_WEIGHT * device_novelty
            + NEW_RECEIVER_WEIGHT * receiver_novelty)
            .clamp(0.0, 1.0);

        Ok(SignalResult::completed(self.kind(), score)
            .with_detail("device_novelty", device_novelty)
            .with_detail("receiver_novelty", receiver_novelty))
    }
}
