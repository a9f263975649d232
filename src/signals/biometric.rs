//! Behavioral biometric signal

use super::{ramp, SignalProvider};
use crate::config::SignalSettings;
use crate::feature_extractor::{names, FeatureRecord};
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Relative typing-rhythm deviation tolerated as normal variation
const DEVIATION_FLOOR: f64 = 0.25;
const DEVIATION_CEILING: f64 = 1.5;

/// Compares the session's keystroke rhythm with the sender's baseline.
///
/// Requests without a sample score zero: absence of biometrics is not
/// evidence of fraud.
pub struct BiometricSignal {
    settings: SignalSettings,
}

impl BiometricSignal {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SignalProvider for BiometricSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Biometric
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
        if !features.flag(names::HAS_BIOMETRIC) {
            return Ok(SignalResult::completed(self.kind(), 0.0).with_detail("sample", "absent"));
        }

        let deviation = features.value_or(names::TYPING_INTERVAL_DEVIATION, 0.0);
        let score = ramp(deviation, DEVIATION_FLOOR, DEVIATION_CEILING);

        Ok(SignalResult::completed(self.kind(), score)
            .with_detail("sample", "present")
            .with_detail("typing_deviation", format!("{deviation:.2}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_sample_is_neutral() {
        let signal = BiometricSignal::new(SignalSettings::new(0.15, 120));
        let tx = TransactionRequest::new("t", "a", "b", 10.0);
        let features: FeatureRecord = [(names::HAS_BIOMETRIC, 0.0)].into_iter().collect();

        let result = signal.score(&tx, &features).await.unwrap();
        assert_eq!(result.score, 0.0);
        assert_eq!(result.details.get("sample").map(String::as_str), Some("absent"));
    }

    #[tokio::test]
    async fn test_deviation_ramp() {
        let signal = BiometricSignal::new(SignalSettings::new(0.15, 120));
        let tx = TransactionRequest::new("t", "a", "b", 10.0);
        let features = |deviation| -> FeatureRecord {
            [
                (names::HAS_BIOMETRIC, 1.0),
                (names::TYPING_INTERVAL_DEVIATION, deviation),
            ]
            .into_iter()
            .collect()
        };

        assert_eq!(signal.score(&tx, &features(0.1)).await.unwrap().score, 0.0);
        assert!((signal.score(&tx, &features(0.875)).await.unwrap().score - 0.5).abs() < 1e-9);
        assert_eq!(signal.score(&tx, &features(3.0)).await.unwrap().score, 1.0);
    }
}
