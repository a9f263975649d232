//! Merchant category signal

use super::SignalProvider;
use crate::config::SignalSettings;
use crate::feature_extractor::FeatureRecord;
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Risk assigned to categories missing from the table
const UNLISTED_CATEGORY_RISK: f64 = 0.2;

fn default_category_risk() -> HashMap<String, f64> {
    [
        ("gambling", 0.8),
        ("crypto", 0.7),
        ("gift_cards", 0.6),
        ("money_transfer", 0.5),
        ("electronics", 0.3),
        ("travel", 0.25),
        ("retail", 0.1),
        ("restaurants", 0.05),
        ("grocery", 0.05),
        ("utilities", 0.0),
    ]
    .into_iter()
    .map(|(category, risk)| (category.to_string(), risk))
    .collect()
}

/// Scores the merchant category against a static risk table.
pub struct MerchantSignal {
    settings: SignalSettings,
    category_risk: HashMap<String, f64>,
}

impl MerchantSignal {
    pub fn new(settings: SignalSettings) -> Self {
        Self {
            settings,
            category_risk: default_category_risk(),
        }
    }

    /// Override or add the risk of one category.
    pub fn with_category_risk(mut self, category: &str, risk: f64) -> Self {
        self.category_risk
            .insert(category.to_ascii_lowercase(), risk.clamp(0.0, 1.0));
        self
    }

    pub fn category_risk(&self, category: &str) -> f64 {
        self.category_risk
            .get(&category.to_ascii_lowercase())
            .copied()
            .unwrap_or(UNLISTED_CATEGORY_RISK)
    }
}

#[async_trait]
impl SignalProvider for MerchantSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Merchant
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
        _features: &FeatureRecord,
    ) -> Result<SignalResult> {
        let result = match &request.merchant_category {
            Some(category) => SignalResult::completed(self.kind(), self.category_risk(category))
                .with_detail("category", category),
            // peer-to-peer transfer, nothing to score
            None => SignalResult::completed(self.kind(), 0.0).with_detail("category", "none"),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_category_lookup() {
        let signal = MerchantSignal::new(SignalSettings::new(0.1, 80));
        let features = FeatureRecord::default();

        let gambling = TransactionRequest::new("t", "a", "b", 10.0).with_merchant_category("Gambling");
        assert_eq!(signal.score(&gambling, &features).await.unwrap().score, 0.8);

        let unlisted = TransactionRequest::new("t", "a", "b", 10.0).with_merchant_category("pets");
        assert_eq!(signal.score(&unlisted, &features).await.unwrap().score, 0.2);

        let transfer = TransactionRequest::new("t", "a", "b", 10.0);
        assert_eq!(signal.score(&transfer, &features).await.unwrap().score, 0.0);
    }

    #[test]
    fn test_override_is_clamped() {
        let signal =
            MerchantSignal::new(SignalSettings::new(0.1, 80)).with_category_risk("pets", 3.0);
        assert_eq!(signal.category_risk("PETS"), 1.0);
    }
}
