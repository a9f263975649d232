//! Client network signal

use super::SignalProvider;
use crate::config::SignalSettings;
use crate::feature_extractor::{names, FeatureRecord};
use crate::types::signal::{SignalKind, SignalResult};
use crate::types::transaction::TransactionRequest;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

const FOREIGN_COUNTRY_WEIGHT: f64 = 0.5;
const PROXY_WEIGHT: f64 = 0.3;
const MISSING_IP_WEIGHT: f64 = 0.2;

/// Scores where the request comes from: country, proxy use, missing metadata.
pub struct NetworkSignal {
    settings: SignalSettings,
}

impl NetworkSignal {
    pub fn new(settings: SignalSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SignalProvider for NetworkSignal {
    fn kind(&self) -> SignalKind {
        SignalKind::Network
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
        let foreign = features.value_or(names::FOREIGN_COUNTRY, 0.0);
        let proxy = features.value_or(names::PROXY_DETECTED, 0.0);
        let missing_ip = features.value_or(names::MISSING_IP, 0.0);

        let score = (FOREIGN_COUNTRY_WEIGHT * foreign
            + PROXY_WEIGHT * proxy
            + MISSING_IP_WEIGHT * missing_ip)
            .min(1.0);

        let mut result = SignalResult::completed(self.kind(), score);
        if let Some(country) = &request.client.country {
            result = result.with_detail("country", country);
        }
        Ok(result.with_detail("proxy", proxy >= 1.0))
    }
}
