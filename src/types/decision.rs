//! Risk decision and response data structures

use crate::types::signal::{SignalResult, SignalResults};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Risk level classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    Critical,
}

impl RiskLevel {
    /// Determine risk level from score and thresholds.
    ///
    /// A score sitting exactly on a threshold lands in the higher-risk bucket.
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        if score >= thresholds.critical {
            RiskLevel::Critical
        } else if score >= thresholds.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Fixed level-to-action lookup
    pub fn action(&self) -> RiskAction {
        match self {
            RiskLevel::Low => RiskAction::Allow,
            RiskLevel::Medium => RiskAction::Review,
            RiskLevel::Critical => RiskAction::Block,
        }
    }
}

/// What the caller should do with the transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskAction {
    Allow,
    Review,
    Block,
}

/// Configurable risk level thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelThresholds {
    /// Lowest score classified MEDIUM
    pub medium: f64,
    /// Lowest score classified CRITICAL
    pub critical: f64,
}

impl Default for RiskLevelThresholds {
    fn default() -> Self {
        Self {
            medium: 0.3,
            critical: 0.7,
        }
    }
}

/// Composite score mapped to a discrete decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskDecision {
    pub score: f64,
    pub level: RiskLevel,
    pub action: RiskAction,
}

impl RiskDecision {
    pub fn from_score(score: f64, thresholds: &RiskLevelThresholds) -> Self {
        let level = RiskLevel::from_score(score, thresholds);
        Self {
            score,
            level,
            action: level.action(),
        }
    }
}

/// Externally visible result of analyzing one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// Unique response identifier
    pub response_id: String,

    pub transaction_id: String,

    pub decision: RiskDecision,

    /// Per-signal breakdown, ordered by signal identity
    pub signals: Vec<SignalResult>,

    /// End-to-end time spent inside the orchestrator
    pub processing_time_us: u64,

    /// Whether the conservative fallback path produced this response
    pub failsafe: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failsafe_reason: Option<String>,

    pub evaluated_at: DateTime<Utc>,
}

impl TransactionResponse {
    /// Create a response from a decision and the collected signals
    pub fn new(
        transaction_id: String,
        decision: RiskDecision,
        signals: SignalResults,
        processing_time: Duration,
    ) -> Self {
        Self {
            response_id: uuid::Uuid::new_v4().to_string(),
            transaction_id,
            decision,
            signals: signals.into_values().collect(),
            processing_time_us: processing_time.as_micros() as u64,
            failsafe: false,
            failsafe_reason: None,
            evaluated_at: Utc::now(),
        }
    }

    /// Mark the response as produced by the failsafe path
    pub fn with_failsafe(mut self, reason: impl Into<String>) -> Self {
        self.failsafe = true;
        self.failsafe_reason = Some(reason.into());
        self
    }

    /// Look up one signal's result in the breakdown
    pub fn signal(&self, kind: crate::types::signal::SignalKind) -> Option<&SignalResult> {
        self.signals.iter().find(|s| s.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::signal::SignalKind;

    #[test]
    fn test_risk_level_from_score() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(RiskLevel::from_score(0.1, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.5, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.95, &thresholds), RiskLevel::Critical);
    }

    #[test]
    fn test_boundary_resolves_to_higher_bucket() {
        let thresholds = RiskLevelThresholds::default();

        assert_eq!(RiskLevel::from_score(0.3, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.7, &thresholds), RiskLevel::Critical);
    }

    #[test]
    fn test_level_to_action_lookup() {
        assert_eq!(RiskLevel::Low.action(), RiskAction::Allow);
        assert_eq!(RiskLevel::Medium.action(), RiskAction::Review);
        assert_eq!(RiskLevel::Critical.action(), RiskAction::Block);
    }

    #[test]
    fn test_response_serialization() {
        let mut signals = SignalResults::new();
        signals.insert(
            SignalKind::Amount,
            SignalResult::completed(SignalKind::Amount, 0.4),
        );
        signals.insert(
            SignalKind::Anomaly,
            SignalResult::completed(SignalKind::Anomaly, 0.2),
        );

        let decision = RiskDecision::from_score(0.35, &RiskLevelThresholds::default());
        let response = TransactionResponse::new(
            "tx_123".to_string(),
            decision,
            signals,
            Duration::from_micros(1500),
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["decision"]["level"], "MEDIUM");
        assert_eq!(json["decision"]["action"], "REVIEW");
        assert_eq!(json["failsafe"], false);
        assert!(json.get("failsafe_reason").is_none());
        // breakdown keeps identity order, not insertion order
        assert_eq!(json["signals"][0]["kind"], "anomaly");
        assert_eq!(json["signals"][1]["kind"], "amount");
        assert_eq!(response.processing_time_us, 1500);
    }
}
