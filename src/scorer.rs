//! Composite risk scoring over signal results

use crate::config::{AppConfig, WEIGHT_SUM_TOLERANCE};
use crate::error::PipelineError;
use crate::types::decision::{RiskDecision, RiskLevelThresholds};
use crate::types::signal::{SignalKind, SignalResults};
use anyhow::{ensure, Result};
use std::collections::BTreeMap;

/// Decimal places kept in the composite score. Rounding absorbs
/// floating-point drift so a sum that is exactly on a threshold is
/// classified into the higher bucket.
const SCORE_PRECISION: f64 = 1e9;

/// Combines signal scores into one weighted risk score and maps it to a
/// decision.
///
/// Weights are fixed at construction and sum to 1.0. A signal missing from
/// the results contributes nothing; timed-out and failed signals contribute
/// their substituted default score.
pub struct CompositeScorer {
    weights: BTreeMap<SignalKind, f64>,
    thresholds: RiskLevelThresholds,
}

impl CompositeScorer {
    /// Create a scorer, rejecting weights that do not sum to 1.0.
    pub fn new(
        weights: impl IntoIterator<Item = (SignalKind, f64)>,
        thresholds: RiskLevelThresholds,
    ) -> Result<Self> {
        let weights: BTreeMap<SignalKind, f64> = weights.into_iter().collect();
        ensure!(
            weights.values().all(|w| w.is_finite() && *w >= 0.0),
            "signal weights must be finite and non-negative"
        );
        let total: f64 = weights.values().sum();
        ensure!(
            (total - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
            "signal weights must sum to 1.0, got {total}"
        );

        Ok(Self {
            weights,
            thresholds,
        })
    }

    /// Build the scorer from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.signals.weights(),
            config.decision.risk_levels.clone(),
        )
    }

    /// Weighted contribution of each signal to the composite score
    pub fn contributions(&self, results: &SignalResults) -> BTreeMap<SignalKind, f64> {
        self.weights
            .iter()
            .map(|(kind, weight)| {
                let score = results.get(kind).map(|r| r.score).unwrap_or(0.0);
                (*kind, weight * score)
            })
            .collect()
    }

    /// Signal with the largest weighted contribution, if any contributed
    pub fn top_contributor(&self, results: &SignalResults) -> Option<(SignalKind, f64)> {
        self.contributions(results)
            .into_iter()
            .filter(|(_, contribution)| *contribution > 0.0)
            .fold(None, |best, (kind, c)| match best {
                Some((_, best_c)) if best_c >= c => best,
                _ => Some((kind, c)),
            })
    }

    /// Compute the composite score and decision.
    pub fn compute(&self, results: &SignalResults) -> Result<RiskDecision, PipelineError> {
        let score: f64 = self.contributions(results).values().sum();
        if !score.is_finite() {
            return Err(PipelineError::Unexpected(format!(
                "composite score is not finite: {score}"
            )));
        }

        let score = (score * SCORE_PRECISION).round() / SCORE_PRECISION;
        Ok(RiskDecision::from_score(
            score.clamp(0.0, 1.0),
            &self.thresholds,
        ))
    }

    pub fn weight(&self, kind: SignalKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn thresholds(&self) -> &RiskLevelThresholds {
        &self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decision::{RiskAction, RiskLevel};
    use crate::types::signal::SignalResult;

    fn weights() -> [(SignalKind, f64); 6] {
        [
            (SignalKind::Anomaly, 0.3),
            (SignalKind::Behavior, 0.2),
            (SignalKind::Amount, 0.15),
            (SignalKind::Merchant, 0.1),
            (SignalKind::Biometric, 0.15),
            (SignalKind::Network, 0.1),
        ]
    }

    fn results(scores: &[(SignalKind, f64)]) -> SignalResults {
        scores
            .iter()
            .map(|&(kind, score)| (kind, SignalResult::completed(kind, score)))
            .collect()
    }

    #[test]
    fn test_weighted_sum_is_reproducible() {
        let scorer = CompositeScorer::new(weights(), RiskLevelThresholds::default()).unwrap();
        let results = results(&[
            (SignalKind::Anomaly, 0.1),
            (SignalKind::Behavior, 0.2),
            (SignalKind::Amount, 0.05),
            (SignalKind::Merchant, 0.0),
            (SignalKind::Biometric, 0.0),
            (SignalKind::Network, 0.0),
        ]);

        let decision = scorer.compute(&results).unwrap();

        // 0.1*0.3 + 0.2*0.2 + 0.05*0.15
        assert!((decision.score - 0.0775).abs() < 1e-12);
        assert_eq!(decision.level, RiskLevel::Low);
        assert_eq!(decision.action, RiskAction::Allow);
    }

    #[test]
    fn test_threshold_boundary_is_conservative() {
        let scorer = CompositeScorer::new(
            [(SignalKind::Amount, 1.0)],
            RiskLevelThresholds {
                medium: 0.5,
                critical: 0.75,
            },
        )
        .unwrap();

        let at_medium = scorer.compute(&results(&[(SignalKind::Amount, 0.5)])).unwrap();
        assert_eq!(at_medium.level, RiskLevel::Medium);
        assert_eq!(at_medium.action, RiskAction::Review);

        let at_critical = scorer.compute(&results(&[(SignalKind::Amount, 0.75)])).unwrap();
        assert_eq!(at_critical.level, RiskLevel::Critical);
        assert_eq!(at_critical.action, RiskAction::Block);
    }

    #[test]
    fn test_drifting_sum_on_threshold_is_medium() {
        let scorer = CompositeScorer::new(weights(), RiskLevelThresholds::default()).unwrap();
        // 0.06 + 0.105 + 0.105 + 0.03 sums to slightly under 0.3 in f64
        let results = results(&[
            (SignalKind::Anomaly, 0.0),
            (SignalKind::Behavior, 0.3),
            (SignalKind::Amount, 0.7),
            (SignalKind::Merchant, 0.0),
            (SignalKind::Biometric, 0.7),
            (SignalKind::Network, 0.3),
        ]);

        let decision = scorer.compute(&results).unwrap();

        assert_eq!(decision.score, 0.3);
        assert_eq!(decision.level, RiskLevel::Medium);
        assert_eq!(decision.action, RiskAction::Review);
    }

    #[test]
    fn test_missing_signals_contribute_nothing() {
        let scorer = CompositeScorer::new(weights(), RiskLevelThresholds::default()).unwrap();

        let decision = scorer.compute(&results(&[(SignalKind::Network, 1.0)])).unwrap();
        assert!((decision.score - 0.1).abs() < 1e-12);

        let empty = scorer.compute(&SignalResults::new()).unwrap();
        assert_eq!(empty.score, 0.0);
        assert_eq!(empty.level, RiskLevel::Low);
    }

    #[test]
    fn test_fallback_results_use_their_default() {
        let scorer = CompositeScorer::new(weights(), RiskLevelThresholds::default()).unwrap();
        let mut results = results(&[(SignalKind::Anomaly, 0.5)]);
        results.insert(
            SignalKind::Biometric,
            SignalResult::timed_out(SignalKind::Biometric, 0.2),
        );

        let decision = scorer.compute(&results).unwrap();
        assert!((decision.score - (0.15 + 0.03)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_weights_not_summing_to_one() {
        let err = CompositeScorer::new(
            [(SignalKind::Anomaly, 0.6), (SignalKind::Amount, 0.6)],
            RiskLevelThresholds::default(),
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_top_contributor() {
        let scorer = CompositeScorer::new(weights(), RiskLevelThresholds::default()).unwrap();
        let results = results(&[
            (SignalKind::Anomaly, 0.1),
            (SignalKind::Merchant, 0.8),
        ]);

        let (kind, contribution) = scorer.top_contributor(&results).unwrap();
        assert_eq!(kind, SignalKind::Merchant);
        assert!((contribution - 0.08).abs() < 1e-12);

        assert!(scorer.top_contributor(&SignalResults::new()).is_none());
    }

    #[test]
    fn test_non_finite_score_is_a_pipeline_fault() {
        let scorer = CompositeScorer::new(weights(), RiskLevelThresholds::default()).unwrap();
        let results = results(&[(SignalKind::Anomaly, f64::INFINITY)]);

        assert!(matches!(
            scorer.compute(&results),
            Err(PipelineError::Unexpected(_))
        ));
    }
}
