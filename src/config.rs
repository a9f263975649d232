//! Configuration management for the risk orchestrator

use crate::types::decision::RiskLevelThresholds;
use crate::types::signal::SignalKind;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Tolerance when checking that signal weights sum to 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub orchestrator: OrchestratorConfig,
    pub signals: SignalsConfig,
    pub decision: DecisionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transaction requests
    pub transaction_subject: String,
    /// Subject for outgoing responses when the request carries no reply subject
    pub response_subject: String,
    /// Subject the ledger sink appends records to
    pub ledger_subject: String,
}

/// Deadline configuration for a single `analyze` call
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    /// Global budget for a normal (non-failsafe) response
    pub deadline_ms: u64,
    /// Budget for synthesizing the failsafe response
    #[serde(default = "default_failsafe_budget_ms")]
    pub failsafe_budget_ms: u64,
}

fn default_failsafe_budget_ms() -> u64 {
    50
}

impl OrchestratorConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }

    pub fn failsafe_budget(&self) -> Duration {
        Duration::from_millis(self.failsafe_budget_ms)
    }
}

/// Per-signal settings
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SignalSettings {
    /// Weight in the composite score
    pub weight: f64,
    /// Individual timeout for the provider
    pub timeout_ms: u64,
    /// Score substituted when the provider times out or fails
    #[serde(default)]
    pub default_score: f64,
}

impl SignalSettings {
    pub fn new(weight: f64, timeout_ms: u64) -> Self {
        Self {
            weight,
            timeout_ms,
            default_score: 0.0,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for every signal provider
#[derive(Debug, Clone, Deserialize)]
pub struct SignalsConfig {
    pub anomaly: SignalSettings,
    pub behavior: SignalSettings,
    pub amount: SignalSettings,
    pub merchant: SignalSettings,
    pub biometric: SignalSettings,
    pub network: SignalSettings,
}

impl SignalsConfig {
    /// Settings for one signal
    pub fn settings(&self, kind: SignalKind) -> &SignalSettings {
        match kind {
            SignalKind::Anomaly => &self.anomaly,
            SignalKind::Behavior => &self.behavior,
            SignalKind::Amount => &self.amount,
            SignalKind::Merchant => &self.merchant,
            SignalKind::Biometric => &self.biometric,
            SignalKind::Network => &self.network,
        }
    }

    /// (kind, weight) pairs in identity order
    pub fn weights(&self) -> Vec<(SignalKind, f64)> {
        SignalKind::ALL
            .iter()
            .map(|&kind| (kind, self.settings(kind).weight))
            .collect()
    }
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            anomaly: SignalSettings::new(0.30, 100),
            behavior: SignalSettings::new(0.20, 100),
            amount: SignalSettings::new(0.15, 50),
            merchant: SignalSettings::new(0.10, 80),
            biometric: SignalSettings::new(0.15, 120),
            network: SignalSettings::new(0.10, 80),
        }
    }
}

/// Decision configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionConfig {
    /// Risk level classification thresholds
    pub risk_levels: RiskLevelThresholds,
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of requests analyzed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    /// Fold allowed transactions back into the sender's profile
    #[serde(default = "default_learn_profiles")]
    pub learn_profiles: bool,
}

fn default_report_interval_secs() -> u64 {
    30
}

fn default_learn_profiles() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// Values can be overridden with `RISK__SECTION__KEY` environment variables.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("RISK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field invariants the type system cannot express
    pub fn validate(&self) -> Result<()> {
        let weight_sum: f64 = self.signals.weights().iter().map(|(_, w)| w).sum();
        ensure!(
            (weight_sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
            "signal weights must sum to 1.0, got {weight_sum}"
        );

        for kind in SignalKind::ALL {
            let settings = self.signals.settings(kind);
            ensure!(
                settings.weight >= 0.0,
                "signal {kind} has negative weight {}",
                settings.weight
            );
            ensure!(settings.timeout_ms > 0, "signal {kind} has a zero timeout");
            ensure!(
                (0.0..=1.0).contains(&settings.default_score),
                "signal {kind} default score {} is outside [0, 1]",
                settings.default_score
            );
        }

        let levels = &self.decision.risk_levels;
        ensure!(
            0.0 < levels.medium && levels.medium < levels.critical && levels.critical <= 1.0,
            "risk thresholds must satisfy 0 < medium < critical <= 1 (medium={}, critical={})",
            levels.medium,
            levels.critical
        );

        ensure!(self.orchestrator.deadline_ms > 0, "deadline_ms must be positive");
        ensure!(
            self.orchestrator.failsafe_budget_ms < self.orchestrator.deadline_ms,
            "failsafe budget ({}ms) must be shorter than the deadline ({}ms)",
            self.orchestrator.failsafe_budget_ms,
            self.orchestrator.deadline_ms
        );
        ensure!(self.pipeline.workers > 0, "pipeline.workers must be positive");

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions.requests".to_string(),
                response_subject: "transactions.decisions".to_string(),
                ledger_subject: "transactions.ledger".to_string(),
            },
            orchestrator: OrchestratorConfig {
                deadline_ms: 200,
                failsafe_budget_ms: 50,
            },
            signals: SignalsConfig::default(),
            decision: DecisionConfig {
                risk_levels: RiskLevelThresholds::default(),
            },
            pipeline: PipelineConfig {
                workers: 8,
                report_interval_secs: 30,
                learn_profiles: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
