//! Signal identities and per-signal results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of an independent scoring signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Anomaly,
    Behavior,
    Amount,
    Merchant,
    Biometric,
    Network,
}

impl SignalKind {
    pub const ALL: [SignalKind; 6] = [
        SignalKind::Anomaly,
        SignalKind::Behavior,
        SignalKind::Amount,
        SignalKind::Merchant,
        SignalKind::Biometric,
        SignalKind::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Anomaly => "anomaly",
            SignalKind::Behavior => "behavior",
            SignalKind::Amount => "amount",
            SignalKind::Merchant => "merchant",
            SignalKind::Biometric => "biometric",
            SignalKind::Network => "network",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a signal invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    Completed,
    TimedOut,
    Failed,
}

/// Output of one signal provider for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub kind: SignalKind,

    /// Risk contribution in [0.0, 1.0]
    pub score: f64,

    pub status: SignalStatus,

    /// Wall time spent waiting for this signal
    #[serde(default)]
    pub latency_us: u64,

    /// Explanatory metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignalResult {
    /// Successful result with the given score
    pub fn completed(kind: SignalKind, score: f64) -> Self {
        Self {
            kind,
            score,
            status: SignalStatus::Completed,
            latency_us: 0,
            details: BTreeMap::new(),
            error: None,
        }
    }

    /// Neutral substitute for a provider that exceeded its timeout
    pub fn timed_out(kind: SignalKind, default_score: f64) -> Self {
        Self {
            status: SignalStatus::TimedOut,
            ..Self::completed(kind, default_score)
        }
    }

    /// Neutral substitute for a provider that raised
    pub fn failed(kind: SignalKind, default_score: f64, error: impl Into<String>) -> Self {
        Self {
            status: SignalStatus::Failed,
            error: Some(error.into()),
            ..Self::completed(kind, default_score)
        }
    }

    /// Attach an explanatory detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == SignalStatus::Completed
    }
}

/// Signal results collected by provider identity
pub type SignalResults = BTreeMap<SignalKind, SignalResult>;
