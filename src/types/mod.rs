//! Type definitions for the risk orchestrator

pub mod decision;
pub mod profile;
pub mod signal;
pub mod transaction;

pub use decision::{RiskAction, RiskDecision, RiskLevel, RiskLevelThresholds, TransactionResponse};
pub use profile::UserProfile;
pub use signal::{SignalKind, SignalResult, SignalResults, SignalStatus};
pub use transaction::{BiometricSample, Channel, ClientMetadata, TransactionRequest};
