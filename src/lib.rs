//! Transaction Risk Orchestrator Library
//!
//! Scores payment transactions against several independent risk signals
//! in parallel, combines them into one weighted decision, and falls back to
//! a conservative decision whenever the pipeline misses its deadline.

pub mod config;
pub mod consumer;
pub mod dispatcher;
pub mod error;
pub mod failsafe;
pub mod feature_extractor;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod producer;
pub mod profile;
pub mod scorer;
pub mod signals;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use error::{PipelineError, ValidationError};
pub use feature_extractor::FeatureExtractor;
pub use orchestrator::RiskOrchestrator;
pub use producer::ResponseProducer;
pub use types::{
    decision::{RiskAction, RiskLevel, TransactionResponse},
    transaction::TransactionRequest,
};
