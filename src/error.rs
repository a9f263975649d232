//! Error taxonomy for the orchestrator.
//!
//! Only [`ValidationError`] ever reaches a caller of `analyze`. Signal
//! timeouts and failures are recorded as [`SignalStatus`] values, and
//! [`PipelineError`]s are absorbed by the failsafe controller.
//!
//! [`SignalStatus`]: crate::types::signal::SignalStatus

use std::time::Duration;
use thiserror::Error;

/// Malformed request, rejected before feature extraction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("amount must be a positive finite number, got {0}")]
    InvalidAmount(f64),
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),
    #[error("sender and receiver are the same account: {0}")]
    SelfTransfer(String),
    #[error("biometric sample contains out-of-range values")]
    InvalidBiometric,
}

/// Whole-pipeline faults that route a request to the failsafe path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("pipeline deadline of {deadline:?} exceeded after {elapsed:?}")]
    DeadlineExceeded { deadline: Duration, elapsed: Duration },
    #[error("unexpected pipeline fault: {0}")]
    Unexpected(String),
}
