//! Failsafe controller guarding the whole scoring pipeline
//!
//! Each request starts in [`FailsafeState::Normal`]. Overrunning the global
//! deadline, returning a [`PipelineError`] or panicking trips the request
//! into [`FailsafeState::Failsafe`], which never transitions back. A tripped
//! request gets a conservative REVIEW decision instead of a computed one.

use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::types::decision::{RiskAction, RiskDecision, RiskLevel, RiskLevelThresholds};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Why a request left the normal path
#[derive(Debug, Clone, PartialEq)]
pub enum FailsafeTrigger {
    DeadlineExceeded { elapsed: Duration },
    Fault(String),
}

impl fmt::Display for FailsafeTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailsafeTrigger::DeadlineExceeded { elapsed } => {
                write!(f, "deadline exceeded after {}ms", elapsed.as_millis())
            }
            FailsafeTrigger::Fault(message) => write!(f, "pipeline fault: {message}"),
        }
    }
}

impl From<PipelineError> for FailsafeTrigger {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::DeadlineExceeded { elapsed, .. } => {
                FailsafeTrigger::DeadlineExceeded { elapsed }
            }
            PipelineError::Unexpected(message) => FailsafeTrigger::Fault(message),
        }
    }
}

/// Per-request controller state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FailsafeState {
    #[default]
    Normal,
    Failsafe(FailsafeTrigger),
}

impl FailsafeState {
    /// Move to FAILSAFE. An already tripped state keeps its first trigger.
    pub fn trip(&mut self, trigger: FailsafeTrigger) {
        if *self == FailsafeState::Normal {
            *self = FailsafeState::Failsafe(trigger);
        }
    }

    pub fn is_failsafe(&self) -> bool {
        matches!(self, FailsafeState::Failsafe(_))
    }
}

/// Conservative result synthesized on the failsafe path
#[derive(Debug, Clone)]
pub struct FailsafeFallback {
    pub decision: RiskDecision,
    pub trigger: FailsafeTrigger,
    /// Time spent synthesizing the fallback
    pub synthesis_time: Duration,
}

/// Outcome of a guarded pipeline run
#[derive(Debug)]
pub enum GuardOutcome<T> {
    Normal(T),
    Failsafe(FailsafeFallback),
}

/// Enforces the global deadline around the pipeline.
pub struct FailsafeController {
    deadline: Duration,
    budget: Duration,
    thresholds: RiskLevelThresholds,
}

impl FailsafeController {
    pub fn new(deadline: Duration, budget: Duration, thresholds: RiskLevelThresholds) -> Self {
        Self {
            deadline,
            budget,
            thresholds,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.orchestrator.deadline(),
            config.orchestrator.failsafe_budget(),
            config.decision.risk_levels.clone(),
        )
    }

    /// Budget for a normal response
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Budget for the failsafe path itself
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// The conservative decision: MEDIUM / REVIEW, never ALLOW.
    pub fn fallback_decision(&self) -> RiskDecision {
        RiskDecision {
            score: self.thresholds.medium,
            level: RiskLevel::Medium,
            action: RiskAction::Review,
        }
    }

    /// Run `pipeline` under the deadline measured from `started`.
    ///
    /// The pipeline runs in its own task so a panic is contained; on deadline
    /// the task is aborted.
    pub async fn guard<T, F>(&self, started: Instant, pipeline: F) -> GuardOutcome<T>
    where
        F: Future<Output = Result<T, PipelineError>> + Send + 'static,
        T: Send + 'static,
    {
        let mut state = FailsafeState::Normal;
        let mut value = None;

        let remaining = self.deadline.saturating_sub(started.elapsed());
        let mut task = tokio::spawn(pipeline);

        match tokio::time::timeout(remaining, &mut task).await {
            Ok(Ok(Ok(result))) => value = Some(result),
            Ok(Ok(Err(err))) => state.trip(err.into()),
            Ok(Err(join_error)) => state.trip(FailsafeTrigger::Fault(join_error.to_string())),
            Err(_) => {
                task.abort();
                state.trip(self.overrun(started.elapsed()).into());
            }
        }

        let elapsed = started.elapsed();
        if elapsed > self.deadline {
            state.trip(self.overrun(elapsed).into());
        }

        match (state, value) {
            (FailsafeState::Normal, Some(value)) => GuardOutcome::Normal(value),
            (FailsafeState::Failsafe(trigger), _) => GuardOutcome::Failsafe(self.engage(trigger)),
            (FailsafeState::Normal, None) => GuardOutcome::Failsafe(
                self.engage(FailsafeTrigger::Fault("pipeline produced no result".to_string())),
            ),
        }
    }

    fn overrun(&self, elapsed: Duration) -> PipelineError {
        PipelineError::DeadlineExceeded {
            deadline: self.deadline,
            elapsed,
        }
    }

    fn engage(&self, trigger: FailsafeTrigger) -> FailsafeFallback {
        let started = Instant::now();
        let decision = self.fallback_decision();
        let synthesis_time = started.elapsed();

        match &trigger {
            FailsafeTrigger::DeadlineExceeded { .. } => {
                warn!(trigger = %trigger, "Failsafe engaged");
            }
            FailsafeTrigger::Fault(_) => {
                error!(trigger = %trigger, "Failsafe engaged");
            }
        }
        if synthesis_time > self.budget {
            warn!(
                synthesis_us = synthesis_time.as_micros() as u64,
                budget_ms = self.budget.as_millis() as u64,
                "Failsafe synthesis exceeded its budget"
            );
        } else {
            debug!(
                synthesis_us = synthesis_time.as_micros() as u64,
                "Failsafe decision synthesized"
            );
        }

        FailsafeFallback {
            decision,
            trigger,
            synthesis_time,
        }
    }
}
