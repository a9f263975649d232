//! Append-only decision ledger sinks

use crate::types::decision::{RiskAction, RiskLevel, TransactionResponse};
use crate::types::transaction::TransactionRequest;
use async_nats::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;
use tracing::{debug, error, warn};

/// One decision as written to the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub record_id: String,
    pub transaction_id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub amount: f64,
    pub currency: String,
    pub score: f64,
    pub level: RiskLevel,
    pub action: RiskAction,
    pub failsafe: bool,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerRecord {
    pub fn new(request: &TransactionRequest, response: &TransactionResponse) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            transaction_id: request.transaction_id.clone(),
            sender_id: request.sender_id.clone(),
            receiver_id: request.receiver_id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            score: response.decision.score,
            level: response.decision.level,
            action: response.decision.action,
            failsafe: response.failsafe,
            recorded_at: Utc::now(),
        }
    }
}

/// Fire-and-forget destination for ledger records.
///
/// `append` must not block the response path and never reports failure to
/// the caller; sinks log their own errors.
pub trait LedgerSink: Send + Sync {
    fn append(&self, record: LedgerRecord);
}

/// Publishes records as JSON on a NATS subject
#[derive(Clone)]
pub struct NatsLedgerSink {
    client: Client,
    subject: String,
}

impl NatsLedgerSink {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl LedgerSink for NatsLedgerSink {
    fn append(&self, record: LedgerRecord) {
        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(e) => {
                error!(record_id = %record.record_id, error = %e, "Failed to encode ledger record");
                return;
            }
        };

        let client = self.client.clone();
        let subject = self.subject.clone();
        tokio::spawn(async move {
            match client.publish(subject, payload.into()).await {
                Ok(()) => debug!(
                    record_id = %record.record_id,
                    transaction_id = %record.transaction_id,
                    "Ledger record appended"
                ),
                Err(e) => warn!(
                    record_id = %record.record_id,
                    transaction_id = %record.transaction_id,
                    error = %e,
                    "Failed to append ledger record"
                ),
            }
        });
    }
}

/// Keeps records in memory, for tests and dry runs
#[derive(Default)]
pub struct MemoryLedger {
    records: RwLock<Vec<LedgerRecord>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LedgerRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerSink for MemoryLedger {
    fn append(&self, record: LedgerRecord) {
        match self.records.write() {
            Ok(mut records) => records.push(record),
            Err(e) => warn!(error = %e, "Ledger lock poisoned, record dropped"),
        }
    }
}

/// Discards every record
pub struct NullLedger;

impl LedgerSink for NullLedger {
    fn append(&self, _record: LedgerRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decision::{RiskDecision, RiskLevelThresholds};
    use crate::types::signal::SignalResults;
    use std::time::Duration;

    fn response(failsafe: bool) -> TransactionResponse {
        let response = TransactionResponse::new(
            "tx_9".to_string(),
            RiskDecision::from_score(0.8, &RiskLevelThresholds::default()),
            SignalResults::new(),
            Duration::from_millis(3),
        );
        if failsafe {
            response.with_failsafe("deadline exceeded")
        } else {
            response
        }
    }

    #[test]
    fn test_record_mirrors_decision() {
        let request = TransactionRequest::new("tx_9", "alice", "bob", 120.0);
        let record = LedgerRecord::new(&request, &response(false));

        assert_eq!(record.transaction_id, "tx_9");
        assert_eq!(record.level, RiskLevel::Critical);
        assert_eq!(record.action, RiskAction::Block);
        assert!(!record.failsafe);
        assert_eq!(record.amount, 120.0);
    }

    #[test]
    fn test_memory_ledger_appends_in_order() {
        let ledger = MemoryLedger::new();
        let request = TransactionRequest::new("tx_9", "alice", "bob", 120.0);

        ledger.append(LedgerRecord::new(&request, &response(false)));
        ledger.append(LedgerRecord::new(&request, &response(true)));

        let records = ledger.records();
        assert_eq!(records.len(), 2);
        assert!(!records[0].failsafe);
        assert!(records[1].failsafe);
    }

    #[test]
    fn test_null_ledger_accepts_everything() {
        let request = TransactionRequest::new("tx_9", "alice", "bob", 120.0);
        NullLedger.append(LedgerRecord::new(&request, &response(false)));
    }
}
