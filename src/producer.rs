//! NATS message producer for risk decisions

use crate::error::ValidationError;
use crate::types::decision::TransactionResponse;
use anyhow::Result;
use async_nats::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Notice published when a request fails validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionNotice {
    pub transaction_id: String,
    pub error: String,
    pub rejected_at: DateTime<Utc>,
}

impl RejectionNotice {
    pub fn new(transaction_id: &str, error: &ValidationError) -> Self {
        Self {
            transaction_id: transaction_id.to_string(),
            error: error.to_string(),
            rejected_at: Utc::now(),
        }
    }
}

/// Producer for publishing decisions to NATS
#[derive(Clone)]
pub struct ResponseProducer {
    client: Client,
    subject: String,
}

impl ResponseProducer {
    /// Create a new response producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a decision, to `reply` when the requester asked for one
    pub async fn publish(&self, response: &TransactionResponse, reply: Option<&str>) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        let subject = self.target(reply);

        self.client.publish(subject.clone(), payload.into()).await?;

        debug!(
            response_id = %response.response_id,
            transaction_id = %response.transaction_id,
            subject = %subject,
            risk_score = response.decision.score,
            "Published risk decision"
        );

        Ok(())
    }

    /// Publish a validation rejection
    pub async fn publish_rejection(
        &self,
        notice: &RejectionNotice,
        reply: Option<&str>,
    ) -> Result<()> {
        let payload = serde_json::to_vec(notice)?;
        let subject = self.target(reply);

        self.client.publish(subject, payload.into()).await?;

        debug!(
            transaction_id = %notice.transaction_id,
            error = %notice.error,
            "Published rejection notice"
        );

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }

    fn target(&self, reply: Option<&str>) -> String {
        reply.unwrap_or(&self.subject).to_string()
    }
}
