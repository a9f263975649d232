//! NATS message consumer for incoming risk analysis requests

use crate::types::transaction::TransactionRequest;
use anyhow::{Context, Result};
use async_nats::{Client, Message, Subscriber};
use tracing::info;

/// Consumer for receiving transaction requests from NATS
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    /// Create a new transaction consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the request subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self
            .client
            .subscribe(self.subject.clone())
            .await
            .with_context(|| format!("Failed to subscribe to {}", self.subject))?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode a request payload
pub fn decode_request(message: &Message) -> Result<TransactionRequest> {
    parse_request(&message.payload)
}

fn parse_request(payload: &[u8]) -> Result<TransactionRequest> {
    serde_json::from_slice(payload).context("Failed to deserialize transaction request")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::Channel;

    #[test]
    fn test_parse_request() {
        let payload = br#"{
            "transaction_id": "tx_7",
            "sender_id": "alice",
            "receiver_id": "shop_1",
            "amount": 19.99,
            "currency": "GBP",
            "channel": "pos",
            "merchant_category": "grocery"
        }"#;

        let request = parse_request(payload).unwrap();
        assert_eq!(request.transaction_id, "tx_7");
        assert_eq!(request.channel, Channel::Pos);
        assert_eq!(request.merchant_category.as_deref(), Some("grocery"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_request(b"not json").is_err());
    }
}
