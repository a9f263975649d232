//! Transaction request data structures

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Channel through which a transaction was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Mobile,
    Pos,
    Atm,
    Transfer,
}

impl Channel {
    /// Card-not-present channels
    pub fn is_remote(&self) -> bool {
        matches!(self, Channel::Web | Channel::Mobile | Channel::Transfer)
    }
}

/// Network and device metadata reported by the client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientMetadata {
    /// Client IP address
    #[serde(default)]
    pub ip_address: Option<String>,

    /// Device fingerprint hash
    #[serde(default)]
    pub device_fingerprint: Option<String>,

    /// ISO country code resolved from the client network
    #[serde(default)]
    pub country: Option<String>,

    /// Raw user agent string
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Whether the edge flagged the connection as a proxy/VPN
    #[serde(default)]
    pub proxy_detected: bool,
}

/// Keystroke/touch sample captured during the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricSample {
    /// Mean interval between keystrokes in milliseconds
    pub typing_interval_ms: f64,

    /// Mean normalized touch pressure (0.0 - 1.0), when available
    #[serde(default)]
    pub touch_pressure: Option<f64>,

    /// Session length before submission
    #[serde(default)]
    pub session_duration_secs: f64,
}

/// A transaction submitted for risk analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Unique transaction identifier
    pub transaction_id: String,

    /// Paying user
    pub sender_id: String,

    /// Receiving user or merchant account
    pub receiver_id: String,

    /// Transaction amount in `currency` units
    pub amount: f64,

    /// ISO-4217 currency code
    pub currency: String,

    /// Initiation channel
    pub channel: Channel,

    /// Merchant category (e.g. "gambling", "grocery"), absent for P2P transfers
    #[serde(default)]
    pub merchant_category: Option<String>,

    /// Client network/device metadata
    #[serde(default)]
    pub client: ClientMetadata,

    /// Optional behavioral biometric sample
    #[serde(default)]
    pub biometric: Option<BiometricSample>,

    /// Submission timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl TransactionRequest {
    /// Create a new request with required fields
    pub fn new(
        transaction_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        amount: f64,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            amount,
            currency: "USD".to_string(),
            channel: Channel::Web,
            merchant_category: None,
            client: ClientMetadata::default(),
            biometric: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_merchant_category(mut self, category: impl Into<String>) -> Self {
        self.merchant_category = Some(category.into());
        self
    }

    pub fn with_client(mut self, client: ClientMetadata) -> Self {
        self.client = client;
        self
    }

    pub fn with_biometric(mut self, sample: BiometricSample) -> Self {
        self.biometric = Some(sample);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Reject structurally invalid requests before any scoring happens.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.transaction_id.trim().is_empty() {
            return Err(ValidationError::MissingField("transaction_id"));
        }
        if self.sender_id.trim().is_empty() {
            return Err(ValidationError::MissingField("sender_id"));
        }
        if self.receiver_id.trim().is_empty() {
            return Err(ValidationError::MissingField("receiver_id"));
        }
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(ValidationError::InvalidAmount(self.amount));
        }
        let currency_ok =
            self.currency.len() == 3 && self.currency.chars().all(|c| c.is_ascii_uppercase());
        if !currency_ok {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }
        if self.sender_id == self.receiver_id {
            return Err(ValidationError::SelfTransfer(self.sender_id.clone()));
        }
        if let Some(sample) = &self.biometric {
            let pressure_ok = sample
                .touch_pressure
                .map_or(true, |p| p.is_finite() && (0.0..=1.0).contains(&p));
            if !sample.typing_interval_ms.is_finite()
                || sample.typing_interval_ms < 0.0
                || !sample.session_duration_secs.is_finite()
                || sample.session_duration_secs < 0.0
                || !pressure_ok
            {
                return Err(ValidationError::InvalidBiometric);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization_defaults() {
        let json = r#"{
            "transaction_id": "tx_123",
            "sender_id": "alice",
            "receiver_id": "bob",
            "amount": 42.5,
            "currency": "EUR",
            "channel": "mobile"
        }"#;

        let request: TransactionRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.channel, Channel::Mobile);
        assert!(request.merchant_category.is_none());
        assert!(request.biometric.is_none());
        assert!(!request.client.proxy_detected);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_amounts() {
        let zero = TransactionRequest::new("tx_1", "alice", "bob", 0.0);
        assert_eq!(zero.validate(), Err(ValidationError::InvalidAmount(0.0)));

        let negative = TransactionRequest::new("tx_2", "alice", "bob", -5.0);
        assert!(matches!(
            negative.validate(),
            Err(ValidationError::InvalidAmount(_))
        ));

        let nan = TransactionRequest::new("tx_3", "alice", "bob", f64::NAN);
        assert!(matches!(nan.validate(), Err(ValidationError::InvalidAmount(_))));
    }

    #[test]
    fn test_validation_rejects_malformed_fields() {
        let missing_id = TransactionRequest::new(" ", "alice", "bob", 10.0);
        assert_eq!(
            missing_id.validate(),
            Err(ValidationError::MissingField("transaction_id"))
        );

        let mut bad_currency = TransactionRequest::new("tx_1", "alice", "bob", 10.0);
        bad_currency.currency = "usd".to_string();
        assert!(matches!(
            bad_currency.validate(),
            Err(ValidationError::InvalidCurrency(_))
        ));

        let self_transfer = TransactionRequest::new("tx_2", "alice", "alice", 10.0);
        assert!(matches!(
            self_transfer.validate(),
            Err(ValidationError::SelfTransfer(_))
        ));

        let bad_sample = TransactionRequest::new("tx_3", "alice", "bob", 10.0).with_biometric(
            BiometricSample {
                typing_interval_ms: 120.0,
                touch_pressure: Some(1.5),
                session_duration_secs: 30.0,
            },
        );
        assert_eq!(bad_sample.validate(), Err(ValidationError::InvalidBiometric));
    }
}
