//! Feature extraction for transaction risk scoring.
//!
//! Turns a request and the sender's historical profile into a flat,
//! immutable feature record shared read-only by every signal provider.

use crate::types::profile::UserProfile;
use crate::types::transaction::TransactionRequest;
use chrono::Timelike;
use std::collections::BTreeMap;

/// Feature names produced by [`FeatureExtractor::extract`].
pub mod names {
    pub const AMOUNT: &str = "amount";
    pub const LOG_AMOUNT: &str = "log_amount";
    pub const AMOUNT_TO_AVG_RATIO: &str = "amount_to_avg_ratio";
    pub const AMOUNT_ZSCORE: &str = "amount_zscore";
    pub const HOUR_OF_DAY: &str = "hour_of_day";
    pub const UNUSUAL_HOUR: &str = "unusual_hour";
    pub const KNOWN_DEVICE: &str = "known_device";
    pub const MISSING_DEVICE: &str = "missing_device";
    pub const KNOWN_RECEIVER: &str = "known_receiver";
    pub const FOREIGN_COUNTRY: &str = "foreign_country";
    pub const MISSING_IP: &str = "missing_ip";
    pub const PROXY_DETECTED: &str = "proxy_detected";
    pub const REMOTE_CHANNEL: &str = "remote_channel";
    pub const HAS_BIOMETRIC: &str = "has_biometric";
    pub const TYPING_INTERVAL_DEVIATION: &str = "typing_interval_deviation";
    pub const TOUCH_PRESSURE: &str = "touch_pressure";
    pub const PROFILE_HISTORY: &str = "profile_history";
    pub const MINUTES_SINCE_LAST_SEEN: &str = "minutes_since_last_seen";
}

const FEATURE_NAMES: [&str; 18] = [
    names::AMOUNT,
    names::LOG_AMOUNT,
    names::AMOUNT_TO_AVG_RATIO,
    names::AMOUNT_ZSCORE,
    names::HOUR_OF_DAY,
    names::UNUSUAL_HOUR,
    names::KNOWN_DEVICE,
    names::MISSING_DEVICE,
    names::KNOWN_RECEIVER,
    names::FOREIGN_COUNTRY,
    names::MISSING_IP,
    names::PROXY_DETECTED,
    names::REMOTE_CHANNEL,
    names::HAS_BIOMETRIC,
    names::TYPING_INTERVAL_DEVIATION,
    names::TOUCH_PRESSURE,
    names::PROFILE_HISTORY,
    names::MINUTES_SINCE_LAST_SEEN,
];

/// Hours assumed normal for users without recorded history
const DEFAULT_ACTIVE_HOURS: std::ops::RangeInclusive<u8> = 8..=22;
/// Neutral value for an unknown/ambiguous binary feature
const NEUTRAL: f64 = 0.5;
/// Neutral recency for users never seen before (one day)
const NEUTRAL_RECENCY_MINUTES: f64 = 1440.0;

/// Immutable feature-name to value mapping for one request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureRecord {
    values: BTreeMap<&'static str, f64>,
}

impl FeatureRecord {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Value of a feature, or `default` when it was not produced
    pub fn value_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    /// Treat a 0/1 feature as a flag
    pub fn flag(&self, name: &str) -> bool {
        self.value_or(name, 0.0) >= 1.0
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

impl FromIterator<(&'static str, f64)> for FeatureRecord {
    fn from_iter<I: IntoIterator<Item = (&'static str, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Feature extractor that transforms requests into signal inputs.
///
/// Total over structurally valid requests: missing profile fields fall back
/// to population-wide neutral values.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Create a new feature extractor.
    pub fn new() -> Self {
        Self
    }

    /// Extract features from a request and the sender's profile.
    pub fn extract(&self, tx: &TransactionRequest, profile: &UserProfile) -> FeatureRecord {
        let mut features: Vec<(&'static str, f64)> = Vec::with_capacity(FEATURE_NAMES.len());

        // Amount features
        let avg_amount = profile.avg_amount.max(1.0);
        let std_dev = profile.amount_std_dev.max(1.0);
        features.push((names::AMOUNT, tx.amount));
        features.push((names::LOG_AMOUNT, tx.amount.ln_1p()));
        features.push((names::AMOUNT_TO_AVG_RATIO, tx.amount / avg_amount));
        features.push((names::AMOUNT_ZSCORE, (tx.amount - profile.avg_amount) / std_dev));

        // Temporal features
        let hour = tx.timestamp.hour() as u8;
        let unusual_hour = if profile.typical_hours.is_empty() {
            !DEFAULT_ACTIVE_HOURS.contains(&hour)
        } else {
            !profile.typical_hours.contains(&hour)
        };
        features.push((names::HOUR_OF_DAY, hour as f64));
        features.push((names::UNUSUAL_HOUR, indicator(unusual_hour)));

        let minutes_since_last_seen = profile
            .last_seen
            .map(|last| ((tx.timestamp - last).num_seconds() as f64 / 60.0).max(0.0))
            .unwrap_or(NEUTRAL_RECENCY_MINUTES);
        features.push((names::MINUTES_SINCE_LAST_SEEN, minutes_since_last_seen));

        // Device and counterparty familiarity
        let known_device = match &tx.client.device_fingerprint {
            None => 0.0,
            Some(_) if profile.known_devices.is_empty() => NEUTRAL,
            Some(device) => indicator(profile.known_devices.contains_key(device)),
        };
        features.push((names::KNOWN_DEVICE, known_device));
        features.push((
            names::MISSING_DEVICE,
            indicator(tx.client.device_fingerprint.is_none()),
        ));

        let known_receiver = if profile.has_history() {
            indicator(profile.known_receivers.contains_key(&tx.receiver_id))
        } else {
            NEUTRAL
        };
        features.push((names::KNOWN_RECEIVER, known_receiver));

        // Network features
        let foreign_country = match (&tx.client.country, &profile.home_country) {
            (Some(country), Some(home)) => indicator(!country.eq_ignore_ascii_case(home)),
            _ => 0.0,
        };
        features.push((names::FOREIGN_COUNTRY, foreign_country));
        features.push((names::MISSING_IP, indicator(tx.client.ip_address.is_none())));
        features.push((names::PROXY_DETECTED, indicator(tx.client.proxy_detected)));
        features.push((names::REMOTE_CHANNEL, indicator(tx.channel.is_remote())));

        // Biometric features
        let (has_biometric, deviation, pressure) = match &tx.biometric {
            Some(sample) => {
                let deviation = match profile.avg_typing_interval_ms {
                    Some(baseline) if baseline > 0.0 => {
                        (sample.typing_interval_ms - baseline).abs() / baseline
                    }
                    _ => 0.0,
                };
                (1.0, deviation, sample.touch_pressure.unwrap_or(NEUTRAL))
            }
            None => (0.0, 0.0, NEUTRAL),
        };
        features.push((names::HAS_BIOMETRIC, has_biometric));
        features.push((names::TYPING_INTERVAL_DEVIATION, deviation));
        features.push((names::TOUCH_PRESSURE, pressure));

        features.push((names::PROFILE_HISTORY, profile.transaction_count as f64));

        features.into_iter().collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_NAMES.len()
    }

    /// Get feature names.
    pub fn feature_names(&self) -> Vec<&'static str> {
        FEATURE_NAMES.to_vec()
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::{BiometricSample, ClientMetadata};
    use chrono::{TimeZone, Utc};

    fn at_hour(hour: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn seasoned_profile() -> UserProfile {
        let mut profile = UserProfile::population("alice");
        for amount in [80.0, 100.0, 120.0] {
            let tx = TransactionRequest::new("seed", "alice", "bob", amount)
                .with_timestamp(at_hour(10))
                .with_client(ClientMetadata {
                    device_fingerprint: Some("fp_home".to_string()),
                    country: Some("US".to_string()),
                    ip_address: Some("10.0.0.1".to_string()),
                    ..ClientMetadata::default()
                });
            profile.observe(&tx);
        }
        profile
    }

    #[test]
    fn test_feature_extraction() {
        let extractor = FeatureExtractor::new();
        let tx = TransactionRequest::new("test_001", "alice", "bob", 250.0);

        let features = extractor.extract(&tx, &UserProfile::population("alice"));

        assert_eq!(features.len(), extractor.feature_count());
        assert_eq!(features.get(names::AMOUNT), Some(250.0));
        assert_eq!(features.get(names::AMOUNT_TO_AVG_RATIO), Some(2.5));
        assert_eq!(features.get(names::AMOUNT_ZSCORE), Some(3.0));
    }

    #[test]
    fn test_feature_count() {
        let extractor = FeatureExtractor::new();
        assert_eq!(extractor.feature_count(), 18);
        assert_eq!(extractor.feature_names().len(), 18);

        let tx = TransactionRequest::new("t", "alice", "bob", 1.0);
        let features = extractor.extract(&tx, &UserProfile::population("alice"));
        for name in extractor.feature_names() {
            assert!(features.get(name).is_some(), "missing feature {name}");
        }
        assert_eq!(features.get(names::REMOTE_CHANNEL), Some(1.0));
        assert_eq!(features.get(names::TOUCH_PRESSURE), Some(0.5));
    }

    #[test]
    fn test_unknown_profile_uses_neutral_values() {
        let extractor = FeatureExtractor::new();
        let tx = TransactionRequest::new("t", "carol", "dave", 50.0)
            .with_timestamp(at_hour(12))
            .with_client(ClientMetadata {
                device_fingerprint: Some("fp_new".to_string()),
                country: Some("FR".to_string()),
                ..ClientMetadata::default()
            });

        let features = extractor.extract(&tx, &UserProfile::population("carol"));

        assert_eq!(features.get(names::KNOWN_DEVICE), Some(0.5));
        assert_eq!(features.get(names::KNOWN_RECEIVER), Some(0.5));
        assert_eq!(features.get(names::FOREIGN_COUNTRY), Some(0.0));
        assert_eq!(features.get(names::UNUSUAL_HOUR), Some(0.0));
        assert_eq!(features.get(names::MINUTES_SINCE_LAST_SEEN), Some(1440.0));
    }

    #[test]
    fn test_familiarity_against_history() {
        let extractor = FeatureExtractor::new();
        let profile = seasoned_profile();

        let familiar = TransactionRequest::new("t1", "alice", "bob", 100.0)
            .with_timestamp(at_hour(10))
            .with_client(ClientMetadata {
                device_fingerprint: Some("fp_home".to_string()),
                country: Some("US".to_string()),
                ip_address: Some("10.0.0.1".to_string()),
                ..ClientMetadata::default()
            });
        let features = extractor.extract(&familiar, &profile);
        assert!(features.flag(names::KNOWN_DEVICE));
        assert!(features.flag(names::KNOWN_RECEIVER));
        assert!(!features.flag(names::UNUSUAL_HOUR));
        assert!(!features.flag(names::FOREIGN_COUNTRY));

        let stranger = TransactionRequest::new("t2", "alice", "mallory", 100.0)
            .with_timestamp(at_hour(3))
            .with_client(ClientMetadata {
                device_fingerprint: Some("fp_other".to_string()),
                country: Some("RU".to_string()),
                ..ClientMetadata::default()
            });
        let features = extractor.extract(&stranger, &profile);
        assert!(!features.flag(names::KNOWN_DEVICE));
        assert!(!features.flag(names::KNOWN_RECEIVER));
        assert!(features.flag(names::UNUSUAL_HOUR));
        assert!(features.flag(names::FOREIGN_COUNTRY));
        assert!(features.flag(names::MISSING_IP));
    }

    #[test]
    fn test_typing_deviation_needs_baseline() {
        let extractor = FeatureExtractor::new();
        let sample = BiometricSample {
            typing_interval_ms: 300.0,
            touch_pressure: Some(0.4),
            session_duration_secs: 20.0,
        };
        let tx = TransactionRequest::new("t", "alice", "bob", 10.0).with_biometric(sample);

        let no_baseline = extractor.extract(&tx, &UserProfile::population("alice"));
        assert_eq!(no_baseline.get(names::TYPING_INTERVAL_DEVIATION), Some(0.0));
        assert_eq!(no_baseline.get(names::HAS_BIOMETRIC), Some(1.0));

        let mut profile = UserProfile::population("alice");
        profile.avg_typing_interval_ms = Some(150.0);
        let with_baseline = extractor.extract(&tx, &profile);
        assert_eq!(with_baseline.get(names::TYPING_INTERVAL_DEVIATION), Some(1.0));
        assert_eq!(with_baseline.get(names::TOUCH_PRESSURE), Some(0.4));
    }
}
