//! Historical behavioral profile of a user

use crate::types::transaction::TransactionRequest;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Population-wide average transaction amount used for unknown users
pub const POPULATION_AVG_AMOUNT: f64 = 100.0;
/// Population-wide amount standard deviation used for unknown users
pub const POPULATION_AMOUNT_STD_DEV: f64 = 50.0;

const MAX_KNOWN_ENTRIES: usize = 64;
const TYPING_BASELINE_ALPHA: f64 = 0.2;

/// Rolling statistics about a user's past transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,

    /// Rolling mean of transaction amounts
    pub avg_amount: f64,

    /// Rolling (population) standard deviation of transaction amounts
    pub amount_std_dev: f64,

    /// Number of transactions folded into this profile
    pub transaction_count: u64,

    /// Hours of day (UTC) at which the user usually transacts
    #[serde(default)]
    pub typical_hours: BTreeSet<u8>,

    /// Device fingerprints seen before, with when they were last used
    #[serde(default)]
    pub known_devices: BTreeMap<String, DateTime<Utc>>,

    /// Counterparties paid before, with when they were last paid
    #[serde(default)]
    pub known_receivers: BTreeMap<String, DateTime<Utc>>,

    #[serde(default)]
    pub home_country: Option<String>,

    /// Baseline keystroke interval in milliseconds
    #[serde(default)]
    pub avg_typing_interval_ms: Option<f64>,

    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Population-neutral profile for a user with no history.
    pub fn population(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            avg_amount: POPULATION_AVG_AMOUNT,
            amount_std_dev: POPULATION_AMOUNT_STD_DEV,
            transaction_count: 0,
            typical_hours: BTreeSet::new(),
            known_devices: BTreeMap::new(),
            known_receivers: BTreeMap::new(),
            home_country: None,
            avg_typing_interval_ms: None,
            last_seen: None,
        }
    }

    /// Whether any history has been recorded
    pub fn has_history(&self) -> bool {
        self.transaction_count > 0
    }

    /// Fold an accepted transaction into the rolling statistics.
    pub fn observe(&mut self, request: &TransactionRequest) {
        let amount = request.amount;
        if self.transaction_count == 0 {
            self.avg_amount = amount;
            self.amount_std_dev = 0.0;
        } else {
            // Welford update over the population variance
            let n = self.transaction_count as f64;
            let m2 = self.amount_std_dev.powi(2) * n;
            let delta = amount - self.avg_amount;
            let mean = self.avg_amount + delta / (n + 1.0);
            let m2 = m2 + delta * (amount - mean);
            self.avg_amount = mean;
            self.amount_std_dev = (m2 / (n + 1.0)).max(0.0).sqrt();
        }
        self.transaction_count += 1;

        self.typical_hours.insert(request.timestamp.hour() as u8);

        if let Some(device) = &request.client.device_fingerprint {
            remember(&mut self.known_devices, device, request.timestamp);
        }
        remember(&mut self.known_receivers, &request.receiver_id, request.timestamp);
        if self.home_country.is_none() {
            self.home_country = request.client.country.clone();
        }
        if let Some(sample) = &request.biometric {
            self.avg_typing_interval_ms = Some(match self.avg_typing_interval_ms {
                Some(baseline) => {
                    baseline + TYPING_BASELINE_ALPHA * (sample.typing_interval_ms - baseline)
                }
                None => sample.typing_interval_ms,
            });
        }
        self.last_seen = Some(request.timestamp);
    }
}

/// Record `key` as seen at `at`, evicting the least recently seen entry
/// once the map is full.
fn remember(known: &mut BTreeMap<String, DateTime<Utc>>, key: &str, at: DateTime<Utc>) {
    if let Some(last) = known.get_mut(key) {
        *last = (*last).max(at);
        return;
    }
    if known.len() >= MAX_KNOWN_ENTRIES {
        let stalest = known
            .iter()
            .min_by_key(|(_, seen)| **seen)
            .map(|(k, _)| k.clone());
        if let Some(stalest) = stalest {
            known.remove(&stalest);
        }
    }
    known.insert(key.to_string(), at);
}
