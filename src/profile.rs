//! User profile store

use crate::types::profile::UserProfile;
use crate::types::transaction::TransactionRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Source of historical user profiles.
///
/// Lookups never fail: an unknown user, or a store that cannot answer,
/// yields the population-neutral profile.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Arc<UserProfile>;
}

type ProfileEntry = Arc<RwLock<Arc<UserProfile>>>;

/// In-memory profile cache.
///
/// Every user has its own lock. The outer map lock is only taken for
/// writing when a user is seen for the first time, so updating one user
/// never blocks readers of another. Readers get an immutable snapshot.
#[derive(Default)]
pub struct InMemoryProfileStore {
    entries: RwLock<HashMap<String, ProfileEntry>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a user's profile
    pub fn insert(&self, profile: UserProfile) {
        let entry = self.entry(&profile.user_id);
        match entry.write() {
            Ok(mut snapshot) => *snapshot = Arc::new(profile),
            Err(e) => warn!(error = %e, "Profile lock poisoned, update dropped"),
        };
    }

    /// Fold an accepted transaction into the sender's profile.
    pub fn record(&self, request: &TransactionRequest) {
        let entry = self.entry(&request.sender_id);
        let mut snapshot = match entry.write() {
            Ok(guard) => guard,
            Err(e) => {
                warn!(user_id = %request.sender_id, error = %e, "Profile lock poisoned, update dropped");
                return;
            }
        };
        // copy-on-write so readers holding the old snapshot are unaffected
        let mut updated = UserProfile::clone(&snapshot);
        updated.observe(request);
        *snapshot = Arc::new(updated);

        debug!(
            user_id = %request.sender_id,
            transactions = snapshot.transaction_count,
            "Profile updated"
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, user_id: &str) -> Option<Arc<UserProfile>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(user_id)?;
        let snapshot = entry.read().ok()?;
        Some(Arc::clone(&snapshot))
    }

    fn entry(&self, user_id: &str) -> ProfileEntry {
        if let Some(entry) = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(user_id).cloned())
        {
            return entry;
        }

        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(entries.entry(user_id.to_string()).or_insert_with(|| {
            Arc::new(RwLock::new(Arc::new(UserProfile::population(user_id))))
        }))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Arc<UserProfile> {
        self.lookup(user_id)
            .unwrap_or_else(|| Arc::new(UserProfile::population(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_user_gets_population_profile() {
        let store = InMemoryProfileStore::new();

        let profile = store.get("ghost").await;

        assert_eq!(*profile, UserProfile::population("ghost"));
        // lookups do not create entries
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_record_updates_sender_profile() {
        let store = InMemoryProfileStore::new();
        store.record(&TransactionRequest::new("t1", "alice", "bob", 40.0));
        store.record(&TransactionRequest::new("t2", "alice", "carol", 60.0));

        let profile = store.get("alice").await;

        assert_eq!(profile.transaction_count, 2);
        assert!((profile.avg_amount - 50.0).abs() < 1e-9);
        assert!(profile.known_receivers.contains_key("carol"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshots_are_immutable() {
        let store = InMemoryProfileStore::new();
        store.record(&TransactionRequest::new("t1", "alice", "bob", 40.0));

        let before = store.get("alice").await;
        store.record(&TransactionRequest::new("t2", "alice", "bob", 80.0));
        let after = store.get("alice").await;

        assert_eq!(before.transaction_count, 1);
        assert_eq!(after.transaction_count, 2);
    }

    #[tokio::test]
    async fn test_insert_replaces_profile() {
        let store = InMemoryProfileStore::new();
        let mut profile = UserProfile::population("dave");
        profile.avg_amount = 999.0;
        store.insert(profile);

        assert_eq!(store.get("dave").await.avg_amount, 999.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_not_lost() {
        let store = Arc::new(InMemoryProfileStore::new());

        let mut handles = Vec::new();
        for user in ["alice", "bob", "carol", "dave"] {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    let tx = TransactionRequest::new(format!("{user}_{i}"), user, "shop", 10.0);
                    store.record(&tx);
                    let _ = store.get("alice").await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        for user in ["alice", "bob", "carol", "dave"] {
            assert_eq!(store.get(user).await.transaction_count, 50);
        }
    }
}
