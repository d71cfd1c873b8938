//! Per-user rolling history and the store that owns it.

use crate::features::geo_history::GeoHistoryTracker;
use crate::features::rolling::RollingStatTracker;
use crate::geo::GeoLocation;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Rolling behavioral history for one user.
///
/// Features are computed against this state as it stood before the current
/// transaction; [`UserState::commit`] is the only mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    amounts: RollingStatTracker,
    timestamps: Vec<DateTime<FixedOffset>>,
    geo: GeoHistoryTracker,
}

/// Everything a scored transaction contributes to history.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub amount: f64,
    pub timestamp: DateTime<FixedOffset>,
    pub location: GeoLocation,
    /// Distance from the previous location (0 on the first transaction).
    pub distance_km: f64,
}

impl UserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prior amounts in processing order.
    pub fn amounts(&self) -> &RollingStatTracker {
        &self.amounts
    }

    /// Prior timestamps, parallel to `amounts`.
    pub fn timestamps(&self) -> &[DateTime<FixedOffset>] {
        &self.timestamps
    }

    pub fn geo(&self) -> &GeoHistoryTracker {
        &self.geo
    }

    pub fn transactions_processed(&self) -> usize {
        self.timestamps.len()
    }

    /// Append one observation to every tracker. Infallible, so a scored
    /// transaction is either fully recorded or not at all.
    pub fn commit(&mut self, observation: Observation) {
        self.amounts.push(observation.amount);
        self.timestamps.push(observation.timestamp);
        self.geo
            .commit(observation.location, observation.timestamp, observation.distance_km);
    }
}

/// Shared handle to one user's state. Holding the lock serializes every
/// computation for that user.
pub type SharedUserState = Arc<Mutex<UserState>>;

/// Owner of all per-user state.
///
/// Implementations decide retention (unbounded, evicting, externally backed);
/// the engine only needs insert-if-absent access.
pub trait UserStateStore: Send + Sync {
    /// Fetch the user's state, creating an empty one if absent.
    fn get_or_create(&self, user_id: &str) -> SharedUserState;

    /// Fetch the user's state without creating it.
    fn get(&self, user_id: &str) -> Option<SharedUserState>;

    /// Drop a user's history.
    fn remove(&self, user_id: &str) -> Option<SharedUserState>;

    /// Number of tracked users.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Unbounded in-memory store. State lives for the process lifetime unless
/// removed explicitly.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, SharedUserState>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStateStore for InMemoryUserStore {
    fn get_or_create(&self, user_id: &str) -> SharedUserState {
        if let Some(state) = self.get(user_id) {
            return state;
        }

        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        users
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(UserState::new())))
            .clone()
    }

    fn get(&self, user_id: &str) -> Option<SharedUserState> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }

    fn remove(&self, user_id: &str) -> Option<SharedUserState> {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(user_id)
    }

    fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::parse_timestamp;

    fn observation(amount: f64, timestamp: &str, distance_km: f64) -> Observation {
        Observation {
            amount,
            timestamp: parse_timestamp(timestamp).unwrap(),
            location: GeoLocation::new(37.386, -122.0838, "AS15169"),
            distance_km,
        }
    }

    #[test]
    fn test_commit_keeps_sequences_aligned() {
        let mut state = UserState::new();
        assert!(state.geo().last_known().is_none());

        state.commit(observation(1200.0, "2026-02-15T09:00:00", 0.0));
        state.commit(observation(1350.0, "2026-02-15T09:12:00", 0.0));
        state.commit(observation(1500.0, "2026-02-15T09:24:00", 0.0));

        assert_eq!(state.amounts().len(), state.timestamps().len());
        assert_eq!(state.transactions_processed(), 3);
        assert_eq!(state.geo().step_distances().len(), 2);
        assert!(state.geo().last_known().is_some());
    }

    #[test]
    fn test_store_get_or_create_is_shared() {
        let store = InMemoryUserStore::new();
        assert!(store.is_empty());
        assert!(store.get("u_100").is_none());

        let first = store.get_or_create("u_100");
        first
            .lock()
            .unwrap()
            .commit(observation(10.0, "2026-02-15T09:00:00", 0.0));

        let second = store.get_or_create("u_100");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().unwrap().transactions_processed(), 1);
        assert_eq!(store.len(), 1);

        store.get_or_create("u_200");
        assert_eq!(store.len(), 2);

        assert!(store.remove("u_100").is_some());
        assert!(store.get("u_100").is_none());
        assert_eq!(store.len(), 1);
    }
}
