//! Per-user geo history: last known location and step distances.

use crate::features::rolling::{RollingStatTracker, RollingStats};
use crate::geo::GeoLocation;
use chrono::{DateTime, FixedOffset};

/// Where and when a user was last seen.
#[derive(Debug, Clone, PartialEq)]
pub struct LastKnown {
    pub location: GeoLocation,
    pub timestamp: DateTime<FixedOffset>,
}

/// Tracks the last known location and the rolling sequence of distances
/// between consecutive transactions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoHistoryTracker {
    last_known: Option<LastKnown>,
    step_distances: RollingStatTracker,
}

impl GeoHistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` until the first transaction has been committed.
    pub fn last_known(&self) -> Option<&LastKnown> {
        self.last_known.as_ref()
    }

    pub fn step_distances(&self) -> &[f64] {
        self.step_distances.values()
    }

    /// Population std of prior step distances, 0 with fewer than two.
    pub fn step_std(&self) -> f64 {
        RollingStats::std_or_zero(self.step_distances.values())
    }

    /// Record a transaction's location.
    ///
    /// The step distance is appended only when a previous location existed;
    /// the last known fields are always overwritten so the first transaction
    /// seeds future comparisons.
    pub fn commit(&mut self, location: GeoLocation, timestamp: DateTime<FixedOffset>, distance_km: f64) {
        if self.last_known.is_some() {
            self.step_distances.push(distance_km);
        }
        self.last_known = Some(LastKnown { location, timestamp });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::transaction::parse_timestamp;

    #[test]
    fn test_first_commit_seeds_without_distance() {
        let mut tracker = GeoHistoryTracker::new();
        assert!(tracker.last_known().is_none());

        let at = parse_timestamp("2026-02-15T09:00:00").unwrap();
        tracker.commit(GeoLocation::new(37.386, -122.0838, "AS15169"), at, 0.0);

        let last = tracker.last_known().unwrap();
        assert_eq!(last.location.network_identity, "AS15169");
        assert_eq!(last.timestamp, at);
        assert!(tracker.step_distances().is_empty());
    }

    #[test]
    fn test_subsequent_commits_append_distances() {
        let mut tracker = GeoHistoryTracker::new();
        let at = parse_timestamp("2026-02-15T09:00:00").unwrap();

        tracker.commit(GeoLocation::new(0.0, 0.0, "A"), at, 0.0);
        tracker.commit(GeoLocation::new(0.0, 1.0, "A"), at, 10.0);
        assert_eq!(tracker.step_std(), 0.0);

        tracker.commit(GeoLocation::new(0.0, 2.0, "B"), at, 30.0);
        assert_eq!(tracker.step_distances(), &[10.0, 30.0]);
        assert_eq!(tracker.step_std(), 10.0);
        assert_eq!(tracker.last_known().unwrap().location.network_identity, "B");
    }
}
