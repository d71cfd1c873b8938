//! Per-transaction fraud feature computation.
//!
//! The engine validates a transaction, resolves its network address, then
//! scores it against the user's history as it stood before this transaction.
//! History is committed only after every score has been computed, while the
//! user's lock is still held.

use crate::error::Result;
use crate::features::formulas::{self, sigmoid};
use crate::features::rolling::{count_in_window, hourly_counts, RollingStats};
use crate::geo::{GeoLocation, GeoResolver, Resolution, StaticGeoResolver};
use crate::state::{InMemoryUserStore, Observation, UserState, UserStateStore};
use crate::types::scores::FeatureScores;
use crate::types::transaction::{Transaction, ValidatedTransaction};
use chrono::{DateTime, Duration, FixedOffset};
use std::sync::{Arc, PoisonError};
use tracing::{debug, warn};

/// Scores together with the intermediate terms that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBreakdown {
    pub scores: FeatureScores,

    // Spending
    pub amount_mean: f64,
    pub amount_std: f64,
    pub spend_deviation: f64,

    // Velocity
    /// Prior transactions in the trailing hour, plus the current one.
    pub window_count: usize,
    pub hourly_mean: f64,
    pub hourly_std: f64,
    pub velocity_deviation: f64,

    // Geo
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub speed_anomaly: f64,
    pub history_deviation: f64,
    pub network_change: f64,
    /// The address resolved to the sentinel location.
    pub geo_degraded: bool,

    /// Fused score before the final sigmoid.
    pub risk_raw: f64,
}

/// Stateful fraud feature engine.
///
/// Safe to share across threads: calls for the same user serialize on that
/// user's lock, calls for different users run independently.
pub struct FraudFeatureEngine {
    resolver: Arc<dyn GeoResolver>,
    store: Arc<dyn UserStateStore>,
}

impl FraudFeatureEngine {
    /// Create an engine with an in-memory user store.
    pub fn new(resolver: Arc<dyn GeoResolver>) -> Self {
        Self::with_store(resolver, Arc::new(InMemoryUserStore::new()))
    }

    /// Create an engine over a caller-supplied store.
    pub fn with_store(resolver: Arc<dyn GeoResolver>, store: Arc<dyn UserStateStore>) -> Self {
        Self { resolver, store }
    }

    /// Score a transaction and record it in the user's history.
    pub fn compute_fraud_features(&self, transaction: &Transaction) -> Result<FeatureScores> {
        self.compute(transaction).map(|breakdown| breakdown.scores)
    }

    /// Score a transaction, record it, and return the full breakdown.
    ///
    /// On error nothing is read or written.
    pub fn compute(&self, transaction: &Transaction) -> Result<FeatureBreakdown> {
        let tx = transaction.validate()?;
        let resolution = self.resolve(&tx.network_address);

        let shared = self.store.get_or_create(&tx.user_id);
        let mut state = shared.lock().unwrap_or_else(PoisonError::into_inner);

        let (breakdown, observation) = score_against(&state, &tx, resolution);
        state.commit(observation);
        let history_len = state.transactions_processed();
        drop(state);

        debug!(
            user_id = %tx.user_id,
            transaction_id = ?tx.transaction_id,
            spending = breakdown.scores.spending_score,
            velocity = breakdown.scores.velocity_score,
            geo = breakdown.scores.geo_score,
            risk = breakdown.scores.fraud_risk_score,
            distance_km = breakdown.distance_km,
            history_len,
            "Transaction scored"
        );

        Ok(breakdown)
    }

    /// Score a transaction against current history without recording it.
    ///
    /// Never creates state for an unseen user.
    pub fn preview(&self, transaction: &Transaction) -> Result<FeatureBreakdown> {
        let tx = transaction.validate()?;
        let resolution = self.resolve(&tx.network_address);

        let breakdown = match self.store.get(&tx.user_id) {
            Some(shared) => {
                let state = shared.lock().unwrap_or_else(PoisonError::into_inner);
                score_against(&state, &tx, resolution).0
            }
            None => score_against(&UserState::new(), &tx, resolution).0,
        };

        Ok(breakdown)
    }

    /// Copy of a user's current history.
    pub fn snapshot(&self, user_id: &str) -> Option<UserState> {
        self.store
            .get(user_id)
            .map(|shared| shared.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    /// Drop a user's history. Returns whether the user was tracked.
    pub fn forget_user(&self, user_id: &str) -> bool {
        self.store.remove(user_id).is_some()
    }

    /// Number of users with history.
    pub fn tracked_users(&self) -> usize {
        self.store.len()
    }

    fn resolve(&self, network_address: &str) -> Resolution {
        match self.resolver.resolve(network_address) {
            Resolution::Resolved(location) if !location.is_finite() => {
                warn!(
                    network_address = %network_address,
                    latitude = location.latitude,
                    longitude = location.longitude,
                    "Resolver returned non-finite coordinates, using sentinel"
                );
                Resolution::Degraded(GeoLocation::unknown())
            }
            Resolution::Degraded(location) => {
                warn!(network_address = %network_address, "Geo resolution degraded");
                if location.is_finite() {
                    Resolution::Degraded(location)
                } else {
                    Resolution::Degraded(GeoLocation::unknown())
                }
            }
            resolved => resolved,
        }
    }
}

impl Default for FraudFeatureEngine {
    fn default() -> Self {
        Self::new(Arc::new(StaticGeoResolver::default()))
    }
}

/// Compute every score for `tx` against `state` and build the observation
/// that commits it. Pure with respect to `state`.
fn score_against(
    state: &UserState,
    tx: &ValidatedTransaction,
    resolution: Resolution,
) -> (FeatureBreakdown, Observation) {
    // Spending deviation
    let (amount_mean, amount_std) = match state.amounts().stats() {
        Some(stats) => (stats.mean, stats.std),
        None => (tx.amount, 0.0),
    };
    let spend_deviation = formulas::spending_deviation(tx.amount, amount_mean, amount_std);
    let spending_score = sigmoid(spend_deviation);

    // Velocity
    let window_count = count_in_window(state.timestamps(), tx.timestamp, Duration::hours(1)) + 1;
    let hourly = RollingStats::from_values(&hourly_counts(state.timestamps())).unwrap_or_default();
    let velocity_deviation =
        formulas::velocity_deviation(window_count as f64, hourly.mean, hourly.std);
    let velocity_score = sigmoid(velocity_deviation);

    // Geo anomaly
    let geo_degraded = resolution.is_degraded();
    let location = resolution.into_location();
    let (distance_km, speed_kmh, speed_anomaly, history_deviation, network_change) =
        match state.geo().last_known() {
            Some(last) => {
                let distance_km = formulas::haversine_km(
                    last.location.latitude,
                    last.location.longitude,
                    location.latitude,
                    location.longitude,
                );
                let speed_kmh =
                    formulas::travel_speed_kmh(distance_km, elapsed_hours(last.timestamp, tx));
                (
                    distance_km,
                    speed_kmh,
                    formulas::speed_anomaly(speed_kmh),
                    formulas::geo_history_deviation(distance_km, state.geo().step_std()),
                    formulas::network_change(
                        &last.location.network_identity,
                        &location.network_identity,
                    ),
                )
            }
            None => (0.0, 0.0, 0.0, 0.0, 0.0),
        };
    let geo_score = sigmoid(formulas::geo_composite(
        speed_anomaly,
        history_deviation,
        network_change,
    ));

    // Fusion
    let risk_raw = formulas::fuse_risk(spending_score, velocity_score, geo_score);
    let scores = FeatureScores {
        spending_score,
        velocity_score,
        geo_score,
        fraud_risk_score: sigmoid(risk_raw),
    };

    let observation = Observation {
        amount: tx.amount,
        timestamp: tx.timestamp,
        location,
        distance_km,
    };

    let breakdown = FeatureBreakdown {
        scores,
        amount_mean,
        amount_std,
        spend_deviation,
        window_count,
        hourly_mean: hourly.mean,
        hourly_std: hourly.std,
        velocity_deviation,
        distance_km,
        speed_kmh,
        speed_anomaly,
        history_deviation,
        network_change,
        geo_degraded,
        risk_raw,
    };

    (breakdown, observation)
}

/// Hours from the last seen timestamp to this transaction. Negative when the
/// transaction is older than the last one seen.
fn elapsed_hours(last: DateTime<FixedOffset>, tx: &ValidatedTransaction) -> f64 {
    let delta = tx.timestamp - last;
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 3_600_000_000.0,
        None => delta.num_milliseconds() as f64 / 3_600_000.0,
    }
}
