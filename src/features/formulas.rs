//! Pure scoring formulas.
//!
//! Every function here is stateless. The engine feeds them history snapshots
//! and combines their outputs; nothing in this module touches user state.

/// Added to every denominator that could be zero (a std or a time delta).
pub const EPSILON: f64 = 1e-9;

/// Mean Earth radius used by the haversine distance.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Travel speed (km/h) at which the speed anomaly saturates.
pub const MAX_TRAVEL_SPEED_KMH: f64 = 900.0;

/// Geo composite weights.
pub const GEO_SPEED_WEIGHT: f64 = 0.5;
pub const GEO_HISTORY_WEIGHT: f64 = 0.3;
pub const GEO_NETWORK_WEIGHT: f64 = 0.2;

/// Fusion weights.
pub const SPENDING_WEIGHT: f64 = 0.4;
pub const VELOCITY_WEIGHT: f64 = 0.3;
pub const GEO_WEIGHT: f64 = 0.3;

/// Logistic normalization: `1 / (1 + e^-x)`.
///
/// Saturates to exactly 0.0 or 1.0 for very large magnitudes, never NaN for
/// finite input.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Great-circle distance in kilometres between two (lat, lon) points given
/// in degrees.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    2.0 * EARTH_RADIUS_KM * a.min(1.0).sqrt().asin()
}

/// `S_spend = |amount - mean| / (std + ε)`
pub fn spending_deviation(amount: f64, mean: f64, std: f64) -> f64 {
    (amount - mean).abs() / (std + EPSILON)
}

/// `S_velocity = (N_w - λ) / (σ_λ + ε)`
pub fn velocity_deviation(window_count: f64, hourly_mean: f64, hourly_std: f64) -> f64 {
    (window_count - hourly_mean) / (hourly_std + EPSILON)
}

/// Implied travel speed in km/h. The elapsed time is floored at ε so that
/// simultaneous or out-of-order transactions yield a very large speed rather
/// than a division by zero.
pub fn travel_speed_kmh(distance_km: f64, elapsed_hours: f64) -> f64 {
    distance_km / elapsed_hours.max(EPSILON)
}

/// `S_speed = min(1, v / 900)`
pub fn speed_anomaly(speed_kmh: f64) -> f64 {
    (speed_kmh / MAX_TRAVEL_SPEED_KMH).min(1.0)
}

/// `S_hist = distance / (geo_std + ε)`
pub fn geo_history_deviation(distance_km: f64, geo_std: f64) -> f64 {
    distance_km / (geo_std + EPSILON)
}

/// `S_asn`: 1 when the network identity changed, else 0.
pub fn network_change(previous: &str, current: &str) -> f64 {
    if previous != current {
        1.0
    } else {
        0.0
    }
}

/// `S_geo = 0.5·S_speed + 0.3·S_hist + 0.2·S_asn`
pub fn geo_composite(speed: f64, history: f64, network: f64) -> f64 {
    GEO_SPEED_WEIGHT * speed + GEO_HISTORY_WEIGHT * history + GEO_NETWORK_WEIGHT * network
}

/// `Risk_raw = 0.4·spending + 0.3·velocity + 0.3·geo` over normalized scores.
pub fn fuse_risk(spending_score: f64, velocity_score: f64, geo_score: f64) -> f64 {
    SPENDING_WEIGHT * spending_score + VELOCITY_WEIGHT * velocity_score + GEO_WEIGHT * geo_score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_bounds() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert_eq!(sigmoid(1e9), 1.0);
        assert_eq!(sigmoid(-1e9), 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Mountain View -> Sydney
        let d = haversine_km(37.386, -122.0838, -33.8688, 151.2093);
        assert!(d > 11_900.0 && d < 12_000.0, "got {}", d);

        assert_eq!(haversine_km(51.5074, -0.1278, 51.5074, -0.1278), 0.0);
    }

    #[test]
    fn test_haversine_symmetry() {
        let points = [
            (37.386, -122.0838),
            (-33.8688, 151.2093),
            (28.6139, 77.2090),
            (51.5074, -0.1278),
            (0.0, 0.0),
        ];
        for &(a, b) in &points {
            for &(c, d) in &points {
                let forward = haversine_km(a, b, c, d);
                let backward = haversine_km(c, d, a, b);
                assert!((forward - backward).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_haversine_antipodal_is_finite() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_speed_anomaly_saturates() {
        assert_eq!(speed_anomaly(450.0), 0.5);
        assert_eq!(speed_anomaly(900.0), 1.0);
        assert_eq!(speed_anomaly(12_000.0), 1.0);

        // Zero or negative elapsed time is floored at epsilon
        assert_eq!(speed_anomaly(travel_speed_kmh(10.0, 0.0)), 1.0);
        assert_eq!(speed_anomaly(travel_speed_kmh(10.0, -2.0)), 1.0);
        assert_eq!(travel_speed_kmh(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_spending_deviation_monotonic() {
        let mut previous = sigmoid(spending_deviation(100.0, 100.0, 25.0));
        for amount in [110.0, 150.0, 200.0, 400.0] {
            let score = sigmoid(spending_deviation(amount, 100.0, 25.0));
            assert!(score > previous);
            previous = score;
        }
    }

    #[test]
    fn test_geo_composite_and_fusion_weights() {
        assert!((geo_composite(1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
        assert!((fuse_risk(1.0, 1.0, 1.0) - 1.0).abs() < 1e-12);
        assert_eq!(network_change("AS15169", "AS15169"), 0.0);
        assert_eq!(network_change("AS15169", "AS13335"), 1.0);
    }
}
