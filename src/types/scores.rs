//! Score bundles produced by the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four per-transaction scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureScores {
    /// Spending deviation score
    pub spending_score: f64,
    /// Velocity score
    pub velocity_score: f64,
    /// Geo anomaly score
    pub geo_score: f64,
    /// Fused fraud risk score
    pub fraud_risk_score: f64,
}

impl FeatureScores {
    /// All four scores in output order.
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.spending_score,
            self.velocity_score,
            self.geo_score,
            self.fraud_risk_score,
        ]
    }
}

/// Scored transaction published by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTransaction {
    /// Unique score record identifier
    pub score_id: String,

    /// Transaction ID from the input, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// User the scores belong to
    pub user_id: String,

    /// The scores themselves
    #[serde(flatten)]
    pub scores: FeatureScores,

    /// Geo resolution fell back to the sentinel location
    #[serde(default)]
    pub geo_degraded: bool,

    /// Scoring timestamp
    pub scored_at: DateTime<Utc>,
}

impl ScoredTransaction {
    /// Create a new scored transaction record
    pub fn new(transaction_id: Option<String>, user_id: String, scores: FeatureScores) -> Self {
        Self {
            score_id: uuid::Uuid::new_v4().to_string(),
            transaction_id,
            user_id,
            scores,
            geo_degraded: false,
            scored_at: Utc::now(),
        }
    }

    /// Mark the record as scored against a sentinel location
    pub fn with_geo_degraded(mut self, degraded: bool) -> Self {
        self.geo_degraded = degraded;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scored_transaction_wire_shape() {
        let scores = FeatureScores {
            spending_score: 0.5,
            velocity_score: 1.0,
            geo_score: 0.5,
            fraud_risk_score: 0.65,
        };
        let record = ScoredTransaction::new(Some("T001".to_string()), "u_100".to_string(), scores);

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["user_id"], "u_100");
        assert_eq!(value["transaction_id"], "T001");
        assert_eq!(value["spending_score"], 0.5);
        assert_eq!(value["fraud_risk_score"], 0.65);
        assert_eq!(value["geo_degraded"], false);

        let back: ScoredTransaction = serde_json::from_value(value).unwrap();
        assert_eq!(back.scores, scores);
        assert_eq!(back.score_id, record.score_id);
    }
}
