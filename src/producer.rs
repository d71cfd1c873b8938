//! NATS producer for score records

use crate::types::scores::ScoredTransaction;
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Producer for publishing scored transactions to NATS
#[derive(Clone)]
pub struct ScoreProducer {
    client: Client,
    subject: String,
}

impl ScoreProducer {
    /// Create a new score producer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish one score record
    pub async fn publish(&self, record: &ScoredTransaction) -> Result<()> {
        let payload = serde_json::to_vec(record)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            score_id = %record.score_id,
            user_id = %record.user_id,
            fraud_risk_score = record.scores.fraud_risk_score,
            "Published score record"
        );

        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
