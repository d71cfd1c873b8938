//! NATS consumer for incoming transactions

use crate::types::transaction::Transaction;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving transactions from NATS.
///
/// Subscribes without a queue group: user history lives in this process, so
/// every transaction for a user must reach the same instance.
pub struct TransactionConsumer {
    client: Client,
    subject: String,
}

impl TransactionConsumer {
    /// Create a new transaction consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the transaction subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to transaction subject");
        Ok(subscriber)
    }

    /// Decode a message payload into a transaction
    pub fn decode(payload: &[u8]) -> serde_json::Result<Transaction> {
        serde_json::from_slice(payload)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_extra_fields() {
        let payload = br#"{
            "transaction_id": "T005",
            "user_id": "u_200",
            "timestamp": "2026-02-15T10:00:00",
            "amount": 500.0,
            "ip_address": "185.199.108.153",
            "device_hash": "dev_x",
            "merchant_id": "m_42"
        }"#;

        let tx = TransactionConsumer::decode(payload).unwrap();
        assert_eq!(tx.user_id, "u_200");
        assert_eq!(tx.device_hash.as_deref(), Some("dev_x"));
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(TransactionConsumer::decode(b"not json").is_err());
    }
}
