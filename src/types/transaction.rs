//! Transaction data structures and input validation

use crate::error::{EngineError, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Naive ISO-8601 layouts accepted when the timestamp carries no offset.
const NAIVE_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Calendar years accepted in timestamps (four-digit ISO-8601 years).
const SUPPORTED_YEARS: RangeInclusive<i32> = 1..=9999;

/// A transaction as received on the wire.
///
/// Required fields are defaulted on deserialization so that a missing field
/// surfaces as `InvalidTransaction` from [`Transaction::validate`] instead of
/// a serde error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction identifier (carried through, not scored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    /// User the transaction belongs to
    #[serde(default)]
    pub user_id: String,

    /// ISO-8601 timestamp
    #[serde(default)]
    pub timestamp: String,

    /// Transaction amount (non-negative)
    #[serde(default)]
    pub amount: Option<f64>,

    /// Network address handed to the geo resolver
    #[serde(default, alias = "ip_address")]
    pub network_address: String,

    /// Device fingerprint (carried through, not scored)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_hash: Option<String>,
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(
        user_id: impl Into<String>,
        timestamp: impl Into<String>,
        amount: f64,
        network_address: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: None,
            user_id: user_id.into(),
            timestamp: timestamp.into(),
            amount: Some(amount),
            network_address: network_address.into(),
            device_hash: None,
        }
    }

    /// Attach a transaction identifier
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Check every required field and convert into a [`ValidatedTransaction`].
    pub fn validate(&self) -> Result<ValidatedTransaction> {
        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            return Err(EngineError::invalid("user_id", "is missing"));
        }

        if self.timestamp.trim().is_empty() {
            return Err(EngineError::invalid("timestamp", "is missing"));
        }
        let timestamp = parse_timestamp(&self.timestamp)?;

        let amount = self
            .amount
            .ok_or_else(|| EngineError::invalid("amount", "is missing"))?;
        if !amount.is_finite() {
            return Err(EngineError::invalid(
                "amount",
                format!("must be finite, got {}", amount),
            ));
        }
        if amount < 0.0 {
            return Err(EngineError::invalid(
                "amount",
                format!("must be non-negative, got {}", amount),
            ));
        }

        let network_address = self.network_address.trim();
        if network_address.is_empty() {
            return Err(EngineError::invalid("network_address", "is missing"));
        }

        Ok(ValidatedTransaction {
            transaction_id: self.transaction_id.clone(),
            user_id: user_id.to_string(),
            timestamp,
            amount,
            network_address: network_address.to_string(),
        })
    }
}

/// A transaction whose required fields have been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTransaction {
    pub transaction_id: Option<String>,
    pub user_id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub amount: f64,
    pub network_address: String,
}

/// Parse an ISO-8601 timestamp.
///
/// Offset-bearing timestamps keep their offset; naive ones are read as UTC.
/// Years outside 0001..=9999 are rejected.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let ts = parse_iso8601(raw).ok_or_else(|| {
        EngineError::invalid("timestamp", format!("is not ISO-8601: {:?}", raw))
    })?;

    if !SUPPORTED_YEARS.contains(&ts.year()) {
        return Err(EngineError::invalid(
            "timestamp",
            format!("year {} is outside 0001-9999", ts.year()),
        ));
    }

    Ok(ts)
}

fn parse_iso8601(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts);
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().fixed_offset())
}
