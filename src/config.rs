//! Configuration management for the fraud feature service

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming transactions
    pub transaction_subject: String,
    /// Subject for outgoing score records
    pub score_subject: String,
}

/// Static geolocation table
#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    /// Network identity reported for unresolvable addresses
    #[serde(default = "default_unknown_identity")]
    pub unknown_identity: String,
    /// Known addresses
    #[serde(default)]
    pub addresses: Vec<GeoEntry>,
}

/// One address in the static geolocation table
#[derive(Debug, Clone, Deserialize)]
pub struct GeoEntry {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub network_identity: String,
}

impl GeoEntry {
    fn new(address: &str, latitude: f64, longitude: f64, network_identity: &str) -> Self {
        Self {
            address: address.to_string(),
            latitude,
            longitude,
            network_identity: network_identity.to_string(),
        }
    }
}

fn default_unknown_identity() -> String {
    crate::geo::UNKNOWN_NETWORK_IDENTITY.to_string()
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            unknown_identity: default_unknown_identity(),
            addresses: vec![
                GeoEntry::new("8.8.8.8", 37.386, -122.0838, "AS15169"),
                GeoEntry::new("1.1.1.1", -33.8688, 151.2093, "AS13335"),
                GeoEntry::new("142.250.183.46", 40.7128, -74.0060, "AS15169"),
                GeoEntry::new("52.95.110.1", 28.6139, 77.2090, "AS16509"),
                GeoEntry::new("185.199.108.153", 51.5074, -0.1278, "AS54113"),
            ],
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Scoring workers; each user is pinned to one of them
    pub workers: usize,
    /// Transactions buffered per worker before intake waits
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
}

fn default_report_interval() -> u64 {
    30
}

fn default_queue_capacity() -> usize {
    1024
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, with `FRAUD__`-prefixed
    /// environment overrides (e.g. `FRAUD__NATS__URL`)
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                transaction_subject: "transactions".to_string(),
                score_subject: "fraud.scores".to_string(),
            },
            geo: GeoConfig::default(),
            pipeline: PipelineConfig {
                workers: 4,
                queue_capacity: default_queue_capacity(),
                report_interval_secs: default_report_interval(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.score_subject, "fraud.scores");
        assert_eq!(config.geo.addresses.len(), 5);
        assert_eq!(config.geo.unknown_identity, "ASN_UNKNOWN");
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.queue_capacity, 1024);
    }

    #[test]
    fn test_shipped_config_file_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/config.toml");
        let config = AppConfig::load_from_path(path).unwrap();
        assert_eq!(config.nats.transaction_subject, "transactions");
        assert_eq!(config.geo.addresses.len(), 5);
        assert_eq!(config.pipeline.queue_capacity, 256);
        assert!(config
            .geo
            .addresses
            .iter()
            .any(|entry| entry.address == "52.95.110.1" && entry.network_identity == "AS16509"));
    }
}
