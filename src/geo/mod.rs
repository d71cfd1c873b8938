//! Network address to geolocation resolution.
//!
//! The engine only depends on the [`GeoResolver`] trait; the lookup backend is
//! injected at construction. [`StaticGeoResolver`] serves a fixed address table
//! and is what the service and the tests use.

use crate::config::GeoConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Network identity reported when an address cannot be resolved.
pub const UNKNOWN_NETWORK_IDENTITY: &str = "ASN_UNKNOWN";

/// A resolved location plus the network identity (ASN) behind the address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub network_identity: String,
}

impl GeoLocation {
    pub fn new(latitude: f64, longitude: f64, network_identity: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            network_identity: network_identity.into(),
        }
    }

    /// Sentinel location for unresolvable addresses.
    pub fn unknown() -> Self {
        Self::new(0.0, 0.0, UNKNOWN_NETWORK_IDENTITY)
    }

    /// Both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Outcome of a lookup. A degraded resolution still carries a usable
/// (sentinel) location; scoring proceeds with it.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(GeoLocation),
    Degraded(GeoLocation),
}

impl Resolution {
    pub fn location(&self) -> &GeoLocation {
        match self {
            Resolution::Resolved(location) | Resolution::Degraded(location) => location,
        }
    }

    pub fn into_location(self) -> GeoLocation {
        match self {
            Resolution::Resolved(location) | Resolution::Degraded(location) => location,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Resolution::Degraded(_))
    }
}

/// Maps a network address to a location. Must be deterministic for a given
/// address and must not fail: unknown addresses resolve to a sentinel.
pub trait GeoResolver: Send + Sync {
    fn resolve(&self, network_address: &str) -> Resolution;
}

/// Resolver backed by a fixed address table.
#[derive(Debug, Clone)]
pub struct StaticGeoResolver {
    table: HashMap<String, GeoLocation>,
    unknown: GeoLocation,
}

impl StaticGeoResolver {
    /// Empty table; every lookup degrades to the sentinel.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
            unknown: GeoLocation::unknown(),
        }
    }

    /// Build from the `[geo]` configuration section
    pub fn from_config(config: &GeoConfig) -> Self {
        let table = config
            .addresses
            .iter()
            .map(|entry| {
                (
                    entry.address.trim().to_string(),
                    GeoLocation::new(entry.latitude, entry.longitude, entry.network_identity.clone()),
                )
            })
            .collect();

        Self {
            table,
            unknown: GeoLocation::new(0.0, 0.0, config.unknown_identity.clone()),
        }
    }

    /// Add or replace one address.
    pub fn with_location(mut self, address: impl Into<String>, location: GeoLocation) -> Self {
        self.table.insert(address.into(), location);
        self
    }

    /// Number of known addresses
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for StaticGeoResolver {
    fn default() -> Self {
        Self::from_config(&GeoConfig::default())
    }
}

impl GeoResolver for StaticGeoResolver {
    fn resolve(&self, network_address: &str) -> Resolution {
        match self.table.get(network_address.trim()) {
            Some(location) => Resolution::Resolved(location.clone()),
            None => {
                debug!(network_address = %network_address, "Address not in geo table, using sentinel");
                Resolution::Degraded(self.unknown.clone())
            }
        }
    }
}
