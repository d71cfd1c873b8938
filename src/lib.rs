//! Fraud Feature Engine Library
//!
//! Stateful per-user fraud risk features for a stream of transactions:
//! spending deviation, velocity, geo anomaly and a fused risk score, each
//! bounded to [0, 1].

pub mod config;
pub mod consumer;
pub mod dispatch;
pub mod error;
pub mod features;
pub mod geo;
pub mod metrics;
pub mod producer;
pub mod state;
pub mod types;

pub use config::AppConfig;
pub use consumer::TransactionConsumer;
pub use dispatch::UserDispatcher;
pub use error::{EngineError, Result};
pub use features::{FeatureBreakdown, FraudFeatureEngine};
pub use geo::{GeoLocation, GeoResolver, Resolution, StaticGeoResolver};
pub use producer::ScoreProducer;
pub use state::{InMemoryUserStore, UserState, UserStateStore};
pub use types::{FeatureScores, ScoredTransaction, Transaction};
