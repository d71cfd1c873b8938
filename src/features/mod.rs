//! Fraud feature computation

pub mod engine;
pub mod formulas;
pub mod geo_history;
pub mod rolling;

pub use engine::{FeatureBreakdown, FraudFeatureEngine};
pub use geo_history::GeoHistoryTracker;
pub use rolling::{RollingStatTracker, RollingStats};
