//! Type definitions for the fraud feature engine

pub mod scores;
pub mod transaction;

pub use scores::{FeatureScores, ScoredTransaction};
pub use transaction::{Transaction, ValidatedTransaction};
