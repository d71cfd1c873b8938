//! Rolling statistics over append-only observation sequences.

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use std::collections::BTreeMap;

/// Mean and population standard deviation of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollingStats {
    pub mean: f64,
    /// Population std (divides by N).
    pub std: f64,
    pub count: usize,
}

impl RollingStats {
    /// Compute mean and population std. `None` for an empty sequence; the
    /// caller decides what an empty history means.
    ///
    /// Single-pass Welford update over values scaled by a power of two, so
    /// the result stays finite for any finite input, including values near
    /// `f64::MAX` whose plain sum would overflow.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let scale = power_of_two_scale(values);
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for (i, value) in values.iter().enumerate() {
            let x = value / scale;
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
        }

        let count = values.len();
        let std = if count > 1 {
            (m2 / count as f64).max(0.0).sqrt() * scale
        } else {
            0.0
        };

        Some(Self {
            mean: mean * scale,
            std,
            count,
        })
    }

    /// Population std, or 0 when fewer than two observations exist.
    pub fn std_or_zero(values: &[f64]) -> f64 {
        Self::from_values(values).map_or(0.0, |stats| stats.std)
    }
}

/// Largest power of two not above the biggest magnitude in `values`.
/// Dividing by it is exact and keeps every scaled value below 2.
fn power_of_two_scale(values: &[f64]) -> f64 {
    const EXPONENT_MASK: u64 = 0x7ff0_0000_0000_0000;

    let largest = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let scale = f64::from_bits(largest.to_bits() & EXPONENT_MASK);
    if scale.is_normal() {
        scale
    } else {
        1.0
    }
}

/// Append-only sequence of numeric observations for one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollingStatTracker {
    values: Vec<f64>,
}

impl RollingStatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation.
    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Mean and population std over everything observed so far.
    pub fn stats(&self) -> Option<RollingStats> {
        RollingStats::from_values(&self.values)
    }
}

/// Count timestamps inside the closed interval `[at - window, at]`.
///
/// Matches on timestamp value only, not arrival order. When `at - window`
/// falls outside the representable range the window is open at the start.
pub fn count_in_window(
    timestamps: &[DateTime<FixedOffset>],
    at: DateTime<FixedOffset>,
    window: Duration,
) -> usize {
    let start = at.checked_sub_signed(window);
    timestamps
        .iter()
        .filter(|&&ts| start.map_or(true, |start| start <= ts) && ts <= at)
        .count()
}

/// Transaction counts per clock-hour bucket across the whole history.
///
/// Each timestamp is truncated to its hour in its own offset; buckets are
/// keyed by the resulting instant. Only non-empty hours produce a count.
pub fn hourly_counts(timestamps: &[DateTime<FixedOffset>]) -> Vec<f64> {
    let mut buckets: BTreeMap<i64, u64> = BTreeMap::new();
    for ts in timestamps {
        let into_hour = i64::from(ts.minute()) * 60 + i64::from(ts.second());
        *buckets.entry(ts.timestamp() - into_hour).or_insert(0) += 1;
    }
    buckets.into_values().map(|count| count as f64).collect()
}
