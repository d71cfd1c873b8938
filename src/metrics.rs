//! Performance metrics and statistics tracking for the scoring service.

use crate::types::scores::FeatureScores;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the scoring service
pub struct PipelineMetrics {
    /// Total transactions scored
    pub transactions_scored: AtomicU64,
    /// Transactions rejected as invalid
    pub transactions_rejected: AtomicU64,
    /// Transactions scored against a sentinel location
    pub geo_degraded: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Fraud risk score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    /// Running sums of the component scores
    component_sums: RwLock<[f64; 3]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            transactions_scored: AtomicU64::new(0),
            transactions_rejected: AtomicU64::new(0),
            geo_degraded: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            component_sums: RwLock::new([0.0; 3]),
            start_time: Instant::now(),
        }
    }

    /// Record a scored transaction
    pub fn record_scored(&self, processing_time: Duration, scores: &FeatureScores, geo_degraded: bool) {
        self.transactions_scored.fetch_add(1, Ordering::Relaxed);
        if geo_degraded {
            self.geo_degraded.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (scores.fraud_risk_score * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }

        if let Ok(mut sums) = self.component_sums.write() {
            sums[0] += scores.spending_score;
            sums[1] += scores.velocity_score;
            sums[2] += scores.geo_score;
        }
    }

    /// Record a rejected transaction
    pub fn record_rejected(&self) {
        self.transactions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let times = self
            .processing_times
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if times.is_empty() {
            return ProcessingStats::default();
        }

        let mut sorted: Vec<u64> = times.clone();
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[(count as f64 * 0.95) as usize],
            p99_us: sorted[(count as f64 * 0.99) as usize],
            max_us: *sorted.last().unwrap_or(&0),
        }
    }

    /// Mean spending, velocity and geo scores so far
    pub fn get_component_means(&self) -> [f64; 3] {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        if scored == 0 {
            return [0.0; 3];
        }
        let sums = *self
            .component_sums
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        sums.map(|sum| sum / scored as f64)
    }

    /// Get current throughput (transactions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.transactions_scored.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get fraud risk score distribution
    pub fn get_score_distribution(&self) -> [u64; 10] {
        *self
            .score_buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let scored = self.transactions_scored.load(Ordering::Relaxed);
        let rejected = self.transactions_rejected.load(Ordering::Relaxed);
        let degraded = self.geo_degraded.load(Ordering::Relaxed);
        let degraded_rate = if scored > 0 {
            (degraded as f64 / scored as f64) * 100.0
        } else {
            0.0
        };

        let processing = self.get_processing_stats();
        let throughput = self.get_throughput();
        let [spending, velocity, geo] = self.get_component_means();
        let score_dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            FRAUD FEATURE ENGINE - METRICS SUMMARY            ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Transactions Scored:    {:>8}  │  Throughput: {:>6.1} tx/s ║",
            scored, throughput
        );
        info!(
            "║ Rejected (invalid):     {:>8}  │  Geo Degraded: {:>5.1}%   ║",
            rejected, degraded_rate
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Processing Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            processing.mean_us, processing.p50_us, processing.p95_us, processing.p99_us
        );
        info!(
            "║ Mean Scores: spending={:.3} velocity={:.3} geo={:.3}         ║",
            spending, velocity, geo
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Fraud Risk Distribution:                                     ║");
        let total: u64 = score_dist.iter().sum();
        for (i, &count) in score_dist.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar: String = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs: interval_secs.max(1),
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
