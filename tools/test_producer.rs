//! Test Transaction Producer
//!
//! Publishes synthetic transactions to NATS for exercising the scoring
//! service. `scenario` mode replays the reference impossible-travel sequence;
//! otherwise a pool of users transacts from home with occasional anomalies.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use fraud_feature_engine::Transaction;
use rand::rngs::ThreadRng;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Addresses the service's default geo table knows about
const KNOWN_ADDRESSES: [&str; 5] = [
    "8.8.8.8",
    "1.1.1.1",
    "142.250.183.46",
    "52.95.110.1",
    "185.199.108.153",
];

/// A simulated account holder
struct SimulatedUser {
    user_id: String,
    home_address: &'static str,
    typical_amount: f64,
}

/// Transaction generator for testing
struct TransactionGenerator {
    rng: ThreadRng,
    users: Vec<SimulatedUser>,
    clock: DateTime<Utc>,
    transaction_counter: u64,
}

impl TransactionGenerator {
    fn new(user_count: usize) -> Self {
        let mut rng = rand::thread_rng();
        let users = (0..user_count.max(1))
            .map(|i| SimulatedUser {
                user_id: format!("u_{:04}", i),
                home_address: KNOWN_ADDRESSES[rng.gen_range(0..KNOWN_ADDRESSES.len())],
                typical_amount: rng.gen_range(20.0..800.0),
            })
            .collect();

        Self {
            rng,
            users,
            clock: Utc::now(),
            transaction_counter: 0,
        }
    }

    fn next_id_and_time(&mut self) -> (String, String) {
        self.transaction_counter += 1;
        self.clock += ChronoDuration::seconds(self.rng.gen_range(1..600));
        (
            format!("tx_{:012}", self.transaction_counter),
            self.clock.to_rfc3339(),
        )
    }

    /// Generate a routine transaction from the user's home address
    fn generate_legitimate(&mut self) -> Transaction {
        let (tx_id, timestamp) = self.next_id_and_time();
        let user = &self.users[self.rng.gen_range(0..self.users.len())];
        let amount = user.typical_amount * self.rng.gen_range(0.7..1.3);

        Transaction::new(user.user_id.clone(), timestamp, amount, user.home_address)
            .with_transaction_id(tx_id)
    }

    /// Generate a large transaction from somewhere else, sometimes unresolvable
    fn generate_suspicious(&mut self) -> Transaction {
        let (tx_id, timestamp) = self.next_id_and_time();
        let user = &self.users[self.rng.gen_range(0..self.users.len())];
        let amount = user.typical_amount * self.rng.gen_range(10.0..50.0);
        let address = if self.rng.gen_bool(0.2) {
            format!("203.0.113.{}", self.rng.gen_range(1..255))
        } else {
            KNOWN_ADDRESSES[self.rng.gen_range(0..KNOWN_ADDRESSES.len())].to_string()
        };

        Transaction::new(user.user_id.clone(), timestamp, amount, address)
            .with_transaction_id(tx_id)
    }
}

/// The reference sequence: u_100 jumps continents mid-session, u_200 is new.
fn reference_scenario() -> Vec<Transaction> {
    vec![
        Transaction::new("u_100", "2026-02-15T09:00:00", 1200.0, "8.8.8.8").with_transaction_id("T001"),
        Transaction::new("u_100", "2026-02-15T09:12:00", 1350.0, "8.8.8.8").with_transaction_id("T002"),
        Transaction::new("u_100", "2026-02-15T09:24:00", 42000.0, "1.1.1.1").with_transaction_id("T003"),
        Transaction::new("u_100", "2026-02-15T09:30:00", 1500.0, "52.95.110.1").with_transaction_id("T004"),
        Transaction::new("u_200", "2026-02-15T10:00:00", 500.0, "185.199.108.153").with_transaction_id("T005"),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Transaction Producer");

    // Usage: test-producer [nats_url] [subject] [count|scenario] [anomaly_rate] [delay_ms] [users]
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions");
    let mode = args.get(3).map(|s| s.as_str()).unwrap_or("100");
    let anomaly_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    let user_count: usize = args.get(6).and_then(|s| s.parse().ok()).unwrap_or(20);

    let transactions = if mode == "scenario" {
        reference_scenario()
    } else {
        let count: u64 = mode.parse().unwrap_or(100);
        let mut generator = TransactionGenerator::new(user_count);
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| {
                if rng.gen_bool(anomaly_rate.clamp(0.0, 1.0)) {
                    generator.generate_suspicious()
                } else {
                    generator.generate_legitimate()
                }
            })
            .collect()
    };

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = transactions.len(),
        anomaly_rate = anomaly_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(&transactions, delay_ms).await;
        }
    };

    for (i, transaction) in transactions.iter().enumerate() {
        let payload = serde_json::to_vec(transaction)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!("Published {}/{} transactions", i + 1, transactions.len());
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
    client.flush().await?;

    info!("Completed! Published {} transactions", transactions.len());

    Ok(())
}

async fn run_dry_mode(transactions: &[Transaction], delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    for (i, transaction) in transactions.iter().enumerate() {
        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(transaction)?;
            info!("Sample transaction {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
