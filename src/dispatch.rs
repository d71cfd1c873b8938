//! Per-user work routing
//!
//! Each user id hashes to one worker queue, so transactions for the same user
//! are scored in arrival order while different users proceed in parallel.

use anyhow::{anyhow, Result};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tokio::sync::mpsc;

/// Routes items onto a fixed set of bounded FIFO queues by key.
///
/// Dropping the dispatcher closes every queue; receivers then drain what is
/// already buffered and return `None`.
pub struct UserDispatcher<T> {
    queues: Vec<mpsc::Sender<T>>,
}

impl<T> UserDispatcher<T> {
    /// Create `workers` queues of `capacity` items each. The receivers are
    /// returned in worker order.
    pub fn new(workers: usize, capacity: usize) -> (Self, Vec<mpsc::Receiver<T>>) {
        let (queues, receivers) = (0..workers.max(1))
            .map(|_| mpsc::channel(capacity.max(1)))
            .unzip();
        (Self { queues }, receivers)
    }

    pub fn workers(&self) -> usize {
        self.queues.len()
    }

    /// Index of the queue that owns `key`. Stable for the process lifetime.
    pub fn worker_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.queues.len() as u64) as usize
    }

    /// Enqueue `item` on the queue owning `key`, waiting while it is full.
    pub async fn dispatch(&self, key: &str, item: T) -> Result<()> {
        let worker = self.worker_for(key);
        self.queues[worker]
            .send(item)
            .await
            .map_err(|_| anyhow!("worker {} queue is closed", worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_same_key_same_worker() {
        let (dispatcher, _receivers) = UserDispatcher::<u32>::new(8, 4);
        let first = dispatcher.worker_for("u_100");
        for _ in 0..10 {
            assert_eq!(dispatcher.worker_for("u_100"), first);
        }
        assert!(first < dispatcher.workers());
    }

    #[test]
    fn test_zero_workers_gets_one_queue() {
        let (dispatcher, receivers) = UserDispatcher::<u32>::new(0, 0);
        assert_eq!(dispatcher.workers(), 1);
        assert_eq!(receivers.len(), 1);
        assert_eq!(dispatcher.worker_for("anyone"), 0);
    }

    #[test]
    fn test_users_spread_across_workers() {
        let (dispatcher, _receivers) = UserDispatcher::<u32>::new(4, 4);
        let used: HashSet<usize> = (0..100)
            .map(|i| dispatcher.worker_for(&format!("u_{:04}", i)))
            .collect();
        assert!(used.len() > 1);
    }

    #[tokio::test]
    async fn test_one_user_arrives_in_order() {
        let (dispatcher, mut receivers) = UserDispatcher::new(4, 16);
        let worker = dispatcher.worker_for("u_100");

        for seq in 0..10u32 {
            dispatcher.dispatch("u_100", seq).await.unwrap();
        }
        drop(dispatcher);

        let mut received = Vec::new();
        while let Some(seq) = receivers[worker].recv().await {
            received.push(seq);
        }
        assert_eq!(received, (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_drop_drains_buffered_items() {
        let (dispatcher, receivers) = UserDispatcher::new(3, 8);
        for i in 0..30u32 {
            dispatcher.dispatch(&format!("u_{}", i), i).await.unwrap();
        }
        drop(dispatcher);

        let handles: Vec<_> = receivers
            .into_iter()
            .map(|mut rx| {
                tokio::spawn(async move {
                    let mut count = 0;
                    while rx.recv().await.is_some() {
                        count += 1;
                    }
                    count
                })
            })
            .collect();

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 30);
    }

    #[tokio::test]
    async fn test_dispatch_to_closed_queue_fails() {
        let (dispatcher, receivers) = UserDispatcher::<u32>::new(1, 1);
        drop(receivers);
        assert!(dispatcher.dispatch("u_1", 1).await.is_err());
    }
}
