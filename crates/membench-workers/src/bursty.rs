//! Bursty allocation worker: bursty-bucket-paced with sleep-debt smoothing.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use membench_core::{Clock, ObjectFactory};
use membench_core::BurstyTokenBucket;
use membench_store::StoreProducer;
use rand::Rng;

use crate::promotion::PromotionSampler;
use crate::ring::SurvivorRing;

const MS_FLOOR_NANOS: u64 = 1_000_000;

/// Parameters for one bursty-variant worker.
pub struct BurstyWorkerConfig {
    pub rate_bytes_per_sec: u64,
    pub duration_secs: f64,
    pub min_size: usize,
    pub max_size: usize,
    pub ring_len: usize,
    /// Damps the bucket's natural burn-then-wait spikiness. `0.0` disables
    /// smoothing entirely; `1.0` applies the full correction.
    pub smoothness_factor: f64,
}

/// Run one bursty-variant worker to completion.
///
/// `clock` should be freshly originated for this worker. Returns the
/// number of objects successfully promoted into the survivor ring (used by
/// tests as a liveness signal, since the bursty bucket has no single
/// residual-token figure analogous to the strict variant's).
pub fn run_bursty_worker(
    clock: Arc<dyn Clock>,
    producer: &StoreProducer,
    factory: &ObjectFactory,
    config: &BurstyWorkerConfig,
) -> u64 {
    let deadline_nanos = (config.duration_secs * 1_000_000_000.0) as u64;
    let capacity = config.rate_bytes_per_sec;
    // Refill at `rate_bytes_per_sec` tokens per second: the one-second
    // capacity drains and refills over the same one-second window.
    let mut bucket = BurstyTokenBucket::new(clock.clone(), capacity, config.rate_bytes_per_sec, 1_000_000_000);

    let mut ring = SurvivorRing::new(config.ring_len);
    let mut sampler = PromotionSampler::new();

    let expected_average_size = config.min_size.midpoint(config.max_size).max(1) as f64;
    let target_duration_nanos = if config.rate_bytes_per_sec == 0 {
        0.0
    } else {
        (expected_average_size / config.rate_bytes_per_sec as f64)
            * 1_000_000_000.0
            * config.smoothness_factor
    };

    let mut sleep_debt_nanos = 0.0f64;
    let mut allocated = 0u64;

    while clock.now_nanos() < deadline_nanos {
        let min_object_size = config.min_size as u64;
        let candidate = if config.max_size > config.min_size {
            rand::thread_rng().gen_range(config.min_size..config.max_size) as u64
        } else {
            min_object_size
        };

        let start = clock.now_nanos();
        let granted = bucket.take(candidate, Some(min_object_size)).unwrap_or_default();

        if granted < min_object_size {
            continue;
        }

        let object = factory.create(granted as usize, granted as usize);
        allocated += 1;
        if let Some(evicted) = ring.push(object) {
            sampler.offer(producer, evicted);
        }

        // The elapsed time this operation actually took, computed the
        // corrected way: end minus start, not start minus end.
        let end = clock.now_nanos();
        let elapsed_nanos = end.saturating_sub(start) as f64;
        sleep_debt_nanos += target_duration_nanos - elapsed_nanos;

        if sleep_debt_nanos > MS_FLOOR_NANOS as f64 {
            tracing::debug!(allocated, sleep_debt_nanos, "smoothing debt sleep");
            thread::sleep(Duration::from_millis(1));
            sleep_debt_nanos = 0.0;
        }
    }

    allocated
}
