//! Strict allocation worker: wave-paced, sinusoidal ramp-up, feeding the
//! survivor ring and promotion sub-protocol.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use membench_core::{sinusoidal, Clock, ObjectFactory, StrictTokenBucket};
use membench_store::StoreProducer;

use crate::promotion::PromotionSampler;
use crate::ring::SurvivorRing;

const DEFAULT_SLICE_NANOS: u64 = 10_000_000;
const THROTTLE_SLEEP: Duration = Duration::from_millis(1);

/// Convert a bytes/sec rate into the bucket's native tokens-per-slice unit.
fn slice_limit_from_rate(rate_bytes_per_sec: u64) -> u64 {
    ((u128::from(rate_bytes_per_sec) * u128::from(DEFAULT_SLICE_NANOS)) / 1_000_000_000) as u64
}

/// Parameters for one strict-variant worker.
pub struct StrictWorkerConfig {
    pub rate_bytes_per_sec: u64,
    pub duration_secs: f64,
    pub min_size: usize,
    pub max_size: usize,
    pub ring_len: usize,
    /// Seconds to ramp from zero to `rate_bytes_per_sec`. `0.0` disables
    /// ramp-up and runs at full rate from the start.
    pub ramp_up_secs: f64,
}

/// Run one strict-variant worker to completion.
///
/// `clock` should be freshly originated for this worker (its `now_nanos()`
/// is treated as elapsed time since the worker started). Returns the
/// bucket's residual token count, used by tests as an upper bound on
/// under-delivery.
pub fn run_strict_worker(
    clock: Arc<dyn Clock>,
    producer: &StoreProducer,
    factory: &ObjectFactory,
    config: &StrictWorkerConfig,
) -> i64 {
    let deadline_nanos = (config.duration_secs * 1_000_000_000.0) as u64;
    let mut bucket = StrictTokenBucket::new(
        clock.clone(),
        slice_limit_from_rate(config.rate_bytes_per_sec),
        DEFAULT_SLICE_NANOS,
    );
    let mut ring = SurvivorRing::new(config.ring_len);
    let mut sampler = PromotionSampler::new();
    let mut ramp_active = config.ramp_up_secs > 0.0;

    let wave_target = (config.rate_bytes_per_sec / 10).max(1);

    while clock.now_nanos() < deadline_nanos {
        let mut wave = 0u64;
        tracing::debug!(wave_target, "starting allocation wave");
        while wave < wave_target && clock.now_nanos() < deadline_nanos {
            let elapsed_secs = clock.now_nanos() as f64 / 1_000_000_000.0;

            if ramp_active {
                if elapsed_secs >= config.ramp_up_secs {
                    ramp_active = false;
                    bucket.set_limit(slice_limit_from_rate(config.rate_bytes_per_sec));
                } else {
                    let target = sinusoidal(
                        elapsed_secs,
                        config.ramp_up_secs,
                        config.rate_bytes_per_sec as f64,
                    );
                    bucket.set_limit(slice_limit_from_rate(target as u64));
                }
            }

            if bucket.is_throttled() {
                thread::sleep(THROTTLE_SLEEP);
                break;
            }

            let object = factory.create(config.min_size, config.max_size);
            let footprint = object.real_size() as u64;
            bucket.deduct(footprint);
            wave += footprint;

            if let Some(evicted) = ring.push(object) {
                sampler.offer(producer, evicted);
            }
        }
    }

    bucket.tokens()
}
