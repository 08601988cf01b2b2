//! Adaptive 1-in-`r` sampler deciding which ring-evicted objects get offered
//! to the long-lived store. Multiplicative increase on success (push
//! harder), multiplicative decrease on failure (retreat fast).

use std::sync::Arc;

use membench_core::AllocatedObject;
use membench_store::StoreProducer;

/// Smallest `r` the sampler will settle at: admit roughly every other
/// eviction once the store has consistently had room.
pub const MAX_LONG_LIVED_RATIO: u64 = 2;

/// Largest `r` the sampler will settle at: admit roughly one in a million
/// once the store has been consistently full.
pub const MIN_LONG_LIVED_RATIO: u64 = 1_048_576;

/// Per-worker promotion state. Not shared between workers.
pub struct PromotionSampler {
    r: u64,
    counter: u64,
}

impl Default for PromotionSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl PromotionSampler {
    pub fn new() -> Self {
        Self {
            r: MAX_LONG_LIVED_RATIO,
            counter: MAX_LONG_LIVED_RATIO,
        }
    }

    pub fn r(&self) -> u64 {
        self.r
    }

    /// Feed one ring-evicted object through the sampler. Decrements the
    /// counter; when it reaches zero, attempts admission and adjusts `r`.
    pub fn offer(&mut self, producer: &StoreProducer, object: Arc<AllocatedObject>) {
        self.counter = self.counter.saturating_sub(1);
        if self.counter > 0 {
            return;
        }

        if producer.try_add(object) {
            self.r = (self.r / 2).max(MAX_LONG_LIVED_RATIO);
        } else {
            self.r = (self.r * 2).min(MIN_LONG_LIVED_RATIO);
        }
        tracing::debug!(r = self.r, "promotion ratio adjusted");
        debug_assert!(
            (MAX_LONG_LIVED_RATIO..=MIN_LONG_LIVED_RATIO).contains(&self.r),
            "INV-PROMO-01 violated: r {} outside [{}, {}]",
            self.r,
            MAX_LONG_LIVED_RATIO,
            MIN_LONG_LIVED_RATIO
        );
        self.counter = self.r;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membench_core::{Environment, ObjectFactory, ObjectVariant, OverheadMode};
    use membench_store::{StoreConfig, StoreHandle};

    fn factory() -> ObjectFactory {
        ObjectFactory::new(Environment::new(OverheadMode::Compressed), ObjectVariant::Plain)
    }

    fn config(size_limit: u64) -> StoreConfig {
        StoreConfig {
            size_limit,
            max_items_per_group: 8,
            prune_ratio_per_minute: 0,
            reshuffle_ratio: 0,
            max_producers: 4,
        }
    }

    #[test]
    fn r_starts_at_minimum_and_offers_on_first_eviction() {
        let handle = StoreHandle::new(config(1024 * 1024));
        let producer = handle.register_producer().unwrap();
        let factory = factory();
        let mut sampler = PromotionSampler::new();

        assert_eq!(sampler.r(), MAX_LONG_LIVED_RATIO);
        sampler.offer(&producer, factory.create(64, 65));
        // counter started at 2, one offer brings it to 1: no admission attempt yet.
        assert_eq!(sampler.r(), MAX_LONG_LIVED_RATIO);
    }

    #[test]
    fn successful_admission_halves_r_down_to_floor() {
        let handle = StoreHandle::new(config(1024 * 1024));
        let producer = handle.register_producer().unwrap();
        let factory = factory();
        let mut sampler = PromotionSampler { r: 8, counter: 1 };

        sampler.offer(&producer, factory.create(64, 65));
        assert_eq!(sampler.r(), 4);
        assert_eq!(sampler.counter, 4);
    }

    #[test]
    fn failed_admission_doubles_r_up_to_ceiling() {
        // Zero-size store: every tryAdd fails immediately.
        let handle = StoreHandle::new(config(0));
        let producer = handle.register_producer().unwrap();
        let factory = factory();
        let mut sampler = PromotionSampler {
            r: MIN_LONG_LIVED_RATIO / 2,
            counter: 1,
        };

        sampler.offer(&producer, factory.create(64, 65));
        assert_eq!(sampler.r(), MIN_LONG_LIVED_RATIO);

        // Further failures never exceed the ceiling.
        sampler.counter = 1;
        sampler.offer(&producer, factory.create(64, 65));
        assert_eq!(sampler.r(), MIN_LONG_LIVED_RATIO);
    }
}
