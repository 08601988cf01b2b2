//! Property-based test quantifying INV-PROMO-01 over randomized admission
//! outcomes, in the style of `crates/ringmpsc/tests/property_tests.rs`.

use membench_core::{Environment, ObjectFactory, ObjectVariant, OverheadMode};
use membench_store::{StoreConfig, StoreHandle};
use membench_workers::{PromotionSampler, MAX_LONG_LIVED_RATIO, MIN_LONG_LIVED_RATIO};
use proptest::prelude::*;

fn config(size_limit: u64) -> StoreConfig {
    StoreConfig {
        size_limit,
        max_items_per_group: 8,
        prune_ratio_per_minute: 0,
        reshuffle_ratio: 0,
        max_producers: 4,
    }
}

proptest! {
    /// INV-PROMO-01: `r` always stays within [MAX_LONG_LIVED_RATIO,
    /// MIN_LONG_LIVED_RATIO] regardless of how admissions succeed or fail.
    #[test]
    fn prop_r_stays_within_bounds(admits in prop::collection::vec(any::<bool>(), 1..500)) {
        let mut sampler = PromotionSampler::new();
        // An always-empty store (size_limit 0) rejects every admission; an
        // effectively unbounded one admits every admission. Alternate
        // between them per the generated bit to exercise both directions.
        let full_handle = StoreHandle::new(config(0));
        let full_producer = full_handle.register_producer().unwrap();
        let open_handle = StoreHandle::new(config(u64::MAX / 2));
        let open_producer = open_handle.register_producer().unwrap();

        let env = Environment::new(OverheadMode::Compressed);
        let factory = ObjectFactory::new(env, ObjectVariant::Plain);

        for admit in admits {
            let producer = if admit { &open_producer } else { &full_producer };
            sampler.offer(producer, factory.create(64, 65));
            prop_assert!(
                (MAX_LONG_LIVED_RATIO..=MIN_LONG_LIVED_RATIO).contains(&sampler.r()),
                "INV-PROMO-01 violated: r {} outside [{}, {}]",
                sampler.r(), MAX_LONG_LIVED_RATIO, MIN_LONG_LIVED_RATIO
            );
        }
    }
}
