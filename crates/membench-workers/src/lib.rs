//! Allocation workers: survivor ring, adaptive promotion sub-protocol, and
//! the strict and bursty pacing variants that drive objects into the store.

mod bursty;
mod promotion;
mod ring;
mod strict;

pub use bursty::{run_bursty_worker, BurstyWorkerConfig};
pub use promotion::{PromotionSampler, MAX_LONG_LIVED_RATIO, MIN_LONG_LIVED_RATIO};
pub use ring::SurvivorRing;
pub use strict::{run_strict_worker, StrictWorkerConfig};
