//! Strict token bucket: a fixed `limit` tokens per fixed-width time slice,
//! with a bounded overdraft. Not shared between threads — each worker owns
//! one.

use std::sync::Arc;

use crate::clock::Clock;

const DEFAULT_OVERDRAFT_RATIO: u64 = 10;

/// Fixed-limit-per-slice token bucket with a small permitted overdraft.
pub struct StrictTokenBucket {
    clock: Arc<dyn Clock>,
    limit: i64,
    slice_nanos: u64,
    overdraft_ratio: u64,
    tokens: i64,
    slice_start_nanos: u64,
}

impl StrictTokenBucket {
    pub fn new(clock: Arc<dyn Clock>, limit: u64, slice_nanos: u64) -> Self {
        Self::with_overdraft_ratio(clock, limit, slice_nanos, DEFAULT_OVERDRAFT_RATIO)
    }

    pub fn with_overdraft_ratio(
        clock: Arc<dyn Clock>,
        limit: u64,
        slice_nanos: u64,
        overdraft_ratio: u64,
    ) -> Self {
        let now = clock.now_nanos();
        Self {
            clock,
            limit: limit as i64,
            slice_nanos,
            overdraft_ratio,
            tokens: limit as i64,
            slice_start_nanos: now,
        }
    }

    #[inline]
    fn overdraft(&self) -> i64 {
        (self.limit / self.overdraft_ratio as i64).max(0)
    }

    /// Re-point this bucket's limit at a new value without resetting the
    /// current slice's token count (used by the strict worker's ramp-up).
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit as i64;
    }

    pub fn limit(&self) -> u64 {
        self.limit as u64
    }

    /// Snap the slice forward if it has expired. Each fully-elapsed slice
    /// since the last check is worth exactly one slice's `limit` tokens;
    /// any debt or unused surplus from before the rollover is discarded
    /// rather than carried forward.
    fn maybe_roll_slice(&mut self) {
        let now = self.clock.now_nanos();
        let elapsed = now.saturating_sub(self.slice_start_nanos);
        if elapsed < self.slice_nanos {
            return;
        }
        let slices_passed = elapsed / self.slice_nanos;
        self.tokens = (slices_passed as i64) * self.limit;
        self.slice_start_nanos += slices_passed * self.slice_nanos;
    }

    /// Report whether the bucket is at or below zero in the current slice.
    /// The overdraft only bounds how far `deduct` can push tokens negative;
    /// it does not move this threshold.
    pub fn is_throttled(&mut self) -> bool {
        self.maybe_roll_slice();
        self.tokens <= 0
    }

    /// Deduct `n` tokens. Returns the shortfall (0 if the deduction fit
    /// within the remaining tokens plus overdraft).
    pub fn deduct(&mut self, n: u64) -> u64 {
        self.maybe_roll_slice();
        let n = n as i64;
        let floor = -self.overdraft();
        if self.tokens - n >= floor {
            self.tokens -= n;
            0
        } else {
            let shortfall = floor - (self.tokens - n);
            self.tokens = floor;
            shortfall as u64
        }
    }

    /// Residual token count, used by tests as an upper bound on
    /// under-delivery at the end of a run.
    pub fn tokens(&self) -> i64 {
        self.tokens
    }
}
