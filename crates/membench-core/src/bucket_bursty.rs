//! Bursty token bucket: capacity + refill-rate model with partial takes.

use std::sync::Arc;
use thiserror::Error;

use crate::clock::Clock;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BurstyBucketError {
    #[error("requested {requested} is less than minimum {minimum}")]
    RequestedBelowMinimum { requested: u64, minimum: u64 },
}

/// Capacity + refill-rate token bucket allowing bursts up to `capacity` and a
/// smooth refill afterward. Never over-grants.
pub struct BurstyTokenBucket {
    clock: Arc<dyn Clock>,
    capacity: f64,
    refill_per_nanos: f64,
    available: f64,
    last_refill_nanos: u64,
}

impl BurstyTokenBucket {
    /// `refill_rate` tokens are added per `time_unit_nanos` nanoseconds.
    pub fn new(clock: Arc<dyn Clock>, capacity: u64, refill_rate: u64, time_unit_nanos: u64) -> Self {
        let now = clock.now_nanos();
        Self {
            clock,
            capacity: capacity as f64,
            refill_per_nanos: refill_rate as f64 / time_unit_nanos as f64,
            available: capacity as f64,
            last_refill_nanos: now,
        }
    }

    fn refill(&mut self) {
        let now = self.clock.now_nanos();
        let elapsed = now.saturating_sub(self.last_refill_nanos);
        self.available = (self.available + elapsed as f64 * self.refill_per_nanos).min(self.capacity);
        self.last_refill_nanos = now;
    }

    pub fn available(&self) -> u64 {
        self.available as u64
    }

    /// Take up to `requested` tokens. If fewer than `requested` but at least
    /// `minimum` are available, grants exactly what's available. If even
    /// `minimum` can't be met, grants whatever is available (possibly 0).
    /// With no `minimum`, always grants whatever is available, up to
    /// `requested`.
    pub fn take(&mut self, requested: u64, minimum: Option<u64>) -> Result<u64, BurstyBucketError> {
        if let Some(minimum) = minimum {
            if requested < minimum {
                return Err(BurstyBucketError::RequestedBelowMinimum { requested, minimum });
            }
        }

        self.refill();

        let requested = requested as f64;
        if requested <= self.available {
            self.available -= requested;
            return Ok(requested as u64);
        }

        match minimum {
            Some(minimum) if self.available >= minimum as f64 => {
                let granted = self.available;
                self.available = 0.0;
                Ok(granted as u64)
            }
            Some(_) => Ok(0),
            None => {
                let granted = self.available;
                self.available = 0.0;
                Ok(granted as u64)
            }
        }
    }
}
