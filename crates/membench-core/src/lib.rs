//! Allocated-object model, clock, and token-bucket rate limiters shared by
//! membench's stores and workers.

mod bucket_bursty;
mod bucket_strict;
mod clock;
mod object;
mod ramp;

pub use bucket_bursty::{BurstyBucketError, BurstyTokenBucket};
pub use bucket_strict::StrictTokenBucket;
pub use clock::{Clock, ManualClock, RealClock};
pub use object::{AllocatedObject, Environment, ObjectFactory, ObjectVariant, OverheadMode};
pub use ramp::{linear, sinusoidal};
