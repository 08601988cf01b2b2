//! The long-lived object store: a layered forest of groups fed by a
//! multi-producer admission queue and mutated by a single consumer thread.

mod config;
mod group;
mod invariants;
mod store;

pub use config::{StoreConfig, INTERVAL_IN_MS, IN_QUEUE_RATIO};
pub use group::Group;
pub use store::{StoreHandle, StoreProducer};
