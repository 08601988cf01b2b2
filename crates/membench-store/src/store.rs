//! The layered long-lived object store: admission queue, consumer loop,
//! and the append/replace/reshuffle protocols that mutate its groups.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use membench_core::{AllocatedObject, Clock, RealClock, StrictTokenBucket};
use rand::Rng;
use ringmpsc_rs::{Channel, ChannelError, Config as RingConfig, Producer};
use tracing::{debug, trace};

use crate::config::{StoreConfig, INTERVAL_IN_MS};
use crate::group::Group;
#[cfg(debug_assertions)]
use crate::invariants::{debug_assert_forward_reference, debug_assert_size_within_overshoot};

/// Shared state for one store instance. Construct via [`StoreHandle::new`],
/// register one [`StoreProducer`] per worker, and run [`StoreHandle::run_consumer`]
/// on a dedicated thread until [`StoreHandle::stop_and_return_size`] is called.
pub struct StoreHandle {
    queue: Channel<Arc<AllocatedObject>>,
    current_size: AtomicU64,
    running: AtomicBool,
    config: StoreConfig,
    groups: Mutex<Vec<Group>>,
    prune_bucket: Mutex<StrictTokenBucket>,
}

impl StoreHandle {
    pub fn new(config: StoreConfig) -> Arc<Self> {
        Self::with_clock(config, Arc::new(RealClock::new()))
    }

    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        let ring_bits = ring_bits_for(config.max_items_per_group);
        let ring_config = RingConfig::new(ring_bits, config.max_producers.max(1), false);

        let prune_limit = if config.prune_ratio_per_minute == 0 {
            0
        } else {
            config.size_limit / config.prune_ratio_per_minute
        };
        let prune_bucket =
            StrictTokenBucket::new(Arc::clone(&clock), prune_limit, 60_000_000_000);

        Arc::new(Self {
            queue: Channel::new(ring_config),
            current_size: AtomicU64::new(0),
            running: AtomicBool::new(true),
            config,
            groups: Mutex::new(vec![Group::default()]),
            prune_bucket: Mutex::new(prune_bucket),
        })
    }

    /// Register a new worker as an admission-queue producer.
    pub fn register_producer(self: &Arc<Self>) -> Result<StoreProducer, ChannelError> {
        Ok(StoreProducer {
            producer: self.queue.register()?,
            handle: Arc::clone(self),
        })
    }

    pub fn current_size(&self) -> u64 {
        self.current_size.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the consumer (it exits on its next iteration) and report the
    /// tracked size at the moment of the call. Idempotent.
    pub fn stop_and_return_size(&self) -> u64 {
        self.running.store(false, Ordering::Release);
        self.current_size()
    }

    pub fn group_count(&self) -> usize {
        self.groups.lock().unwrap().len()
    }

    /// Test/diagnostic accessor. Racey with the consumer thread by design:
    /// callers reading a running store must tolerate a point-in-time view.
    pub fn with_groups<R>(&self, f: impl FnOnce(&[Group]) -> R) -> R {
        f(&self.groups.lock().unwrap())
    }

    /// Sum of member footprints across all groups. Matches `current_size`
    /// only once the admission queue has fully drained.
    pub fn sum_stored_footprint(&self) -> u64 {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .flat_map(Group::members)
            .map(|o| o.real_size() as u64)
            .sum()
    }

    /// Drive the store's single consumer loop until stopped. Intended to run
    /// on its own thread; workers never touch `groups` directly.
    pub fn run_consumer(self: &Arc<Self>) {
        while self.is_running() {
            let hw = self.config.high_water_mark();
            let current = self.current_size();

            if current < hw {
                if let Some(object) = self.poll_queue() {
                    self.append_to_store(object);
                } else {
                    trace!("admission queue empty below high-water mark");
                }
            } else if !self.prune_bucket.lock().unwrap().is_throttled() {
                if let Some(object) = self.poll_queue() {
                    let footprint = self.replace_in_store(object);
                    self.prune_bucket.lock().unwrap().deduct(footprint);
                    if rand::thread_rng().gen_bool(0.5) {
                        self.reshuffle();
                    }
                }
            } else {
                thread::sleep(Duration::from_millis(INTERVAL_IN_MS));
            }
        }
        debug!(size = self.current_size(), "store consumer stopped");
    }

    /// Single non-blocking poll of the admission queue (the ~1µs bound from
    /// the design: a single check, no retry loop).
    fn poll_queue(&self) -> Option<Arc<AllocatedObject>> {
        let mut result = None;
        self.queue.consume_all_up_to_owned(1, |item| result = Some(item));
        result
    }

    fn append_to_store(&self, object: Arc<AllocatedObject>) {
        let mut groups = self.groups.lock().unwrap();
        if groups.last().unwrap().is_full(self.config.max_items_per_group) {
            groups.push(Group::default());
        }
        let tail_index = groups.len() - 1;
        groups[tail_index].push(object.clone());
        try_ref_me(&mut groups, tail_index, &object);
    }

    /// Returns the victim's footprint, for the caller to deduct from the
    /// prune bucket.
    fn replace_in_store(&self, object: Arc<AllocatedObject>) -> u64 {
        let mut groups = self.groups.lock().unwrap();
        let group_count = groups.len();
        let target = rand::thread_rng().gen_range(0..group_count);

        let victim = groups[target].remove_random();
        let victim_footprint = if let Some(victim) = &victim {
            if target > 0 {
                groups[target - 1].clear_refs_to(victim);
            }
            victim.real_size() as u64
        } else {
            0
        };
        self.current_size.fetch_sub(victim_footprint, Ordering::AcqRel);

        groups[target].push(object.clone());
        try_ref_me(&mut groups, target, &object);
        try_ref(&mut groups, target, &object);

        victim_footprint
    }

    fn reshuffle(&self) {
        if self.config.reshuffle_ratio == 0 {
            return;
        }
        let mut groups = self.groups.lock().unwrap();
        let group_count = groups.len();
        if group_count <= 1 {
            return;
        }
        // Only non-terminal groups (every group but the last) have a next
        // layer to reference.
        let candidates = group_count - 1;
        let sample_size = candidates / self.config.reshuffle_ratio as usize;
        if sample_size == 0 {
            return;
        }

        let mut chosen: Vec<usize> = (0..candidates).collect();
        let (chosen, _) = chosen.partial_shuffle(&mut rand::thread_rng(), sample_size);

        for &group_index in chosen.iter() {
            let members: Vec<Arc<AllocatedObject>> = groups[group_index].members().to_vec();
            for member in &members {
                try_ref(&mut groups, group_index, member);
                member.touch();
            }
        }
    }
}

use rand::seq::SliceRandom;

/// With 50% probability, point a random member of `groups[group_index - 1]`
/// at `object`. No-op for the root group.
fn try_ref_me(groups: &mut [Group], group_index: usize, object: &Arc<AllocatedObject>) {
    if group_index == 0 {
        return;
    }
    if !rand::thread_rng().gen_bool(0.5) {
        return;
    }
    if let Some(member) = groups[group_index - 1].random_member() {
        #[cfg(debug_assertions)]
        debug_assert_forward_reference!(group_index - 1, group_index);
        member.set_next(Some(Arc::clone(object)));
    }
}

/// With 50% probability, point `object` at a random member of
/// `groups[group_index + 1]`; otherwise clear its reference. No-op (clears)
/// when `group_index` is the last group.
fn try_ref(groups: &mut [Group], group_index: usize, object: &Arc<AllocatedObject>) {
    if group_index + 1 >= groups.len() {
        object.set_next(None);
        return;
    }
    if rand::thread_rng().gen_bool(0.5) {
        if let Some(member) = groups[group_index + 1].random_member() {
            #[cfg(debug_assertions)]
            debug_assert_forward_reference!(group_index, group_index + 1);
            object.set_next(Some(Arc::clone(member)));
            return;
        }
    }
    object.set_next(None);
}

fn ring_bits_for(max_items_per_group: usize) -> u8 {
    let capacity = max_items_per_group.max(1).next_power_of_two();
    (capacity.trailing_zeros() as u8).clamp(1, 20)
}

/// A worker's handle for offering objects into the admission queue.
pub struct StoreProducer {
    producer: Producer<Arc<AllocatedObject>>,
    handle: Arc<StoreHandle>,
}

impl StoreProducer {
    /// Non-blocking from the caller's perspective beyond a short bounded
    /// wait. Returns `false` immediately if the store is at capacity, the
    /// queue is full past that bound, or the producer's ring is closed.
    pub fn try_add(&self, object: Arc<AllocatedObject>) -> bool {
        if self.handle.current_size() >= self.handle.config.size_limit {
            return false;
        }
        let Some(mut reservation) = self.producer.reserve_with_backoff(1) else {
            return false;
        };
        let footprint = object.real_size() as u64;
        // Count the footprint before the item becomes visible to the
        // consumer: otherwise the consumer can dequeue and append it while
        // reading a stale (pre-increment) current_size, appending past the
        // high-water mark instead of routing it through replace.
        self.handle.current_size.fetch_add(footprint, Ordering::AcqRel);
        #[cfg(debug_assertions)]
        debug_assert_size_within_overshoot!(self.handle.current_size(), self.handle.config.size_limit, footprint);
        reservation.as_mut_slice()[0] = std::mem::MaybeUninit::new(object);
        reservation.commit();
        true
    }
}
