//! The synthetic allocated object and its factory.
//!
//! An [`AllocatedObject`] is an opaque fixed-size payload with one forward
//! reference slot. Its reported heap footprint, not its payload length, is
//! what the benchmark's rate limiters and store size accounting track.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use rand::Rng;

/// Per-object header cost charged on top of the rounded payload length.
///
/// Selected once at process startup (`-c` flag) and never changed afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverheadMode {
    /// Host runtime uses compressed (32-bit) references in the managed heap.
    Compressed,
    /// Host runtime uses full-width references.
    NonCompressed,
}

impl OverheadMode {
    pub const fn bytes(self) -> usize {
        match self {
            OverheadMode::Compressed => 40,
            OverheadMode::NonCompressed => 56,
        }
    }
}

/// Process-wide counters shared by every worker and factory in a run.
///
/// Bundled into a handle rather than free-standing statics so a coordinator
/// can spin up independent runs (e.g. in tests) without cross-talk.
#[derive(Debug)]
pub struct Environment {
    overhead: OverheadMode,
    bytes_allocated: AtomicU64,
}

impl Environment {
    pub fn new(overhead: OverheadMode) -> Arc<Self> {
        Arc::new(Self {
            overhead,
            bytes_allocated: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn overhead(&self) -> OverheadMode {
        self.overhead
    }

    #[inline]
    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    #[inline]
    fn add_bytes_allocated(&self, n: u64) {
        self.bytes_allocated.fetch_add(n, Ordering::Relaxed);
    }
}

/// Which capability set an [`AllocatedObject`] was constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectVariant {
    /// Owning forward reference.
    Plain,
    /// Forward reference held weakly; `next()` observes reclamation.
    Weak,
    /// Owning forward reference plus a drop hook for diagnostics.
    Finalizable,
}

enum NextSlot {
    Empty,
    Strong(Arc<AllocatedObject>),
    Weak(Weak<AllocatedObject>),
}

/// A synthetic allocated object: fixed-size payload, one forward reference.
pub struct AllocatedObject {
    payload: Mutex<Vec<u8>>,
    footprint: usize,
    variant: ObjectVariant,
    next: Mutex<NextSlot>,
    finalize_counter: Option<Arc<AtomicU64>>,
}

impl AllocatedObject {
    /// The heap footprint: per-object overhead plus payload rounded to 8 bytes.
    #[inline]
    pub fn real_size(&self) -> usize {
        self.footprint
    }

    /// Set (or clear) the forward reference.
    ///
    /// Weak-variant objects downgrade `other` immediately; the strong handle
    /// passed in is dropped at the end of this call in that case.
    pub fn set_next(&self, other: Option<Arc<AllocatedObject>>) {
        let slot = match (self.variant, other) {
            (_, None) => NextSlot::Empty,
            (ObjectVariant::Weak, Some(o)) => NextSlot::Weak(Arc::downgrade(&o)),
            (_, Some(o)) => NextSlot::Strong(o),
        };
        *self.next.lock().unwrap() = slot;
    }

    /// Follow the forward reference, returning `None` if empty or (for the
    /// weak variant) if the referent has already been reclaimed.
    pub fn next(&self) -> Option<Arc<AllocatedObject>> {
        match &*self.next.lock().unwrap() {
            NextSlot::Empty => None,
            NextSlot::Strong(o) => Some(Arc::clone(o)),
            NextSlot::Weak(w) => w.upgrade(),
        }
    }

    /// Mutate one payload byte at a pseudo-random index, to exercise the host
    /// runtime's write barrier. Must actually write; a no-op here would
    /// silently defeat the benchmark's purpose.
    pub fn touch(&self) {
        let mut payload = self.payload.lock().unwrap();
        if payload.is_empty() {
            return;
        }
        let idx = rand::thread_rng().gen_range(0..payload.len());
        payload[idx] = payload[idx].wrapping_add(1);
    }

    /// Sum of payload bytes, for test assertions.
    pub fn sum(&self) -> i64 {
        self.payload.lock().unwrap().iter().map(|&b| i64::from(b)).sum()
    }

    pub fn variant(&self) -> ObjectVariant {
        self.variant
    }
}

impl Drop for AllocatedObject {
    fn drop(&mut self) {
        if let Some(counter) = &self.finalize_counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[inline]
fn round_up_8(n: usize) -> usize {
    (n + 7) & !7
}

/// Creates [`AllocatedObject`]s with sizes drawn uniformly from `[min, max)`.
pub struct ObjectFactory {
    env: Arc<Environment>,
    variant: ObjectVariant,
    finalize_counter: Arc<AtomicU64>,
}

impl ObjectFactory {
    pub fn new(env: Arc<Environment>, variant: ObjectVariant) -> Self {
        Self {
            env,
            variant,
            finalize_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Number of finalizable objects reclaimed so far. Always 0 unless the
    /// factory's variant is [`ObjectVariant::Finalizable`].
    pub fn finalized_count(&self) -> u64 {
        self.finalize_counter.load(Ordering::Relaxed)
    }

    /// Draw a size in `[min_size, max_size)` (or exactly `min_size` when
    /// `max_size <= min_size`) and allocate an object of that payload length.
    ///
    /// # Panics
    ///
    /// Panics if `min_size` is smaller than the process-wide overhead
    /// constant — a configuration that can never produce a valid object.
    pub fn create(&self, min_size: usize, max_size: usize) -> Arc<AllocatedObject> {
        assert!(
            min_size >= self.env.overhead().bytes(),
            "min_size {min_size} is smaller than overhead {}",
            self.env.overhead().bytes()
        );

        let payload_len = if max_size > min_size {
            min_size + rand::thread_rng().gen_range(0..(max_size - min_size))
        } else {
            min_size
        };

        let footprint = self.env.overhead().bytes() + round_up_8(payload_len);
        self.env.add_bytes_allocated(footprint as u64);

        let finalize_counter = match self.variant {
            ObjectVariant::Finalizable => Some(Arc::clone(&self.finalize_counter)),
            _ => None,
        };

        Arc::new(AllocatedObject {
            payload: Mutex::new(vec![0u8; payload_len]),
            footprint,
            variant: self.variant,
            next: Mutex::new(NextSlot::Empty),
            finalize_counter,
        })
    }
}
