/// Parameters governing a single store instance.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Total bytes the store may hold before prune cycles start replacing
    /// instead of appending.
    pub size_limit: u64,
    /// Maximum members per group before a new tail group is appended.
    pub max_items_per_group: usize,
    /// Prune bucket limit expressed as a fraction of `size_limit` drained
    /// per minute. Zero disables pruning entirely.
    pub prune_ratio_per_minute: u64,
    /// `groupCount / reshuffle_ratio` non-terminal groups are reshuffled per
    /// consumer cycle that reaches the replace branch. Zero disables it.
    pub reshuffle_ratio: u64,
    /// Number of producer rings to provision (one per worker).
    pub max_producers: usize,
}

/// Fraction of `size_limit` below which the consumer appends rather than
/// replaces: `IN_QUEUE_RATIO = 100` means the high-water mark sits at 99%.
pub const IN_QUEUE_RATIO: u64 = 100;

/// Idle/prune-throttled sleep between consumer iterations.
pub const INTERVAL_IN_MS: u64 = 2;

impl StoreConfig {
    pub fn high_water_mark(&self) -> u64 {
        self.size_limit - self.size_limit / IN_QUEUE_RATIO
    }
}
