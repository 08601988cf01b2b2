//! Debug assertion macros for store invariants. Zero overhead in release
//! builds (`#[cfg(debug_assertions)]`), mirroring the pattern in
//! `crates/ringmpsc/src/invariants.rs`.

// =============================================================================
// INV-STORE-01: Layering
// =============================================================================

/// Assert that a forward reference points strictly into a deeper layer.
///
/// **Invariant**: a reference wired from group `from` may only target group
/// `to` when `to > from`.
macro_rules! debug_assert_forward_reference {
    ($from:expr, $to:expr) => {
        debug_assert!(
            $to > $from,
            "INV-STORE-01 violated: group {} referenced group {} (must be strictly deeper)",
            $from,
            $to
        )
    };
}

// =============================================================================
// INV-STORE-02: Size bound
// =============================================================================

/// Assert that the tracked size never exceeds the configured limit by more
/// than a single object's footprint (the admission check-then-act race is
/// tolerated by design, but only ever by one object's worth).
macro_rules! debug_assert_size_within_overshoot {
    ($current:expr, $limit:expr, $footprint:expr) => {
        debug_assert!(
            $current <= $limit + $footprint,
            "INV-STORE-02 violated: current_size {} exceeds limit {} by more than one object's footprint {}",
            $current,
            $limit,
            $footprint
        )
    };
}

pub(crate) use debug_assert_forward_reference;
pub(crate) use debug_assert_size_within_overshoot;
