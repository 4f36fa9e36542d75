//! Debug assertion macros for demand-accounting invariants.
//!
//! Only active in debug builds (`#[cfg(debug_assertions)]`), so there is
//! zero overhead in release builds.

// =============================================================================
// No over-delivery
// =============================================================================

/// Assert that delivered items never exceed granted credit.
///
/// **Invariant**: `processed ≤ requested`
///
/// Used in: `flush()` after each delivery
macro_rules! debug_assert_within_demand {
    ($processed:expr, $requested:expr) => {
        debug_assert!(
            $requested >= $processed,
            "over-delivery: processed {} exceeds requested {}",
            $processed,
            $requested
        )
    };
}

// =============================================================================
// Acknowledged credit
// =============================================================================

/// Assert that acknowledged credit never runs ahead of granted credit.
///
/// **Invariant**: `sent ≤ requested`
///
/// Used in: `flush()` before reporting new upstream credit
macro_rules! debug_assert_sent_bounded {
    ($sent:expr, $requested:expr) => {
        debug_assert!(
            $sent <= $requested,
            "acknowledged credit {} exceeds requested {}",
            $sent,
            $requested
        )
    };
}

// =============================================================================
// Completion after drain
// =============================================================================

/// Assert that the completion is only delivered behind every buffered value.
///
/// **Invariant**: `deliver(completion) → queue.is_empty()`
///
/// Used in: `flush()` before delivering the completion
macro_rules! debug_assert_drained_before_completion {
    ($queue_len:expr) => {
        debug_assert!(
            $queue_len == 0,
            "completion delivered with {} values still queued",
            $queue_len
        )
    };
}

// =============================================================================
// Unlimited bypass
// =============================================================================

/// Assert that nothing is queued while demand is unlimited.
///
/// **Invariant**: `requested == unlimited → queue.is_empty()`
///
/// Used in: `buffer_value()` on the unlimited fast path
macro_rules! debug_assert_bypass_empty {
    ($queue_len:expr) => {
        debug_assert!(
            $queue_len == 0,
            "unlimited demand in force but {} values are queued",
            $queue_len
        )
    };
}

pub(crate) use debug_assert_bypass_empty;
pub(crate) use debug_assert_drained_before_completion;
pub(crate) use debug_assert_sent_bounded;
pub(crate) use debug_assert_within_demand;
