//! Monotonic modification-time stamps.
//!
//! Parameter holders keep a `ModifiedTime` that is refreshed on every change,
//! so a host can cheaply decide whether a cached result is stale.

use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(1);

/// A process-wide monotonic timestamp.
///
/// The default value is older than any stamp produced by [`ModifiedTime::now`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifiedTime(u64);

impl ModifiedTime {
    /// Take the next timestamp.
    pub fn now() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The later of two timestamps.
    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 {
            other
        } else {
            self
        }
    }
}
