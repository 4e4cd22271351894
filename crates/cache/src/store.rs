//! Phase-aware result cache.
//!
//! `moka::sync::Cache` with a per-entry TTL chosen by contest phase: live
//! contests expire quickly (projections move constantly), scheduled ones
//! hold a few minutes, completed ones are immutable history. Concurrent
//! callers of `get_or_compute` on one key are coalesced so the computation
//! runs once.

use moka::sync::Cache;
use moka::Expiry;
use slate_core::{ContestPhase, Result};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// TTL while the contest is underway.
const LIVE_TTL: Duration = Duration::from_secs(30);
/// TTL before lock.
const SCHEDULED_TTL: Duration = Duration::from_secs(300);
/// TTL once the contest is graded.
const COMPLETED_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Maximum cached results.
const MAX_ENTRIES: u64 = 10_000;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    phase: ContestPhase,
}

/// Picks each entry's TTL from the contest phase it was stored under.
struct PhaseExpiry {
    live: Duration,
    scheduled: Duration,
    completed: Duration,
}

impl<V> Expiry<String, Entry<V>> for PhaseExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(match entry.phase {
            ContestPhase::Live => self.live,
            ContestPhase::Scheduled => self.scheduled,
            ContestPhase::Completed => self.completed,
        })
    }
}

/// Memoizes optimizer/simulator outputs keyed by request fingerprint.
pub struct ResultCache<V: Clone + Send + Sync + 'static> {
    cache: Cache<String, Entry<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone + Send + Sync + 'static> ResultCache<V> {
    /// Creates a cache with the standard phase TTLs.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttls(LIVE_TTL, SCHEDULED_TTL, COMPLETED_TTL)
    }

    /// Creates a cache with explicit per-phase TTLs.
    #[must_use]
    pub fn with_ttls(live: Duration, scheduled: Duration, completed: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_ENTRIES)
            .expire_after(PhaseExpiry {
                live,
                scheduled,
                completed,
            })
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached value for a key, if present and unexpired.
    pub fn get(&self, key: &str) -> Option<V> {
        match self.cache.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores a value under the TTL implied by the contest phase.
    pub fn insert(&self, key: String, value: V, phase: ContestPhase) {
        debug!(key = %key, ?phase, "caching result");
        self.cache.insert(key, Entry { value, phase });
    }

    /// Returns the cached value or runs `compute` exactly once per key:
    /// concurrent callers sharing the key block on the first computation
    /// and receive its result. Errors are returned to every waiting caller
    /// and are not cached.
    ///
    /// # Errors
    ///
    /// Whatever `compute` fails with.
    pub fn get_or_compute<F>(&self, key: &str, phase: ContestPhase, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        let ran = Cell::new(false);
        let outcome = self.cache.try_get_with(key.to_string(), || {
            ran.set(true);
            compute().map(|value| Entry { value, phase })
        });
        match outcome {
            Ok(entry) => {
                if ran.get() {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                }
                Ok(entry.value)
            }
            Err(shared) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err((*shared).clone())
            }
        }
    }

    /// Drops one key.
    pub fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
    }

    /// Total lookups answered from cache.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total lookups that had to compute or came back empty.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Fraction of lookups served from cache, in [0, 1].
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

impl<V: Clone + Send + Sync + 'static> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
