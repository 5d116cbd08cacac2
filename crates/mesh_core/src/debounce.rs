//! Debounced, keyed timers
//!
//! A [`DebounceScheduler`] coalesces bursts of requests into a single trailing
//! action. Every [`schedule`](DebounceScheduler::schedule) call cancels the
//! action pending under the same key and arms a fresh timer, so an action only
//! becomes due once its key has been quiet for the full delay.
//!
//! The scheduler never sleeps or spawns anything. Time comes from a [`Clock`];
//! the owner asks for due actions with [`take_due`](DebounceScheduler::take_due)
//! and decides when to wake up from [`next_deadline`](DebounceScheduler::next_deadline).
//! That keeps every callback on the owner's thread and makes the timing fully
//! deterministic under a [`ManualClock`].
//!
//! # Example
//!
//! ```rust
//! use mesh_core::debounce::{DebounceScheduler, ManualClock};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let mut saves = DebounceScheduler::new(Arc::new(clock.clone()));
//!
//! for value in 0..5 {
//!     saves.schedule("bananas", Duration::from_millis(300), value);
//!     clock.advance(Duration::from_millis(100));
//! }
//! assert!(saves.take_due().is_empty());
//!
//! clock.advance(Duration::from_millis(200));
//! assert_eq!(saves.take_due(), vec![("bananas", 4)]);
//! ```

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// =============================================================================
// CLOCKS
// =============================================================================

/// A monotonic time source, measured from the clock's own origin
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Wall-clock time since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock that only moves when told to
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta`
    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(delta.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, now: Duration) {
        self.nanos
            .fetch_max(now.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

// =============================================================================
// SCHEDULER
// =============================================================================

new_key_type! {
    /// Handle to a pending debounced action
    pub struct TimerId;
}

struct PendingTimer<K, A> {
    key: K,
    deadline: Duration,
    /// Arming order, to keep equal deadlines in schedule order
    seq: u64,
    action: A,
}

/// Per-key trailing debounce timers
///
/// `A` is whatever the owner wants back when a timer fires: a value to act on
/// or a boxed closure (see [`run_due`](DebounceScheduler::run_due)).
pub struct DebounceScheduler<K, A> {
    clock: Arc<dyn Clock>,
    timers: SlotMap<TimerId, PendingTimer<K, A>>,
    by_key: FxHashMap<K, TimerId>,
    next_seq: u64,
}

impl<K: Eq + Hash + Clone, A> DebounceScheduler<K, A> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: SlotMap::with_key(),
            by_key: FxHashMap::default(),
            next_seq: 0,
        }
    }

    /// Arm `action` to become due once `key` has been quiet for `delay`
    ///
    /// Any action still pending under `key` is dropped.
    pub fn schedule(&mut self, key: K, delay: Duration, action: A) -> TimerId {
        if let Some(previous) = self.by_key.remove(&key) {
            self.timers.remove(previous);
        }

        let deadline = self.clock.now() + delay;
        let seq = self.next_seq;
        self.next_seq += 1;

        let id = self.timers.insert(PendingTimer {
            key: key.clone(),
            deadline,
            seq,
            action,
        });
        self.by_key.insert(key, id);

        tracing::trace!(?deadline, pending = self.timers.len(), "debounce timer armed");
        id
    }

    /// Whether an action is waiting under `key`
    pub fn is_pending(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Whether the timer behind `id` is still armed
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers.contains_key(id)
    }

    /// Earliest deadline among pending actions
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.values().map(|timer| timer.deadline).min()
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Remove and return every action whose deadline has passed
    ///
    /// Actions come back ordered by deadline, ties in scheduling order.
    pub fn take_due(&mut self) -> Vec<(K, A)> {
        let now = self.clock.now();
        self.take_until(now)
    }

    /// Remove and return every pending action, due or not
    pub fn drain(&mut self) -> Vec<(K, A)> {
        self.take_until(Duration::MAX)
    }

    fn take_until(&mut self, now: Duration) -> Vec<(K, A)> {
        let mut due: Vec<TimerId> = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.deadline <= now)
            .map(|(id, _)| id)
            .collect();
        due.sort_by_key(|id| {
            self.timers
                .get(*id)
                .map(|timer| (timer.deadline, timer.seq))
        });

        due.into_iter()
            .filter_map(|id| self.timers.remove(id))
            .map(|timer| {
                self.by_key.remove(&timer.key);
                (timer.key, timer.action)
            })
            .collect()
    }
}

impl<K: Eq + Hash + Clone> DebounceScheduler<K, Box<dyn FnOnce()>> {
    /// Run every due closure, returning how many ran
    pub fn run_due(&mut self) -> usize {
        let due = self.take_due();
        let count = due.len();
        for (_, action) in due {
            action();
        }
        count
    }
}
