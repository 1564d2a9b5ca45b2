//! Request admission guard
//!
//! A sliding-window counter keyed by an opaque, caller-resolved string such
//! as `"login:203.0.113.7"`. Each key keeps the instants of its admitted
//! requests inside the trailing window; a request is admitted while fewer
//! than `max_requests` of them are still live.
//!
//! The guard does not know how callers identify clients. Composing the key
//! (action prefix plus client identity) is the caller's job.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::MonotonicInstant;

/// Default trailing window length
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Default number of admitted requests per window
pub const DEFAULT_MAX_REQUESTS: u32 = 30;

/// Sliding-window admission guard, shared by every request handler
#[derive(Debug)]
pub struct AdmissionGuard {
    /// Maximum admitted requests per window
    max_requests: u32,
    /// Trailing window length
    window: Duration,
    /// Per-key admitted instants
    windows: Mutex<HashMap<String, VecDeque<MonotonicInstant>>>,
}

impl AdmissionGuard {
    /// Create a new guard
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests admitted per window
    /// * `window` - Length of the trailing window
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check whether a request for `key` should go ahead right now.
    ///
    /// Returns `true` and records the attempt if admitted; returns `false`
    /// without recording anything if the key's budget is spent.
    pub fn admit(&self, key: &str) -> bool {
        self.admit_at(key, MonotonicInstant::now())
    }

    /// Same as [`admit`](Self::admit) with an explicit current instant.
    pub fn admit_at(&self, key: &str, now: MonotonicInstant) -> bool {
        let mut windows = self.lock();

        let timestamps = windows.entry(key.to_string()).or_default();
        prune(timestamps, now, self.window);

        if timestamps.len() >= self.max_requests as usize {
            debug!(key, limit = self.max_requests, "Request rejected by admission guard");
            return false;
        }

        timestamps.push_back(now);
        true
    }

    /// Requests still available to `key` in the current window.
    pub fn remaining(&self, key: &str) -> u32 {
        self.remaining_at(key, MonotonicInstant::now())
    }

    pub fn remaining_at(&self, key: &str, now: MonotonicInstant) -> u32 {
        let windows = self.lock();
        let live = windows
            .get(key)
            .map(|timestamps| {
                timestamps
                    .iter()
                    .filter(|ts| is_live(**ts, now, self.window))
                    .count()
            })
            .unwrap_or(0);

        self.max_requests.saturating_sub(live as u32)
    }

    /// Drop every key whose window holds no live requests.
    ///
    /// Returns the number of keys evicted.
    pub fn sweep(&self) -> usize {
        self.sweep_at(MonotonicInstant::now())
    }

    pub fn sweep_at(&self, now: MonotonicInstant) -> usize {
        let mut windows = self.lock();
        let before = windows.len();

        windows.retain(|_, timestamps| {
            prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });

        let evicted = before - windows.len();
        if evicted > 0 {
            debug!(evicted, remaining = windows.len(), "Admission guard swept stale keys");
        }
        evicted
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, VecDeque<MonotonicInstant>>> {
        // Windows are re-pruned on every access, so a poisoned map is still usable.
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AdmissionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

fn is_live(timestamp: MonotonicInstant, now: MonotonicInstant, window: Duration) -> bool {
    now.duration_since(timestamp) < window
}

/// Remove instants that have left the window. Callers may sample `now`
/// before taking the lock, so the deque is not assumed to be sorted.
fn prune(timestamps: &mut VecDeque<MonotonicInstant>, now: MonotonicInstant, window: Duration) {
    timestamps.retain(|ts| is_live(*ts, now, window));
}
