//! Per-client login throttling with time-windowed lockout.
//!
//! Flow Overview:
//! 1) `check_admission` runs before any credential verification.
//! 2) Every failed channel (unknown email, wrong password, failed bot check)
//!    calls `record_failure` on the same counter so no channel bypasses the
//!    lockout. This also means an attacker who keeps failing the bot check on
//!    purpose can lock out the legitimate client behind the same key.
//! 3) `record_success` drops the entry unconditionally.
//!
//! State is process-local and lost on restart; multi-instance deployments
//! have independent lockout windows. Entries are purged lazily on access and
//! by a periodic sweep so the map stays bounded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::debug;

const DEFAULT_MAX_FAILURES: u32 = 5;
const DEFAULT_LOCKOUT_WINDOW: Duration = Duration::from_secs(15 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    pub max_failures: u32,
    pub lockout_window: Duration,
    pub sweep_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_failures: DEFAULT_MAX_FAILURES,
            lockout_window: DEFAULT_LOCKOUT_WINDOW,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Decision returned before credential verification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Locked { retry_after: Duration },
}

#[derive(Clone, Copy, Debug)]
struct Entry {
    count: u32,
    last_attempt_at: Instant,
}

/// Failed-attempt counters keyed by client identity (normally the caller's
/// network address). Injectable; handlers receive it through `AuthState`.
#[derive(Debug)]
pub struct LoginThrottle {
    config: ThrottleConfig,
    entries: Mutex<HashMap<String, Entry>>,
}

impl LoginThrottle {
    #[must_use]
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Gate a login attempt. A locked decision must not touch the counter.
    #[must_use]
    pub fn check_admission(&self, client_key: &str) -> Admission {
        self.check_admission_at(client_key, Instant::now())
    }

    pub(crate) fn check_admission_at(&self, client_key: &str, now: Instant) -> Admission {
        let mut entries = self.lock();
        let Some(entry) = entries.get(client_key).copied() else {
            return Admission::Allowed;
        };
        // Lazy purge: a stale entry behaves as if it never existed.
        if now.duration_since(entry.last_attempt_at) >= self.config.lockout_window {
            entries.remove(client_key);
            return Admission::Allowed;
        }
        if entry.count >= self.config.max_failures {
            let lock_end = entry.last_attempt_at + self.config.lockout_window;
            return Admission::Locked {
                retry_after: lock_end.saturating_duration_since(now),
            };
        }
        Admission::Allowed
    }

    pub fn record_failure(&self, client_key: &str) {
        self.record_failure_at(client_key, Instant::now());
    }

    pub(crate) fn record_failure_at(&self, client_key: &str, now: Instant) {
        let mut entries = self.lock();
        entries
            .entry(client_key.to_string())
            .and_modify(|entry| {
                entry.count += 1;
                entry.last_attempt_at = now;
            })
            .or_insert(Entry {
                count: 1,
                last_attempt_at: now,
            });
    }

    pub fn record_success(&self, client_key: &str) {
        self.lock().remove(client_key);
    }

    /// Drop all entries older than the lockout window; returns how many were
    /// purged.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| {
            now.duration_since(entry.last_attempt_at) < self.config.lockout_window
        });
        before - entries.len()
    }

    #[must_use]
    pub const fn config(&self) -> &ThrottleConfig {
        &self.config
    }
}

/// Remaining lockout expressed in whole minutes, rounded up.
#[must_use]
pub fn retry_after_minutes(retry_after: Duration) -> u64 {
    retry_after.as_secs().div_ceil(60).max(1)
}

/// Periodic background sweep, decoupled from request handling.
pub fn spawn_sweeper(throttle: Arc<LoginThrottle>) -> tokio::task::JoinHandle<()> {
    let interval = throttle.config().sweep_interval;
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            let purged = throttle.sweep();
            if purged > 0 {
                debug!(purged, "purged stale login throttle entries");
            }
        }
    })
}
