//! Two-pool orchestration, fallback, and degraded-mode tracking
//!
//! The manager owns the general pool and the team-browser pool and leases
//! keys to the executor. General traffic may borrow from the team-browser
//! pool once the general pool is exhausted; team-browser traffic falls back
//! to the general pool only when it has no keys of its own. When every pool
//! is exhausted at once the manager flags degraded mode, which is advisory
//! only: selection keeps working wherever a pool can still cycle, and the
//! hourly reset inside the pools eventually restores them.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::key::{ApiKey, TrafficClass};
use crate::pool::{KeyPool, KeyPoolConfig, PoolStats, SelectedKey};

/// A leased key: the pool that served it, the slot, and the key itself.
///
/// The executor reports the request outcome back through the lease so the
/// right pool's counters move, including when fallback crossed pools.
#[derive(Debug, Clone)]
pub struct KeyLease {
    pub pool: TrafficClass,
    pub index: usize,
    pub key: ApiKey,
}

impl KeyLease {
    fn new(pool: TrafficClass, selected: SelectedKey) -> Self {
        Self {
            pool,
            index: selected.index,
            key: selected.key,
        }
    }
}

/// Degraded-mode report for a one-time user notification.
#[derive(Debug, Clone, Serialize)]
pub struct DegradedInfo {
    pub message: String,
    pub should_show_notification: bool,
}

/// Snapshot of both pools plus the degraded flag.
#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    pub general: PoolStats,
    pub team_browser: PoolStats,
    pub degraded: bool,
}

struct Inner {
    general: KeyPool,
    team_browser: KeyPool,
    degraded_since: Option<Instant>,
    notification_shown: bool,
}

/// Owns both credential pools and the global degraded state.
///
/// All state sits behind one synchronous mutex, so every selection decision
/// (pool checks, cursor moves, failed-set updates) completes in a single
/// non-suspending step; the lock is never held across an await.
pub struct KeyPoolManager {
    inner: Mutex<Inner>,
}

impl KeyPoolManager {
    /// Build the manager from externally supplied key lists. The
    /// team-browser list may be empty; its traffic then rides the general
    /// pool.
    pub fn new(general: Vec<ApiKey>, team_browser: Vec<ApiKey>, config: KeyPoolConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                general: KeyPool::new(
                    TrafficClass::General.label(),
                    general,
                    config.clone(),
                ),
                team_browser: KeyPool::new(
                    TrafficClass::TeamBrowser.label(),
                    team_browser,
                    config,
                ),
                degraded_since: None,
                notification_shown: false,
            }),
        }
    }

    /// Lease a key for one request of the given traffic class.
    ///
    /// Returns `None` when no pool can serve the class; the caller then
    /// dispatches without credentials.
    pub fn select(&self, class: TrafficClass, allow_fallback: bool) -> Option<KeyLease> {
        let mut inner = self.lock();
        match class {
            TrafficClass::General => inner.select_general(allow_fallback),
            TrafficClass::TeamBrowser => inner.select_team_browser(),
        }
    }

    /// Quarantine the leased key in its serving pool.
    pub fn mark_failed(&self, lease: &KeyLease) {
        let mut inner = self.lock();
        inner.pool_mut(lease.pool).mark_failed(lease.index);
    }

    /// Credit the serving pool with a success.
    pub fn mark_success(&self, lease: &KeyLease) {
        let mut inner = self.lock();
        inner.pool_mut(lease.pool).mark_success();
    }

    /// Size of the pool that primarily serves `class`. Team-browser traffic
    /// with no keys of its own is sized by the general pool, matching the
    /// fallback used at selection time.
    pub fn pool_len(&self, class: TrafficClass) -> usize {
        let inner = self.lock();
        match class {
            TrafficClass::General => inner.general.len(),
            TrafficClass::TeamBrowser => {
                if inner.team_browser.is_empty() {
                    inner.general.len()
                } else {
                    inner.team_browser.len()
                }
            }
        }
    }

    /// Whether a degraded episode is in progress.
    pub fn is_degraded(&self) -> bool {
        self.lock().degraded_since.is_some()
    }

    /// Report for the degraded-mode notification, `None` outside an
    /// episode. `should_show_notification` stays true until
    /// [`KeyPoolManager::mark_notification_shown`] is called.
    pub fn degraded_info(&self) -> Option<DegradedInfo> {
        let inner = self.lock();
        inner.degraded_since.map(|since| DegradedInfo {
            message: format!(
                "All API keys are rate limited or failing (degraded for {}s). \
                 Data may be incomplete until a key pool recovers.",
                since.elapsed().as_secs()
            ),
            should_show_notification: !inner.notification_shown,
        })
    }

    /// Suppress further degraded notifications for this episode.
    pub fn mark_notification_shown(&self) {
        self.lock().notification_shown = true;
    }

    /// Clear every pool and the degraded flag. Intended for process start,
    /// not for normal operation.
    pub fn reset_all(&self) {
        let mut inner = self.lock();
        inner.general.reset();
        inner.team_browser.reset();
        inner.degraded_since = None;
        inner.notification_shown = false;
        info!("credential pools reset");
    }

    pub fn stats(&self) -> ManagerStats {
        let inner = self.lock();
        ManagerStats {
            general: inner.general.stats(),
            team_browser: inner.team_browser.stats(),
            degraded: inner.degraded_since.is_some(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a panicking thread held it; the pool
        // state itself is still structurally valid.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn pool_mut(&mut self, class: TrafficClass) -> &mut KeyPool {
        match class {
            TrafficClass::General => &mut self.general,
            TrafficClass::TeamBrowser => &mut self.team_browser,
        }
    }

    fn select_general(&mut self, allow_fallback: bool) -> Option<KeyLease> {
        if self.general.is_exhausted() {
            if allow_fallback && !self.team_browser.is_empty() {
                warn!("general pool exhausted, borrowing from the team-browser pool");
                self.general.reset_cycle_counters();
                return self
                    .team_browser
                    .next()
                    .map(|s| KeyLease::new(TrafficClass::TeamBrowser, s));
            }
            if self.team_browser.is_empty() || self.team_browser.is_exhausted() {
                self.note_global_failure();
            }
        }
        // An exhausted pool with no usable fallback keeps serving; its timed
        // reset fires inside next() once the window elapses.
        self.general
            .next()
            .map(|s| KeyLease::new(TrafficClass::General, s))
    }

    fn select_team_browser(&mut self) -> Option<KeyLease> {
        if self.team_browser.is_empty() {
            if self.general.is_exhausted() {
                self.note_global_failure();
                return None;
            }
            return self
                .general
                .next()
                .map(|s| KeyLease::new(TrafficClass::General, s));
        }
        if self.team_browser.is_exhausted() && self.general.is_exhausted() {
            self.note_global_failure();
            return None;
        }
        self.team_browser
            .next()
            .map(|s| KeyLease::new(TrafficClass::TeamBrowser, s))
    }

    /// Start a degraded episode, at most once until the next reset.
    fn note_global_failure(&mut self) {
        if self.degraded_since.is_none() {
            self.degraded_since = Some(Instant::now());
            warn!("all credential pools exhausted, entering degraded mode");
        }
    }
}
