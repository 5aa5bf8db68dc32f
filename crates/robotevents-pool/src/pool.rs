//! Rotation state and key selection for one traffic class
//!
//! A pool walks its keys with a rotation cursor, skipping indices marked
//! failed. The cursor also advances on its own every `calls_before_rotation`
//! selections so healthy keys share load. When every index is failed the
//! cycle rolls over: the failed set clears, the cursor returns to zero, and
//! the cycle counters record whether the finished cycle produced any
//! success. A pool whose cycles keep finishing barren reports itself
//! exhausted until the hourly reset clears its counters.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::key::ApiKey;

/// Tuning knobs for a single key pool.
#[derive(Debug, Clone)]
pub struct KeyPoolConfig {
    /// Selections one key serves before the cursor advances anyway.
    pub calls_before_rotation: u32,
    /// Consecutive zero-success cycles before the pool reports exhaustion.
    pub max_failed_cycles: u32,
    /// Window after which the failed set and cycle counters clear on their own.
    pub failed_reset_window: Duration,
}

impl Default for KeyPoolConfig {
    fn default() -> Self {
        Self {
            calls_before_rotation: 20,
            max_failed_cycles: 2,
            failed_reset_window: Duration::from_secs(60 * 60),
        }
    }
}

/// Outcome of a selection: which slot served and the key itself.
#[derive(Debug, Clone)]
pub struct SelectedKey {
    pub index: usize,
    pub key: ApiKey,
}

/// Point-in-time view of a pool's rotation state.
#[derive(Debug, Clone, Serialize)]
pub struct PoolStats {
    pub size: usize,
    pub current_index: usize,
    pub failed: usize,
    pub cycle_attempts: u64,
    pub successes_this_cycle: u64,
    pub consecutive_failed_cycles: u32,
    pub exhausted: bool,
}

/// An ordered set of API keys serving one traffic class.
///
/// All methods are synchronous; the manager guards the pool with a mutex so
/// every selection decision completes in one non-suspending step.
pub struct KeyPool {
    name: &'static str,
    keys: Vec<ApiKey>,
    current_index: usize,
    failed: HashSet<usize>,
    cycle_attempts: u64,
    successes_this_cycle: u64,
    consecutive_failed_cycles: u32,
    calls_since_rotation: u32,
    last_failed_reset: Instant,
    config: KeyPoolConfig,
}

impl KeyPool {
    /// Create a pool over `keys`. The order of the list fixes the rotation
    /// order for the pool's lifetime.
    pub fn new(name: &'static str, keys: Vec<ApiKey>, config: KeyPoolConfig) -> Self {
        info!(pool = name, keys = keys.len(), "key pool initialized");
        Self {
            name,
            keys,
            current_index: 0,
            failed: HashSet::new(),
            cycle_attempts: 0,
            successes_this_cycle: 0,
            consecutive_failed_cycles: 0,
            calls_since_rotation: 0,
            last_failed_reset: Instant::now(),
            config,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Select the key for the next request.
    ///
    /// Applies the timed reset first, then handles cycle roll-over if every
    /// index is failed, then returns the key at the cursor (skipping failed
    /// indices). Returns `None` only for an empty pool.
    pub fn next(&mut self) -> Option<SelectedKey> {
        if self.keys.is_empty() {
            return None;
        }
        self.maybe_timed_reset();

        if self.failed.len() >= self.keys.len() {
            self.roll_over_cycle();
        }

        while self.failed.contains(&self.current_index) {
            self.current_index = (self.current_index + 1) % self.keys.len();
        }
        let index = self.current_index;

        self.calls_since_rotation += 1;
        if self.calls_since_rotation >= self.config.calls_before_rotation {
            self.advance_cursor();
        }

        Some(SelectedKey {
            index,
            key: self.keys[index].clone(),
        })
    }

    /// Quarantine the key at `index` and move the cursor off it.
    pub fn mark_failed(&mut self, index: usize) {
        if index >= self.keys.len() {
            warn!(pool = self.name, index, "mark_failed for unknown index ignored");
            return;
        }
        self.failed.insert(index);
        warn!(
            pool = self.name,
            index,
            failed = self.failed.len(),
            size = self.keys.len(),
            "key marked failed"
        );
        self.advance_cursor();
    }

    /// Record a successful call served by this pool.
    pub fn mark_success(&mut self) {
        self.successes_this_cycle += 1;
        self.consecutive_failed_cycles = 0;
    }

    /// Whether the pool has burned through `max_failed_cycles` cycles
    /// without a single success. Applies the timed reset first, so
    /// exhaustion clears on its own once the window elapses. An empty pool
    /// is trivially exhausted.
    pub fn is_exhausted(&mut self) -> bool {
        self.maybe_timed_reset();
        self.keys.is_empty() || self.consecutive_failed_cycles >= self.config.max_failed_cycles
    }

    /// Clear cycle counters only, leaving the failed set and cursor alone.
    /// Used when general traffic falls back to another pool so this one
    /// gets a fresh chance later.
    pub fn reset_cycle_counters(&mut self) {
        self.cycle_attempts = 0;
        self.successes_this_cycle = 0;
        self.consecutive_failed_cycles = 0;
    }

    /// Full reset: cursor, failed set, every counter, and the reset clock.
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.failed.clear();
        self.cycle_attempts = 0;
        self.successes_this_cycle = 0;
        self.consecutive_failed_cycles = 0;
        self.calls_since_rotation = 0;
        self.last_failed_reset = Instant::now();
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.keys.len(),
            current_index: self.current_index,
            failed: self.failed.len(),
            cycle_attempts: self.cycle_attempts,
            successes_this_cycle: self.successes_this_cycle,
            consecutive_failed_cycles: self.consecutive_failed_cycles,
            exhausted: self.keys.is_empty()
                || self.consecutive_failed_cycles >= self.config.max_failed_cycles,
        }
    }

    fn advance_cursor(&mut self) {
        self.current_index = (self.current_index + 1) % self.keys.len();
        self.calls_since_rotation = 0;
    }

    /// Every index is failed: account for the finished cycle and start a
    /// fresh one from index 0.
    fn roll_over_cycle(&mut self) {
        self.cycle_attempts += 1;
        if self.successes_this_cycle == 0 {
            self.consecutive_failed_cycles += 1;
            warn!(
                pool = self.name,
                cycle_attempts = self.cycle_attempts,
                consecutive_failed_cycles = self.consecutive_failed_cycles,
                "rotation cycle finished with zero successes"
            );
        } else {
            self.consecutive_failed_cycles = 0;
        }
        self.failed.clear();
        self.current_index = 0;
        self.successes_this_cycle = 0;
        self.calls_since_rotation = 0;
        info!(
            pool = self.name,
            cycle_attempts = self.cycle_attempts,
            "failed set cleared, starting a fresh rotation cycle"
        );
    }

    /// Unconditional clear of the failed set and cycle counters once the
    /// reset window has elapsed.
    fn maybe_timed_reset(&mut self) {
        if self.last_failed_reset.elapsed() < self.config.failed_reset_window {
            return;
        }
        if !self.failed.is_empty() || self.consecutive_failed_cycles > 0 {
            info!(
                pool = self.name,
                cleared = self.failed.len(),
                "timed reset cleared failed keys"
            );
        }
        self.failed.clear();
        self.cycle_attempts = 0;
        self.successes_this_cycle = 0;
        self.consecutive_failed_cycles = 0;
        self.calls_since_rotation = 0;
        self.last_failed_reset = Instant::now();
    }
}
