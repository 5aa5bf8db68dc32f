//! Credential pools for the RobotEvents API
//!
//! Manages two pools of API keys (general traffic and the team-browser
//! surface) with round-robin selection, failed-key quarantine, cycle
//! accounting, and a timed self-reset. The manager leases keys to the
//! request executor and raises a global degraded flag when every pool is
//! exhausted at once. Classification of upstream responses lives here too,
//! since deciding whether a key failed is a pool concern.
//!
//! Key lifecycle:
//! 1. Executor leases a key for one request via `KeyPoolManager::select`
//! 2. Response classifies as a success → `mark_success`, key keeps serving
//! 3. Response classifies as an auth rejection → `mark_failed`, the slot is
//!    quarantined and the cursor moves on
//! 4. Every slot quarantined → the cycle rolls over and quarantine clears
//! 5. Too many barren cycles → the pool reports exhaustion; general traffic
//!    may borrow from the team-browser pool
//! 6. The hourly reset window clears quarantine and exhaustion on its own

pub mod classify;
pub mod key;
pub mod manager;
pub mod pool;

pub use classify::{classify_response, is_html_document, is_login_page, ResponseClass};
pub use key::{ApiKey, TrafficClass};
pub use manager::{DegradedInfo, KeyLease, KeyPoolManager, ManagerStats};
pub use pool::{KeyPool, KeyPoolConfig, PoolStats, SelectedKey};
