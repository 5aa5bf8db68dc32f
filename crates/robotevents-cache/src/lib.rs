//! Persisted team-resolution cache
//!
//! Team lookups resolve a (number, program) pair to an upstream id and
//! payload; this crate remembers those resolutions across restarts. The
//! in-memory table is authoritative and mirrors to one JSON blob behind a
//! small key-value storage trait, with TTL expiry applied lazily on read.
//! Persistence failures degrade to logs: the cache never makes a lookup
//! slower or a request fail.

pub mod cache;
pub mod error;
pub mod storage;

pub use cache::{CacheEntry, TeamCache, DEFAULT_TTL, STORAGE_KEY};
pub use error::{Error, Result};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageFuture};
