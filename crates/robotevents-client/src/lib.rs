//! Resilient HTTP client for the RobotEvents API
//!
//! Executes GET requests against a rate-limited upstream that rejects
//! credentials by serving its login page instead of JSON. Each logical
//! request leases a key from the credential pools, spaces its dispatch
//! through a process-wide rate limiter, and classifies the response:
//! rotate and retry on auth rejection (bounded by pool size), wait and
//! reissue on 429 (unbounded, same key), fail typed on anything else.
//! A pagination driver sits on top for endpoints that return paged
//! collections.

pub mod client;
pub mod constants;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod paginate;
pub mod query;

pub use client::{ClientConfig, RobotEventsClient};
pub use error::{Error, Result};
pub use limiter::RateLimiter;
pub use query::{build_url, Query};
