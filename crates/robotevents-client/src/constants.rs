//! RobotEvents API constants
//!
//! Endpoint layout and the fixed limits the upstream service enforces.
//! Tunable behavior (dispatch spacing, retry defaults, page caps) lives in
//! `ClientConfig`; the values here are properties of the API itself.

/// Production base URL for the RobotEvents v2 API.
pub const API_BASE_URL: &str = "https://www.robotevents.com/api/v2";

/// Largest `per_page` value the API accepts.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Seconds to wait after a 429 that carries no `Retry-After` header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// Hard upper bound on pages fetched for one paged listing. Reached only
/// when upstream page metadata is inconsistent.
pub const MAX_PAGES: u32 = 200;

/// Default minimum spacing between request dispatches, in milliseconds.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 250;

/// Path segments that name paged collection resources. A path containing
/// one of these, not ending in a numeric id, returns a paged listing.
pub const LIST_SEGMENTS: &[&str] = &[
    "teams", "events", "programs", "seasons", "matches", "rankings", "skills", "awards",
];
