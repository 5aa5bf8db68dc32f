//! API key wrapper and traffic classes

use std::fmt;

use zeroize::Zeroize;

/// A single RobotEvents API key.
///
/// Keys are opaque bearer secrets; Debug/Display render `[REDACTED]` so a
/// key can never leak through logs, and the backing string is wiped on
/// drop. The raw value is reachable only through [`ApiKey::expose`] at
/// header-attachment time.
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Expose the raw key (use sparingly).
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Logical partition of outbound traffic. Each class is served by its own
/// credential pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficClass {
    /// Default pool for ad-hoc API traffic.
    General,
    /// Dedicated pool for the team-browser surface, which produces bursts
    /// of lookups that would otherwise starve the general pool.
    TeamBrowser,
}

impl TrafficClass {
    /// Class label for logging and stats.
    pub fn label(&self) -> &'static str {
        match self {
            TrafficClass::General => "general",
            TrafficClass::TeamBrowser => "team_browser",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_key_material() {
        let key = ApiKey::new("re_live_abc123");
        let debug = format!("{key:?}");
        assert_eq!(debug, "[REDACTED]");
        assert!(!debug.contains("abc123"));
    }

    #[test]
    fn display_redacts_key_material() {
        let key = ApiKey::new("re_live_abc123");
        assert_eq!(key.to_string(), "[REDACTED]");
    }

    #[test]
    fn expose_returns_raw_key() {
        let key = ApiKey::new("re_live_abc123");
        assert_eq!(key.expose(), "re_live_abc123");
    }

    #[test]
    fn traffic_class_labels() {
        assert_eq!(TrafficClass::General.label(), "general");
        assert_eq!(TrafficClass::TeamBrowser.label(), "team_browser");
    }
}
