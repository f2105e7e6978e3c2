//! URL patterns for exclusion and allow lists.

use serde::{Deserialize, Serialize};
use url::Url;

/// Type of URL pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Exact URL match.
    Exact,
    /// Prefix match on the full URL.
    Prefix,
    /// Suffix match on the full URL.
    Suffix,
    /// Substring anywhere in the full URL.
    Contains,
    /// Host equals the pattern (case-insensitive).
    Host,
    /// Host starts with the pattern (e.g. `cdn.`).
    HostPrefix,
}

/// URL pattern for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPattern {
    /// Pattern type.
    #[serde(rename = "type")]
    pub pattern_type: PatternType,
    /// Pattern string.
    pub pattern: String,
}

impl UrlPattern {
    /// Create an exact match pattern.
    pub fn exact(url: &str) -> Self {
        Self::new(PatternType::Exact, url)
    }

    /// Create a prefix match pattern.
    pub fn prefix(prefix: &str) -> Self {
        Self::new(PatternType::Prefix, prefix)
    }

    /// Create a suffix match pattern.
    pub fn suffix(suffix: &str) -> Self {
        Self::new(PatternType::Suffix, suffix)
    }

    /// Create a contains pattern.
    pub fn contains(substring: &str) -> Self {
        Self::new(PatternType::Contains, substring)
    }

    /// Create a host pattern.
    pub fn host(host: &str) -> Self {
        Self::new(PatternType::Host, host)
    }

    /// Create a host prefix pattern.
    pub fn host_prefix(prefix: &str) -> Self {
        Self::new(PatternType::HostPrefix, prefix)
    }

    fn new(pattern_type: PatternType, pattern: &str) -> Self {
        Self {
            pattern_type,
            pattern: pattern.to_string(),
        }
    }

    /// Check if a URL matches this pattern.
    pub fn matches(&self, url: &Url) -> bool {
        let url_str = url.as_str();
        match self.pattern_type {
            PatternType::Exact => url_str == self.pattern,
            PatternType::Prefix => url_str.starts_with(&self.pattern),
            PatternType::Suffix => url_str.ends_with(&self.pattern),
            PatternType::Contains => url_str.contains(&self.pattern),
            PatternType::Host => url
                .host_str()
                .is_some_and(|h| h.eq_ignore_ascii_case(&self.pattern)),
            PatternType::HostPrefix => url
                .host_str()
                .is_some_and(|h| h.to_ascii_lowercase().starts_with(&self.pattern.to_ascii_lowercase())),
        }
    }
}
