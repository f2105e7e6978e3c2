//! Request classification.
//!
//! Order is fixed: exclusion, then origin allow-list, then navigation vs.
//! sub-resource. The first rule that matches wins.

use skindiary_net::{RequestMode, UrlPattern};
use url::{Origin, Url};

use crate::config::{AgentConfig, ExclusionConfig};

/// How the request's origin relates to the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginKind {
    SameOrigin,
    AllowedCrossOrigin,
}

/// Classification of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Authentication traffic: never intercepted, never cached.
    Excluded,
    /// Cross-origin and not allow-listed: left to default browser handling.
    Foreign,
    /// Full document load.
    Navigation(OriginKind),
    /// Style, script, image, etc.
    SubResource(OriginKind),
}

impl RequestClass {
    /// Whether the agent responds to this request itself.
    pub fn is_intercepted(&self) -> bool {
        matches!(self, Self::Navigation(_) | Self::SubResource(_))
    }
}

/// Classifies request URLs for one app origin.
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    origin: Origin,
    exclusions: ExclusionConfig,
    allowed_origins: Vec<UrlPattern>,
}

impl RequestClassifier {
    pub fn new(app_origin: &Url, exclusions: ExclusionConfig, allowed_origins: Vec<UrlPattern>) -> Self {
        Self {
            origin: app_origin.origin(),
            exclusions,
            allowed_origins,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(
            &config.origin,
            config.exclusions.clone(),
            config.allowed_origins.clone(),
        )
    }

    /// Version of the exclusion list in use.
    pub fn exclusion_version(&self) -> u32 {
        self.exclusions.version
    }

    pub fn classify(&self, url: &Url, mode: RequestMode) -> RequestClass {
        if self.exclusions.excludes(url) {
            return RequestClass::Excluded;
        }

        let origin_kind = if url.origin() == self.origin {
            OriginKind::SameOrigin
        } else if self.allowed_origins.iter().any(|p| p.matches(url)) {
            OriginKind::AllowedCrossOrigin
        } else {
            return RequestClass::Foreign;
        };

        if mode == RequestMode::Navigate {
            RequestClass::Navigation(origin_kind)
        } else {
            RequestClass::SubResource(origin_kind)
        }
    }
}
