//! The asset manifest: URLs that must be available offline.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::Result;

/// Build-time list of URLs primed into the cache on install.
///
/// Entries are absolute or root-relative and are resolved against the app
/// origin when the cache is primed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    entries: Vec<String>,
}

impl AssetManifest {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// The Skin Diary asset set.
    pub fn skindiary() -> Self {
        Self::new([
            "/",
            "/static/css/custom.css",
            "/static/css/pwa.css",
            "/static/js/app.js",
            "/static/manifest.json",
            "/static/icons/icon-72x72.png",
            "/static/icons/icon-96x96.png",
            "/static/icons/icon-128x128.png",
            "/static/icons/icon-144x144.png",
            "/static/icons/icon-152x152.png",
            "/static/icons/icon-192x192.png",
            "/static/icons/icon-384x384.png",
            "/static/icons/icon-512x512.png",
            "/static/offline.html",
            "https://cdn.replit.com/agent/bootstrap-agent-dark-theme.min.css",
            "https://cdn.jsdelivr.net/npm/bootstrap@5.1.3/dist/js/bootstrap.bundle.min.js",
        ])
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    /// Resolve every entry against `origin`.
    pub fn resolve(&self, origin: &Url) -> Result<Vec<Url>> {
        self.entries
            .iter()
            .map(|entry| origin.join(entry).map_err(Into::into))
            .collect()
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self::skindiary()
    }
}
