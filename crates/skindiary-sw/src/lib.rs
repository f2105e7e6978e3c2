//! # Skin Diary Service Worker
//!
//! Request interception and cache-coherence engine for the Skin Diary web app.
//!
//! ## Features
//!
//! - **Install**: primes a versioned cache with the asset manifest, all or nothing
//! - **Activate**: deletes every cache whose name is not the current version, then claims clients
//! - **Fetch**: network-first with offline fallback for navigations, cache-first with
//!   background fill for sub-resources, passthrough for excluded and foreign requests
//! - **Push**: shows a notification and routes clicks to the app root
//!
//! ## Architecture
//!
//! ```text
//! ServiceWorkerContainer (navigator.serviceWorker)
//!     │
//!     └── ServiceWorkerRegistration
//!             ├── installing (OfflineAgent)
//!             ├── waiting (OfflineAgent)
//!             └── active (OfflineAgent)
//!                     ├── FetchDispatcher ── RequestClassifier
//!                     └── NotificationHandler
//!
//! CacheStorage (shared by every agent)
//!     └── Cache "skindiary-v1"
//!             └── RequestKey → CacheEntry
//! ```

use skindiary_common::CommonError;
use thiserror::Error;

pub mod cache;
pub mod classify;
pub mod clients;
pub mod config;
pub mod container;
pub mod fetch;
pub mod lifecycle;
pub mod manifest;
pub mod notification;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{Cache, CacheEntry, CacheStorage, RequestKey, SharedCacheStorage};
pub use classify::{OriginKind, RequestClass, RequestClassifier};
pub use clients::{Client, ClientType, Clients};
pub use config::{AgentConfig, ExclusionConfig, NotificationConfig, CACHE_NAME, OFFLINE_PAGE};
pub use container::{
    RegistrationOptions, ServiceWorkerContainer, ServiceWorkerEvent, ServiceWorkerRegistration,
};
pub use fetch::{FetchDispatcher, FetchEvent, FetchOutcome, FetchResponse, ResponseSource};
pub use lifecycle::{LifecycleTransition, ServiceWorkerId, ServiceWorkerState};
pub use manifest::AssetManifest;
pub use notification::{LogNotifier, Notification, NotificationHandler, Notifier, PushEvent};
pub use worker::{ActivationReport, ClientMessage, OfflineAgent};

// ==================== Errors ====================

/// Errors that can occur in service worker operations.
#[derive(Error, Debug)]
pub enum ServiceWorkerError {
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    #[error("Install failed: {0}")]
    InstallFailed(String),

    #[error("State error: {0}")]
    StateError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Notification error: {0}")]
    NotificationError(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Result type alias for service worker operations.
pub type Result<T> = std::result::Result<T, ServiceWorkerError>;
