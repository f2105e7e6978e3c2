//! Fetch strategy dispatch.
//!
//! Navigations are network-first with the offline page as fallback and are
//! never cached. Sub-resources are cache-first; misses are fetched and, on a
//! 200, copied into the current cache in the background.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use hashbrown::HashMap;
use http::{Method, StatusCode};
use skindiary_common::with_timeout;
use skindiary_net::{Fetcher, NetError, Request, Response};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::cache::{CacheEntry, RequestKey, SharedCacheStorage};
use crate::classify::{RequestClass, RequestClassifier};
use crate::config::AgentConfig;
use crate::{Result, ServiceWorkerError};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "svg"];
const IMAGE_UNAVAILABLE: &str = "Image not available offline";
const NETWORK_ERROR: &str = "Network error happened";

// ==================== Fetch Event ====================

/// Navigation preload started by the browser alongside worker startup.
///
/// Resolves to `None` when the browser had nothing to preload.
pub type PreloadResponse = BoxFuture<'static, std::result::Result<Option<Response>, NetError>>;

/// A fetch event.
pub struct FetchEvent {
    /// The intercepted request.
    pub request: Request,

    /// Client that issued the request.
    pub client_id: Option<String>,

    /// Preloaded navigation response, if one was started.
    pub preload_response: Option<PreloadResponse>,
}

impl FetchEvent {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            client_id: None,
            preload_response: None,
        }
    }

    /// Set the issuing client.
    pub fn from_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Attach a navigation preload.
    pub fn with_preload<F>(mut self, preload: F) -> Self
    where
        F: Future<Output = std::result::Result<Option<Response>, NetError>> + Send + 'static,
    {
        self.preload_response = Some(preload.boxed());
        self
    }
}

impl fmt::Debug for FetchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchEvent")
            .field("request", &self.request)
            .field("client_id", &self.client_id)
            .field("preload_response", &self.preload_response.is_some())
            .finish()
    }
}

// ==================== Fetch Response ====================

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    Preload,
    /// Built by the agent because nothing better was available.
    Synthesized,
}

/// Response handed back to the page.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    /// Status code.
    pub status: u16,

    /// Status text.
    pub status_text: String,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Response body.
    pub body: Vec<u8>,

    pub source: ResponseSource,
}

impl FetchResponse {
    /// Create a response from cache entry.
    pub fn from_cache(entry: &CacheEntry) -> Self {
        Self {
            status: entry.status,
            status_text: status_text(entry.status),
            headers: entry.headers.clone(),
            body: entry.body.clone(),
            source: ResponseSource::Cache,
        }
    }

    pub fn from_network(response: &Response, source: ResponseSource) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            status: response.status.as_u16(),
            status_text: status_text(response.status.as_u16()),
            headers,
            body: response.body.to_vec(),
            source,
        }
    }

    /// 503 with a plain-text explanation.
    pub fn service_unavailable(message: &str) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        Self {
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            status_text: status_text(StatusCode::SERVICE_UNAVAILABLE.as_u16()),
            headers,
            body: message.as_bytes().to_vec(),
            source: ResponseSource::Synthesized,
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn status_text(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}

/// Result of dispatching a fetch event.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Not handled by the agent; the browser fetches it as usual.
    Passthrough,
    /// The agent answered the request.
    Respond(FetchResponse),
}

impl FetchOutcome {
    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            Self::Respond(response) => Some(response),
            Self::Passthrough => None,
        }
    }
}

// ==================== Dispatcher ====================

/// Applies the per-class fetch strategy.
pub struct FetchDispatcher {
    classifier: RequestClassifier,
    caches: SharedCacheStorage,
    fetcher: Arc<dyn Fetcher>,
    cache_name: String,
    offline_url: Url,
    network_timeout: Duration,
    navigation_preload: AtomicBool,
    pending_writes: Mutex<Vec<JoinHandle<()>>>,
}

impl FetchDispatcher {
    pub fn new(
        config: &AgentConfig,
        caches: SharedCacheStorage,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self> {
        Ok(Self {
            classifier: RequestClassifier::from_config(config),
            caches,
            fetcher,
            cache_name: config.cache_name.clone(),
            offline_url: config.offline_url()?,
            network_timeout: config.network_timeout,
            navigation_preload: AtomicBool::new(false),
            pending_writes: Mutex::new(Vec::new()),
        })
    }

    /// Turn navigation preload on or off.
    pub fn set_navigation_preload(&self, enabled: bool) {
        self.navigation_preload.store(enabled, Ordering::SeqCst);
    }

    pub fn navigation_preload_enabled(&self) -> bool {
        self.navigation_preload.load(Ordering::SeqCst)
    }

    pub fn classify(&self, request: &Request) -> RequestClass {
        self.classifier.classify(&request.url, request.mode)
    }

    /// Handle one intercepted request.
    ///
    /// An `Err` means the request is left unresolved (navigation failed and
    /// the offline page is missing from the cache).
    pub async fn dispatch(&self, event: FetchEvent) -> Result<FetchOutcome> {
        let class = self.classify(&event.request);
        trace!(url = %event.request.url, ?class, "Classified request");

        match class {
            RequestClass::Excluded | RequestClass::Foreign => {
                debug!(url = %event.request.url, ?class, "Passing request through");
                Ok(FetchOutcome::Passthrough)
            }
            RequestClass::Navigation(_) => self.network_first(event).await.map(FetchOutcome::Respond),
            RequestClass::SubResource(_) => {
                Ok(FetchOutcome::Respond(self.cache_first(event.request).await))
            }
        }
    }

    async fn network_first(&self, event: FetchEvent) -> Result<FetchResponse> {
        let FetchEvent {
            request,
            preload_response,
            ..
        } = event;

        if let Some(preload) = preload_response.filter(|_| self.navigation_preload_enabled()) {
            match preload.await {
                Ok(Some(response)) => {
                    debug!(url = %request.url, status = %response.status, "Using preloaded response");
                    return Ok(FetchResponse::from_network(&response, ResponseSource::Preload));
                }
                Ok(None) => {}
                Err(e) => warn!(url = %request.url, error = %e, "Navigation preload failed"),
            }
        }

        match self.fetch_network(&request).await {
            Ok(response) => Ok(FetchResponse::from_network(&response, ResponseSource::Network)),
            Err(e) => {
                warn!(url = %request.url, error = %e, "Navigation failed, serving offline page");
                self.offline_fallback().await
            }
        }
    }

    async fn offline_fallback(&self) -> Result<FetchResponse> {
        let key = RequestKey::get(self.offline_url.clone());
        let caches = self.caches.read().await;

        match caches
            .get(&self.cache_name)
            .and_then(|cache| cache.match_request(&key))
        {
            Some(entry) => Ok(FetchResponse::from_cache(entry)),
            None => {
                error!(cache = %self.cache_name, key = %key, "Offline page missing from cache");
                Err(ServiceWorkerError::NotFound(format!(
                    "offline page {} in {}",
                    self.offline_url, self.cache_name
                )))
            }
        }
    }

    async fn cache_first(&self, request: Request) -> FetchResponse {
        let key = RequestKey::from_request(&request);

        let cached = {
            let caches = self.caches.read().await;
            caches
                .get(&self.cache_name)
                .and_then(|cache| cache.match_request(&key))
                .cloned()
        };
        if let Some(entry) = cached {
            trace!(key = %key, "Cache hit");
            return FetchResponse::from_cache(&entry);
        }

        match self.fetch_network(&request).await {
            Ok(response) => {
                if response.status == StatusCode::OK && request.method == Method::GET {
                    self.write_through(key, &response).await;
                }
                FetchResponse::from_network(&response, ResponseSource::Network)
            }
            Err(e) => {
                error!(url = %request.url, error = %e, "Fetch failed");
                if is_image_url(&request.url) {
                    FetchResponse::service_unavailable(IMAGE_UNAVAILABLE)
                } else {
                    FetchResponse::service_unavailable(NETWORK_ERROR)
                }
            }
        }
    }

    /// Copy a response into the current cache without delaying the caller.
    async fn write_through(&self, key: RequestKey, response: &Response) {
        let entry = CacheEntry::from_response(&key, response);
        let caches = Arc::clone(&self.caches);
        let cache_name = self.cache_name.clone();

        let handle = tokio::spawn(async move {
            debug!(cache = %cache_name, key = %key, "Caching response");
            caches.write().await.open(&cache_name).put(key, entry);
        });

        let mut pending = self.pending_writes.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for background cache writes started so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.pending_writes.lock().await);
        let count = handles.len();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Background cache write did not complete");
            }
        }
        if count > 0 {
            info!(count, "Background cache writes settled");
        }
    }

    async fn fetch_network(&self, request: &Request) -> std::result::Result<Response, NetError> {
        with_timeout(self.network_timeout, self.fetcher.fetch(request))
            .await
            .unwrap_or_else(|e| {
                debug!(url = %request.url, category = e.category(), "Network attempt abandoned");
                Err(NetError::Timeout(self.network_timeout))
            })
    }
}

/// Whether the URL path ends in an image extension.
fn is_image_url(url: &Url) -> bool {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|image| ext.eq_ignore_ascii_case(image))
        })
        .unwrap_or(false)
}
