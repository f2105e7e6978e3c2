//! The offline agent: one installed version of the service worker script.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use serde_json::Value;
use skindiary_common::with_timeout;
use skindiary_net::{Fetcher, Request};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{CacheEntry, RequestKey, SharedCacheStorage};
use crate::clients::{Client, Clients};
use crate::config::AgentConfig;
use crate::fetch::{FetchDispatcher, FetchEvent, FetchOutcome};
use crate::lifecycle::{LifecycleTransition, ServiceWorkerId, ServiceWorkerState};
use crate::notification::{Notification, NotificationHandler, Notifier, PushEvent};
use crate::{Result, ServiceWorkerError};

/// Message posted to the agent by a page.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Promote the waiting worker without waiting for pages to close.
    SkipWaiting,
    Other(Value),
}

impl ClientMessage {
    /// Interpret a posted JSON payload; `{"type": "SKIP_WAITING"}` is the only one understood.
    pub fn from_json(data: Value) -> Self {
        match data.get("type").and_then(Value::as_str) {
            Some("SKIP_WAITING") => Self::SkipWaiting,
            _ => Self::Other(data),
        }
    }
}

/// What activation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    /// Caches deleted because their name was not current.
    pub deleted: Vec<String>,

    /// Clients whose controller changed to this worker.
    pub claimed: Vec<String>,

    pub navigation_preload: bool,
}

/// An offline agent instance.
pub struct OfflineAgent {
    id: ServiceWorkerId,
    script_url: Url,
    config: AgentConfig,
    state: RwLock<ServiceWorkerState>,
    skip_waiting: AtomicBool,
    caches: SharedCacheStorage,
    clients: Arc<RwLock<Clients>>,
    fetcher: Arc<dyn Fetcher>,
    dispatcher: FetchDispatcher,
    notifications: NotificationHandler,
}

impl OfflineAgent {
    pub fn new(
        script_url: Url,
        config: AgentConfig,
        caches: SharedCacheStorage,
        clients: Arc<RwLock<Clients>>,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        config.validate()?;

        let dispatcher = FetchDispatcher::new(&config, Arc::clone(&caches), Arc::clone(&fetcher))?;
        let notifications =
            NotificationHandler::new(config.notifications.clone(), config.click_url()?, notifier);

        Ok(Self {
            id: ServiceWorkerId::new(),
            script_url,
            config,
            state: RwLock::new(ServiceWorkerState::default()),
            skip_waiting: AtomicBool::new(false),
            caches,
            clients,
            fetcher,
            dispatcher,
            notifications,
        })
    }

    pub fn id(&self) -> ServiceWorkerId {
        self.id
    }

    pub fn script_url(&self) -> &Url {
        &self.script_url
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub async fn state(&self) -> ServiceWorkerState {
        *self.state.read().await
    }

    /// Whether the worker asked to be activated without waiting.
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::SeqCst)
    }

    pub fn skip_waiting(&self) {
        if !self.skip_waiting.swap(true, Ordering::SeqCst) {
            debug!(worker = %self.id, "Skip waiting requested");
        }
    }

    async fn transition(&self, transition: LifecycleTransition) -> Result<ServiceWorkerState> {
        let mut state = self.state.write().await;
        let next = state.next(transition)?;
        debug!(worker = %self.id, from = ?*state, to = ?next, "State change");
        *state = next;
        Ok(next)
    }

    // ==================== Install ====================

    /// Prime the current cache with every manifest entry.
    ///
    /// Either every entry is stored or storage is left untouched and the
    /// worker becomes redundant.
    pub async fn handle_install(&self) -> Result<()> {
        self.transition(LifecycleTransition::StartInstall).await?;
        info!(
            worker = %self.id,
            cache = %self.config.cache_name,
            assets = self.config.manifest.len(),
            "Installing"
        );

        match self.prime_cache().await {
            Ok(count) => {
                self.transition(LifecycleTransition::InstallSucceeded).await?;
                info!(worker = %self.id, cached = count, "Install complete");
                self.skip_waiting();
                Ok(())
            }
            Err(e) => {
                error!(worker = %self.id, error = %e, "Install failed");
                self.transition(LifecycleTransition::InstallFailed).await?;
                Err(e)
            }
        }
    }

    async fn prime_cache(&self) -> Result<usize> {
        let urls = self.config.manifest.resolve(&self.config.origin)?;
        let staged = try_join_all(urls.into_iter().map(|url| self.stage(url))).await?;
        let count = staged.len();

        let mut caches = self.caches.write().await;
        let cache = caches.open(&self.config.cache_name);
        for (key, entry) in staged {
            cache.put(key, entry);
        }
        Ok(count)
    }

    async fn stage(&self, url: Url) -> Result<(RequestKey, CacheEntry)> {
        let request = Request::get(url.clone()).timeout(self.config.network_timeout);
        let response = with_timeout(self.config.network_timeout, self.fetcher.fetch(&request))
            .await
            .map_err(|e| ServiceWorkerError::InstallFailed(format!("{url}: {e}")))?
            .map_err(|e| ServiceWorkerError::InstallFailed(format!("{url}: {e}")))?;

        if !response.ok() {
            return Err(ServiceWorkerError::InstallFailed(format!(
                "{url} returned {}",
                response.status
            )));
        }

        let key = RequestKey::get(url);
        let entry = CacheEntry::from_response(&key, &response);
        Ok((key, entry))
    }

    // ==================== Activate ====================

    /// Delete stale caches, enable navigation preload and claim clients.
    pub async fn handle_activate(&self) -> Result<ActivationReport> {
        self.transition(LifecycleTransition::StartActivate).await?;

        let deleted = {
            let mut caches = self.caches.write().await;
            let stale: Vec<String> = caches
                .keys()
                .into_iter()
                .filter(|name| *name != self.config.cache_name)
                .collect();
            for name in &stale {
                info!(cache = %name, "Deleting old cache");
                caches.delete(name);
            }
            stale
        };

        if self.config.navigation_preload {
            self.dispatcher.set_navigation_preload(true);
        }

        let claimed = self.clients.write().await.claim(self.id);
        self.transition(LifecycleTransition::ActivateSucceeded).await?;

        info!(
            worker = %self.id,
            deleted = deleted.len(),
            claimed = claimed.len(),
            "Activated"
        );

        Ok(ActivationReport {
            deleted,
            claimed,
            navigation_preload: self.dispatcher.navigation_preload_enabled(),
        })
    }

    // ==================== Fetch ====================

    pub async fn handle_fetch(&self, event: FetchEvent) -> Result<FetchOutcome> {
        if !self.state().await.is_active() {
            debug!(worker = %self.id, url = %event.request.url, "Not active, passing through");
            return Ok(FetchOutcome::Passthrough);
        }
        self.dispatcher.dispatch(event).await
    }

    /// Wait for background cache writes.
    pub async fn settle(&self) {
        self.dispatcher.settle().await;
    }

    // ==================== Push ====================

    pub async fn handle_push(&self, event: &PushEvent) -> Option<Notification> {
        self.notifications.on_push(event).await
    }

    pub async fn handle_notification_click(&self, notification: &Notification) -> Client {
        self.notifications
            .on_click(notification, &self.clients, self.id)
            .await
    }

    // ==================== Messages ====================

    pub fn handle_message(&self, message: &ClientMessage) {
        match message {
            ClientMessage::SkipWaiting => self.skip_waiting(),
            ClientMessage::Other(data) => {
                warn!(worker = %self.id, %data, "Ignoring unknown client message");
            }
        }
    }

    /// Mark the worker redundant after a newer one took over.
    pub async fn retire(&self) -> Result<()> {
        self.transition(LifecycleTransition::Retire).await?;
        info!(worker = %self.id, "Retired");
        Ok(())
    }
}

impl std::fmt::Debug for OfflineAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineAgent")
            .field("id", &self.id)
            .field("script_url", &self.script_url.as_str())
            .field("cache_name", &self.config.cache_name)
            .finish_non_exhaustive()
    }
}
