//! Registration container (navigator.serviceWorker).
//!
//! Owns the installing/waiting/active slots per scope and routes events to
//! the right agent.

use std::sync::Arc;

use hashbrown::HashMap;
use skindiary_common::retry_with_backoff;
use skindiary_net::Fetcher;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheStorage, SharedCacheStorage};
use crate::clients::{Client, Clients};
use crate::config::AgentConfig;
use crate::fetch::{FetchEvent, FetchOutcome};
use crate::lifecycle::{ServiceWorkerId, ServiceWorkerState};
use crate::notification::{Notification, Notifier, PushEvent};
use crate::worker::{ActivationReport, ClientMessage, OfflineAgent};
use crate::{Result, ServiceWorkerError};

// ==================== Registration Options ====================

/// Options for service worker registration.
#[derive(Debug, Clone, Default)]
pub struct RegistrationOptions {
    /// Scope URL. Defaults to the directory of the script.
    pub scope: Option<String>,
}

// ==================== Registration ====================

/// A service worker registration.
#[derive(Debug)]
pub struct ServiceWorkerRegistration {
    /// Scope URL.
    pub scope: Url,

    /// Installing worker.
    pub installing: Option<Arc<OfflineAgent>>,

    /// Waiting worker (installed but not active).
    pub waiting: Option<Arc<OfflineAgent>>,

    /// Active worker.
    pub active: Option<Arc<OfflineAgent>>,
}

impl ServiceWorkerRegistration {
    pub fn new(scope: Url) -> Self {
        Self {
            scope,
            installing: None,
            waiting: None,
            active: None,
        }
    }

    fn covers(&self, url: &Url) -> bool {
        url.as_str().starts_with(self.scope.as_str())
    }
}

/// Service worker events.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceWorkerEvent {
    /// State changed.
    StateChange {
        registration_scope: String,
        worker_id: ServiceWorkerId,
        new_state: ServiceWorkerState,
    },
    /// A new worker started installing.
    UpdateFound { registration_scope: String },
    /// Controller changed.
    ControllerChange {
        client_id: String,
        worker_id: ServiceWorkerId,
    },
}

// ==================== Service Worker Container ====================

/// Service worker container.
pub struct ServiceWorkerContainer {
    /// Registrations by scope.
    registrations: Arc<RwLock<HashMap<String, ServiceWorkerRegistration>>>,

    /// Cache storage.
    caches: SharedCacheStorage,

    /// Clients.
    clients: Arc<RwLock<Clients>>,

    fetcher: Arc<dyn Fetcher>,
    notifier: Arc<dyn Notifier>,

    /// Event sender for state changes.
    event_tx: mpsc::UnboundedSender<ServiceWorkerEvent>,
}

impl ServiceWorkerContainer {
    /// Create a new container.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> (Self, mpsc::UnboundedReceiver<ServiceWorkerEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        (
            Self {
                registrations: Arc::new(RwLock::new(HashMap::new())),
                caches: CacheStorage::shared(),
                clients: Arc::new(RwLock::new(Clients::new())),
                fetcher,
                notifier,
                event_tx,
            },
            event_rx,
        )
    }

    pub fn caches(&self) -> SharedCacheStorage {
        Arc::clone(&self.caches)
    }

    pub fn clients(&self) -> Arc<RwLock<Clients>> {
        Arc::clone(&self.clients)
    }

    /// Register a service worker and activate it once it asks to skip waiting.
    ///
    /// Returns the registration scope.
    pub async fn register(
        &self,
        script_url: &str,
        config: AgentConfig,
        options: RegistrationOptions,
    ) -> Result<String> {
        let (scope, agent) = self.install(script_url, config, options).await?;

        if agent.skip_waiting_requested() {
            self.activate(&scope).await?;
        }
        Ok(scope)
    }

    /// Install a new worker version and leave it waiting.
    ///
    /// Install is retried under the config's retry policy; each attempt runs
    /// on a fresh worker because a failed one is redundant.
    pub async fn install(
        &self,
        script_url: &str,
        config: AgentConfig,
        options: RegistrationOptions,
    ) -> Result<(String, Arc<OfflineAgent>)> {
        let script_url = Url::parse(script_url)
            .map_err(|e| ServiceWorkerError::RegistrationFailed(e.to_string()))?;
        if script_url.origin() != config.origin.origin() {
            return Err(ServiceWorkerError::RegistrationFailed(format!(
                "script {script_url} is not served from {}",
                config.origin
            )));
        }
        config.validate()?;

        let scope = match options.scope {
            Some(s) => script_url
                .join(&s)
                .map_err(|e| ServiceWorkerError::RegistrationFailed(e.to_string()))?,
            None => default_scope(&script_url),
        };
        let scope_str = scope.to_string();

        self.registrations
            .write()
            .await
            .entry(scope_str.clone())
            .or_insert_with(|| ServiceWorkerRegistration::new(scope));

        let _ = self.event_tx.send(ServiceWorkerEvent::UpdateFound {
            registration_scope: scope_str.clone(),
        });

        let result = retry_with_backoff(&config.install_retry, || {
            let script_url = script_url.clone();
            let config = config.clone();
            let scope_str = scope_str.clone();
            async move { self.install_attempt(&scope_str, script_url, config).await }
        })
        .await;

        let agent = match result {
            Ok(agent) => agent,
            Err(e) => {
                self.drop_if_empty(&scope_str).await;
                return Err(e);
            }
        };

        let previous = {
            let mut registrations = self.registrations.write().await;
            let registration = registrations
                .get_mut(&scope_str)
                .ok_or_else(|| ServiceWorkerError::NotFound(scope_str.clone()))?;
            registration.installing = None;
            registration.waiting.replace(Arc::clone(&agent))
        };
        if let Some(previous) = previous {
            self.retire(&scope_str, &previous).await;
        }

        Ok((scope_str, agent))
    }

    async fn install_attempt(
        &self,
        scope: &str,
        script_url: Url,
        config: AgentConfig,
    ) -> Result<Arc<OfflineAgent>> {
        let agent = Arc::new(OfflineAgent::new(
            script_url,
            config,
            Arc::clone(&self.caches),
            Arc::clone(&self.clients),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.notifier),
        )?);

        if let Some(registration) = self.registrations.write().await.get_mut(scope) {
            registration.installing = Some(Arc::clone(&agent));
        }

        let result = agent.handle_install().await;
        self.emit_state(scope, &agent).await;

        if result.is_err() {
            if let Some(registration) = self.registrations.write().await.get_mut(scope) {
                registration.installing = None;
            }
        }
        result.map(|()| agent)
    }

    /// Forget a registration that never got a worker.
    async fn drop_if_empty(&self, scope: &str) {
        let mut registrations = self.registrations.write().await;
        let empty = registrations.get(scope).is_some_and(|r| {
            r.installing.is_none() && r.waiting.is_none() && r.active.is_none()
        });
        if empty {
            registrations.remove(scope);
            debug!(scope, "Dropped registration with no worker");
        }
    }

    /// Activate the waiting worker of a scope, retiring the previous active one.
    pub async fn activate(&self, scope: &str) -> Result<ActivationReport> {
        let (agent, previous) = {
            let mut registrations = self.registrations.write().await;
            let registration = registrations
                .get_mut(scope)
                .ok_or_else(|| ServiceWorkerError::NotFound(scope.to_string()))?;
            let agent = registration.waiting.take().ok_or_else(|| {
                ServiceWorkerError::StateError(format!("no waiting worker for {scope}"))
            })?;
            (agent, registration.active.take())
        };

        if let Some(previous) = previous {
            self.retire(scope, &previous).await;
        }

        let report = agent.handle_activate().await?;
        self.emit_state(scope, &agent).await;

        for client_id in &report.claimed {
            let _ = self.event_tx.send(ServiceWorkerEvent::ControllerChange {
                client_id: client_id.clone(),
                worker_id: agent.id(),
            });
        }

        if let Some(registration) = self.registrations.write().await.get_mut(scope) {
            registration.active = Some(agent);
        }
        Ok(report)
    }

    async fn retire(&self, scope: &str, agent: &OfflineAgent) {
        agent.settle().await;
        if let Err(e) = agent.retire().await {
            warn!(worker = %agent.id(), error = %e, "Could not retire worker");
        }
        self.emit_state(scope, agent).await;
    }

    async fn emit_state(&self, scope: &str, agent: &OfflineAgent) {
        let _ = self.event_tx.send(ServiceWorkerEvent::StateChange {
            registration_scope: scope.to_string(),
            worker_id: agent.id(),
            new_state: agent.state().await,
        });
    }

    /// Get the scope of the registration covering a URL (longest scope wins).
    pub async fn get_registration(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let registrations = self.registrations.read().await;

        registrations
            .iter()
            .filter(|(_, registration)| registration.covers(&url))
            .max_by_key(|(scope, _)| scope.len())
            .map(|(scope, _)| scope.clone())
    }

    /// Get all registrations.
    pub async fn get_registrations(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self.registrations.read().await.keys().cloned().collect();
        scopes.sort();
        scopes
    }

    pub async fn active(&self, scope: &str) -> Option<Arc<OfflineAgent>> {
        self.registrations
            .read()
            .await
            .get(scope)
            .and_then(|r| r.active.clone())
    }

    pub async fn waiting(&self, scope: &str) -> Option<Arc<OfflineAgent>> {
        self.registrations
            .read()
            .await
            .get(scope)
            .and_then(|r| r.waiting.clone())
    }

    /// Active worker responsible for a fetch.
    ///
    /// A controlled client's requests go to its controller; otherwise the
    /// registration whose scope covers the URL.
    async fn controller_for(&self, event: &FetchEvent) -> Option<Arc<OfflineAgent>> {
        let controller = match &event.client_id {
            Some(id) => self.clients.read().await.get(id).and_then(|c| c.controller),
            None => None,
        };

        let registrations = self.registrations.read().await;
        if let Some(controller) = controller {
            let agent = registrations
                .values()
                .filter_map(|r| r.active.as_ref())
                .find(|a| a.id() == controller);
            if let Some(agent) = agent {
                return Some(Arc::clone(agent));
            }
        }

        registrations
            .values()
            .filter(|r| r.covers(&event.request.url))
            .max_by_key(|r| r.scope.as_str().len())
            .and_then(|r| r.active.clone())
    }

    /// Handle fetch event.
    pub async fn fetch(&self, event: FetchEvent) -> Result<FetchOutcome> {
        match self.controller_for(&event).await {
            Some(agent) => agent.handle_fetch(event).await,
            None => {
                debug!(url = %event.request.url, "No controlling worker");
                Ok(FetchOutcome::Passthrough)
            }
        }
    }

    /// Deliver a page message to the scope's waiting worker, or the active one.
    ///
    /// Returns the activation report when the message promoted a waiting worker.
    pub async fn post_message(
        &self,
        scope: &str,
        message: ClientMessage,
    ) -> Result<Option<ActivationReport>> {
        if let Some(waiting) = self.waiting(scope).await {
            waiting.handle_message(&message);
            if waiting.skip_waiting_requested() {
                info!(worker = %waiting.id(), "Promoting waiting worker");
                return self.activate(scope).await.map(Some);
            }
            return Ok(None);
        }

        let active = self
            .active(scope)
            .await
            .ok_or_else(|| ServiceWorkerError::NotFound(format!("worker for {scope}")))?;
        active.handle_message(&message);
        Ok(None)
    }

    /// Deliver a push message to the scope's active worker.
    pub async fn push(&self, scope: &str, event: &PushEvent) -> Result<Option<Notification>> {
        let agent = self
            .active(scope)
            .await
            .ok_or_else(|| ServiceWorkerError::NotFound(format!("active worker for {scope}")))?;
        Ok(agent.handle_push(event).await)
    }

    pub async fn notification_click(&self, scope: &str, notification: &Notification) -> Result<Client> {
        let agent = self
            .active(scope)
            .await
            .ok_or_else(|| ServiceWorkerError::NotFound(format!("active worker for {scope}")))?;
        Ok(agent.handle_notification_click(notification).await)
    }

    /// Unregister a service worker.
    pub async fn unregister(&self, scope: &str) -> Result<bool> {
        let registration = self.registrations.write().await.remove(scope);
        let Some(registration) = registration else {
            return Ok(false);
        };

        for agent in [registration.installing, registration.waiting, registration.active]
            .into_iter()
            .flatten()
        {
            self.retire(scope, &agent).await;
        }
        info!(scope, "Unregistered");
        Ok(true)
    }

    /// Wait for background cache writes of every active worker.
    pub async fn settle(&self) {
        let agents: Vec<Arc<OfflineAgent>> = self
            .registrations
            .read()
            .await
            .values()
            .filter_map(|r| r.active.clone())
            .collect();

        for agent in agents {
            agent.settle().await;
        }
    }
}

/// Directory of the script, with a trailing slash.
fn default_scope(script_url: &Url) -> Url {
    let mut scope = script_url.clone();
    let dir = script_url
        .path()
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("");
    scope.set_path(&format!("{dir}/"));
    scope.set_query(None);
    scope.set_fragment(None);
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::ResponseSource;
    use crate::manifest::AssetManifest;
    use crate::testing::{MockFetcher, RecordingNotifier};
    use skindiary_common::RetryConfig;
    use skindiary_net::Request;
    use std::time::Duration;

    const ORIGIN: &str = "http://localhost:5000/";
    const SCRIPT: &str = "http://localhost:5000/service-worker.js";

    fn origin() -> Url {
        Url::parse(ORIGIN).unwrap()
    }

    fn url(path: &str) -> Url {
        origin().join(path).unwrap()
    }

    fn config() -> AgentConfig {
        AgentConfig {
            install_retry: RetryConfig::none(),
            ..AgentConfig::for_origin(origin())
        }
    }

    fn container(
        fetcher: Arc<MockFetcher>,
    ) -> (ServiceWorkerContainer, mpsc::UnboundedReceiver<ServiceWorkerEvent>) {
        ServiceWorkerContainer::new(fetcher, Arc::new(RecordingNotifier::default()))
    }

    fn serving_fetcher() -> Arc<MockFetcher> {
        Arc::new(MockFetcher::new().serving_manifest(&origin(), &AssetManifest::skindiary()))
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ServiceWorkerEvent>) -> Vec<ServiceWorkerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_default_scope() {
        let scope = default_scope(&Url::parse(SCRIPT).unwrap());
        assert_eq!(scope.as_str(), ORIGIN);

        let nested = default_scope(&Url::parse("http://localhost:5000/static/sw.js?v=2").unwrap());
        assert_eq!(nested.as_str(), "http://localhost:5000/static/");
    }

    #[tokio::test]
    async fn test_register_installs_and_activates() {
        let (container, mut rx) = container(serving_fetcher());

        let scope = container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();
        assert_eq!(scope, ORIGIN);
        assert_eq!(container.get_registrations().await, vec![ORIGIN.to_string()]);

        let active = container.active(&scope).await.unwrap();
        assert_eq!(active.state().await, ServiceWorkerState::Activated);
        assert!(container.waiting(&scope).await.is_none());

        let events = drain(&mut rx);
        assert_eq!(
            events[0],
            ServiceWorkerEvent::UpdateFound {
                registration_scope: ORIGIN.to_string()
            }
        );
        assert!(events.contains(&ServiceWorkerEvent::StateChange {
            registration_scope: ORIGIN.to_string(),
            worker_id: active.id(),
            new_state: ServiceWorkerState::Activated,
        }));
    }

    #[tokio::test]
    async fn test_register_rejects_foreign_script() {
        let (container, _rx) = container(serving_fetcher());

        let result = container
            .register(
                "https://evil.example/service-worker.js",
                config(),
                RegistrationOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(ServiceWorkerError::RegistrationFailed(_))));
        assert!(container.get_registrations().await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_install_leaves_no_worker() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_offline(true);
        let (container, mut rx) = container(fetcher);

        let result = container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await;
        assert!(matches!(result, Err(ServiceWorkerError::InstallFailed(_))));
        assert!(container.active(ORIGIN).await.is_none());
        assert!(container.waiting(ORIGIN).await.is_none());
        assert!(container.caches().read().await.keys().is_empty());
        assert!(container.get_registrations().await.is_empty());
        assert!(container.get_registration(ORIGIN).await.is_none());

        let redundant = drain(&mut rx).into_iter().any(|e| {
            matches!(
                e,
                ServiceWorkerEvent::StateChange {
                    new_state: ServiceWorkerState::Redundant,
                    ..
                }
            )
        });
        assert!(redundant);
    }

    #[tokio::test]
    async fn test_install_retries_with_fresh_worker() {
        let fetcher = serving_fetcher();
        fetcher.set_offline(true);
        let (container, mut rx) = container(fetcher.clone());

        let config = AgentConfig {
            install_retry: RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(300),
                jitter: false,
                ..Default::default()
            },
            ..config()
        };

        let reconnect = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                fetcher.set_offline(false);
            })
        };

        container
            .register(SCRIPT, config, RegistrationOptions::default())
            .await
            .unwrap();
        reconnect.await.unwrap();

        let active = container.active(ORIGIN).await.unwrap();
        let failed: Vec<ServiceWorkerId> = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                ServiceWorkerEvent::StateChange {
                    worker_id,
                    new_state: ServiceWorkerState::Redundant,
                    ..
                } => Some(worker_id),
                _ => None,
            })
            .collect();
        assert_eq!(failed.len(), 1);
        assert_ne!(failed[0], active.id());
    }

    #[tokio::test]
    async fn test_upgrade_deletes_old_bucket() {
        let fetcher = serving_fetcher();
        let (container, mut rx) = container(fetcher);
        container.clients().write().await.add(Client::window(origin()));

        let v0 = AgentConfig {
            cache_name: "skindiary-v0".to_string(),
            ..config()
        };
        container
            .register(SCRIPT, v0, RegistrationOptions::default())
            .await
            .unwrap();
        let old = container.active(ORIGIN).await.unwrap();
        assert_eq!(container.caches().read().await.keys(), vec!["skindiary-v0"]);
        drain(&mut rx);

        container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();
        let new = container.active(ORIGIN).await.unwrap();

        assert_ne!(old.id(), new.id());
        assert!(old.state().await.is_redundant());
        assert_eq!(container.caches().read().await.keys(), vec!["skindiary-v1"]);

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            ServiceWorkerEvent::ControllerChange { worker_id, .. } if *worker_id == new.id()
        )));
    }

    #[tokio::test]
    async fn test_fetch_routes_to_controller() {
        let fetcher = serving_fetcher();
        let (container, _rx) = container(fetcher.clone());
        let client = Client::window(origin());
        let client_id = client.id.clone();
        container.clients().write().await.add(client);

        container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();
        fetcher.clear_calls();

        let cdn = Url::parse("https://cdn.jsdelivr.net/npm/bootstrap@5.1.3/dist/js/bootstrap.bundle.min.js")
            .unwrap();
        let outcome = container
            .fetch(FetchEvent::new(Request::get(cdn.clone())).from_client(&client_id))
            .await
            .unwrap();
        assert_eq!(outcome.response().unwrap().source, ResponseSource::Cache);

        // no client: cross-origin URL is outside every scope
        let outcome = container.fetch(FetchEvent::new(Request::get(cdn))).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_without_registration_passes_through() {
        let (container, _rx) = container(serving_fetcher());
        let outcome = container
            .fetch(FetchEvent::new(Request::navigate(url("/"))))
            .await
            .unwrap();
        assert_eq!(outcome, FetchOutcome::Passthrough);
    }

    #[tokio::test]
    async fn test_offline_end_to_end() {
        let chart = url("/static/js/chart.js");
        let fetcher = Arc::new(
            MockFetcher::new()
                .serving_manifest(&origin(), &AssetManifest::skindiary())
                .with_route(chart.as_str(), 200, b"chart"),
        );
        let (container, _rx) = container(fetcher.clone());
        container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();

        // online miss is written through
        let online = container
            .fetch(FetchEvent::new(Request::get(chart.clone())))
            .await
            .unwrap();
        assert_eq!(online.response().unwrap().source, ResponseSource::Network);
        container.settle().await;

        fetcher.set_offline(true);

        let nav = container
            .fetch(FetchEvent::new(Request::navigate(url("/history"))))
            .await
            .unwrap();
        assert_eq!(nav.response().unwrap().body, b"/static/offline.html".to_vec());

        let asset = container
            .fetch(FetchEvent::new(Request::get(chart)))
            .await
            .unwrap();
        assert_eq!(asset.response().unwrap().source, ResponseSource::Cache);
        assert_eq!(asset.response().unwrap().text(), "chart");

        let image = container
            .fetch(FetchEvent::new(Request::get(url("/uploads/photo.jpeg"))))
            .await
            .unwrap();
        assert_eq!(image.response().unwrap().status, 503);
        assert_eq!(image.response().unwrap().text(), "Image not available offline");
    }

    #[tokio::test]
    async fn test_skip_waiting_message_promotes_waiting_worker() {
        let (container, _rx) = container(serving_fetcher());
        container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();
        let first = container.active(ORIGIN).await.unwrap();

        let (scope, waiting) = container
            .install(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();
        assert_eq!(waiting.state().await, ServiceWorkerState::Installed);
        assert_eq!(container.active(&scope).await.unwrap().id(), first.id());

        let report = container
            .post_message(&scope, ClientMessage::SkipWaiting)
            .await
            .unwrap();
        assert!(report.is_some());
        assert_eq!(container.active(&scope).await.unwrap().id(), waiting.id());
        assert!(first.state().await.is_redundant());
    }

    #[tokio::test]
    async fn test_push_and_click_through_container() {
        let (container, _rx) = container(serving_fetcher());
        let scope = container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();

        let notification = container
            .push(&scope, &PushEvent::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notification.body, "New update from Skin Diary");

        let client = container.notification_click(&scope, &notification).await.unwrap();
        assert_eq!(client.url, origin());

        let again = container.notification_click(&scope, &notification).await.unwrap();
        assert_eq!(again.id, client.id);
    }

    #[tokio::test]
    async fn test_unregister() {
        let (container, _rx) = container(serving_fetcher());
        let scope = container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();
        let active = container.active(&scope).await.unwrap();

        assert!(container.unregister(&scope).await.unwrap());
        assert!(!container.unregister(&scope).await.unwrap());
        assert!(active.state().await.is_redundant());
        assert!(container.get_registrations().await.is_empty());
    }

    #[tokio::test]
    async fn test_get_registration_longest_scope() {
        let (container, _rx) = container(serving_fetcher());
        container
            .register(SCRIPT, config(), RegistrationOptions::default())
            .await
            .unwrap();
        container
            .register(
                SCRIPT,
                config(),
                RegistrationOptions {
                    scope: Some("/history/".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(
            container.get_registration("http://localhost:5000/history/2024").await,
            Some("http://localhost:5000/history/".to_string())
        );
        assert_eq!(
            container.get_registration("http://localhost:5000/static/js/app.js").await,
            Some(ORIGIN.to_string())
        );
        assert_eq!(container.get_registration("https://other.example/").await, None);
    }
}
