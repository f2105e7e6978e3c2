//! Scripted network and notification surfaces for tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use hashbrown::HashMap;
use http::StatusCode;
use skindiary_net::{Fetcher, NetError, Request, Response};
use url::Url;

use crate::manifest::AssetManifest;
use crate::notification::{Notification, Notifier};
use crate::{Result, ServiceWorkerError};

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    body: Vec<u8>,
    delay: Option<Duration>,
}

/// Network that answers from a fixed route table.
///
/// Unknown URLs get a 404. When offline every request fails.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    routes: Mutex<HashMap<String, Route>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, url: &str, status: u16, body: &[u8]) -> Self {
        self.insert(url, status, body, None);
        self
    }

    pub fn with_slow_route(self, url: &str, delay: Duration) -> Self {
        self.insert(url, 200, b"slow", Some(delay));
        self
    }

    /// Serve every manifest entry with its own path as the body.
    pub fn serving_manifest(self, origin: &Url, manifest: &AssetManifest) -> Self {
        for (entry, url) in manifest.entries().iter().zip(manifest.resolve(origin).unwrap()) {
            self.insert(url.as_str(), 200, entry.as_bytes(), None);
        }
        self
    }

    fn insert(&self, url: &str, status: u16, body: &[u8], delay: Option<Duration>) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route {
                status: StatusCode::from_u16(status).unwrap(),
                body: body.to_vec(),
                delay,
            },
        );
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, NetError> {
        self.calls.lock().unwrap().push(request.url.to_string());

        if self.offline.load(Ordering::SeqCst) {
            return Err(NetError::Offline(request.url.to_string()));
        }

        let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        match route {
            Some(route) => {
                if let Some(delay) = route.delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(Response::new(request.url.clone(), route.status, route.body))
            }
            None => Ok(Response::new(
                request.url.clone(),
                StatusCode::NOT_FOUND,
                Vec::new(),
            )),
        }
    }
}

/// Notifier that records what it was asked to do.
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    fail: bool,
    shown: tokio::sync::Mutex<Vec<Notification>>,
    closed: tokio::sync::Mutex<Vec<u64>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub async fn shown(&self) -> Vec<Notification> {
        self.shown.lock().await.clone()
    }

    pub async fn closed(&self) -> Vec<u64> {
        self.closed.lock().await.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        if self.fail {
            return Err(ServiceWorkerError::NotificationError(
                "permission denied".to_string(),
            ));
        }
        self.shown.lock().await.push(notification.clone());
        Ok(())
    }

    async fn close(&self, id: u64) -> Result<()> {
        self.closed.lock().await.push(id);
        Ok(())
    }
}
