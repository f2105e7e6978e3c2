//! Push notifications and click routing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use url::Url;

use crate::clients::{Client, Clients};
use crate::config::NotificationConfig;
use crate::lifecycle::ServiceWorkerId;
use crate::Result;

/// A push message delivered to the agent.
#[derive(Debug, Clone, Default)]
pub struct PushEvent {
    pub data: Option<Vec<u8>>,
}

impl PushEvent {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    /// Payload as text; empty when there is no payload.
    pub fn text(&self) -> String {
        self.data
            .as_deref()
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .unwrap_or_default()
    }
}

/// A system notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
}

/// Platform notification surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<()>;

    async fn close(&self, id: u64) -> Result<()>;
}

/// Notifier that only writes to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn show(&self, notification: &Notification) -> Result<()> {
        info!(
            id = notification.id,
            title = %notification.title,
            body = %notification.body,
            "Notification shown"
        );
        Ok(())
    }

    async fn close(&self, id: u64) -> Result<()> {
        info!(id, "Notification closed");
        Ok(())
    }
}

/// Builds notifications from push events and routes clicks.
pub struct NotificationHandler {
    config: NotificationConfig,
    click_url: Url,
    notifier: Arc<dyn Notifier>,
}

impl NotificationHandler {
    pub fn new(config: NotificationConfig, click_url: Url, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            click_url,
            notifier,
        }
    }

    /// Notification for a push event; empty payloads get the default body.
    pub fn build(&self, event: &PushEvent) -> Notification {
        static COUNTER: AtomicU64 = AtomicU64::new(1);

        let text = event.text();
        let body = if text.is_empty() {
            self.config.default_body.clone()
        } else {
            text
        };

        Notification {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            title: self.config.title.clone(),
            body,
            icon: self.config.icon.clone(),
            badge: self.config.badge.clone(),
        }
    }

    /// Show a notification for `event`.
    ///
    /// Display failures are logged and not propagated.
    pub async fn on_push(&self, event: &PushEvent) -> Option<Notification> {
        let notification = self.build(event);
        match self.notifier.show(&notification).await {
            Ok(()) => Some(notification),
            Err(e) => {
                error!(error = %e, title = %notification.title, "Failed to show notification");
                None
            }
        }
    }

    /// Close the notification and bring the app root to the front.
    pub async fn on_click(
        &self,
        notification: &Notification,
        clients: &RwLock<Clients>,
        controller: ServiceWorkerId,
    ) -> Client {
        if let Err(e) = self.notifier.close(notification.id).await {
            warn!(error = %e, id = notification.id, "Failed to close notification");
        }

        let client = clients
            .write()
            .await
            .open_or_focus(self.click_url.clone(), Some(controller));
        info!(client = %client.id, url = %client.url, "Notification click routed");
        client
    }
}
