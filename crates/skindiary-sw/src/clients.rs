//! Clients API: pages the agent may control.

use std::sync::atomic::{AtomicU64, Ordering};

use hashbrown::HashMap;
use tracing::debug;
use url::Url;

use crate::lifecycle::ServiceWorkerId;
use crate::{Result, ServiceWorkerError};

/// A client (open page or worker).
#[derive(Debug, Clone)]
pub struct Client {
    /// Client ID.
    pub id: String,

    /// Client URL.
    pub url: Url,

    /// Client type.
    pub client_type: ClientType,

    /// Whether focused.
    pub focused: bool,

    /// Worker controlling this client, if any.
    pub controller: Option<ServiceWorkerId>,
}

/// Client type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientType {
    #[default]
    Window,
    Worker,
    All,
}

impl Client {
    /// A new, uncontrolled window client.
    pub fn window(url: Url) -> Self {
        Self {
            id: next_client_id(),
            url,
            client_type: ClientType::Window,
            focused: false,
            controller: None,
        }
    }

    pub fn is_controlled(&self) -> bool {
        self.controller.is_some()
    }
}

/// Clients API.
#[derive(Debug, Default)]
pub struct Clients {
    clients: HashMap<String, Client>,
}

impl Clients {
    /// Create new clients manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a client by ID.
    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    /// Add a client.
    pub fn add(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    /// Remove a client (page closed).
    pub fn remove(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    /// Match clients of a type.
    pub fn match_all(&self, client_type: ClientType, include_uncontrolled: bool) -> Vec<&Client> {
        self.clients
            .values()
            .filter(|c| include_uncontrolled || c.is_controlled())
            .filter(|c| client_type == ClientType::All || c.client_type == client_type)
            .collect()
    }

    /// Take control of every client not already controlled by `worker`.
    ///
    /// Returns the IDs whose controller changed.
    pub fn claim(&mut self, worker: ServiceWorkerId) -> Vec<String> {
        let mut changed: Vec<String> = self
            .clients
            .values_mut()
            .filter(|c| c.controller != Some(worker))
            .map(|c| {
                c.controller = Some(worker);
                c.id.clone()
            })
            .collect();
        changed.sort();
        debug!(%worker, claimed = changed.len(), "Claimed clients");
        changed
    }

    /// Focus a window client.
    pub fn focus(&mut self, id: &str) -> Result<Client> {
        let client = self
            .clients
            .get_mut(id)
            .ok_or_else(|| ServiceWorkerError::NotFound(format!("client {id}")))?;

        if client.client_type != ClientType::Window {
            return Err(ServiceWorkerError::StateError(
                "Can only focus window clients".to_string(),
            ));
        }
        client.focused = true;
        let focused = client.clone();

        for other in self.clients.values_mut().filter(|c| c.id != id) {
            other.focused = false;
        }
        Ok(focused)
    }

    /// Open a new focused window controlled by `controller`.
    pub fn open_window(&mut self, url: Url, controller: Option<ServiceWorkerId>) -> Client {
        for other in self.clients.values_mut() {
            other.focused = false;
        }

        let mut client = Client::window(url);
        client.controller = controller;
        client.focused = true;
        self.add(client.clone());
        client
    }

    /// Focus a window already showing `url`, or open one.
    pub fn open_or_focus(&mut self, url: Url, controller: Option<ServiceWorkerId>) -> Client {
        let existing = self
            .clients
            .values()
            .find(|c| c.client_type == ClientType::Window && c.url == url)
            .map(|c| c.id.clone());

        match existing.map(|id| self.focus(&id)) {
            Some(Ok(client)) => client,
            _ => self.open_window(url, controller),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn next_client_id() -> String {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("client-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
