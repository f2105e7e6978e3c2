//! Worker lifecycle state machine.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::{Result, ServiceWorkerError};

/// Unique identifier for a service worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceWorkerId(u64);

impl ServiceWorkerId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ServiceWorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sw-{}", self.0)
    }
}

/// Service worker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ServiceWorkerState {
    /// Script evaluated, not yet installed.
    #[default]
    Parsed,
    /// Priming the cache (install event).
    Installing,
    /// Installed, waiting to become active.
    Installed,
    /// Running activation GC and claiming clients.
    Activating,
    /// Active and controlling pages.
    Activated,
    /// Install failed or replaced by a newer worker.
    Redundant,
}

/// Named lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    StartInstall,
    InstallSucceeded,
    InstallFailed,
    StartActivate,
    ActivateSucceeded,
    /// A newer worker took over, or the registration went away.
    Retire,
}

impl ServiceWorkerState {
    /// Apply a transition, rejecting anything out of order.
    pub fn next(self, transition: LifecycleTransition) -> Result<Self> {
        use LifecycleTransition as T;
        use ServiceWorkerState as S;

        match (self, transition) {
            (S::Parsed, T::StartInstall) => Ok(S::Installing),
            (S::Installing, T::InstallSucceeded) => Ok(S::Installed),
            (S::Installing, T::InstallFailed) => Ok(S::Redundant),
            (S::Installed, T::StartActivate) => Ok(S::Activating),
            (S::Activating, T::ActivateSucceeded) => Ok(S::Activated),
            (state, T::Retire) if state != S::Redundant => Ok(S::Redundant),
            (state, transition) => Err(ServiceWorkerError::StateError(format!(
                "cannot apply {transition:?} in state {state:?}"
            ))),
        }
    }

    pub fn is_active(&self) -> bool {
        *self == Self::Activated
    }

    pub fn is_redundant(&self) -> bool {
        *self == Self::Redundant
    }
}
