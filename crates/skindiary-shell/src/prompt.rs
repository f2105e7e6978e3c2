//! Install-app prompt.
//!
//! The platform hands over a deferred prompt at most once per capability
//! event. The shell keeps it in a single slot and shows the install button
//! only while the slot is armed.

use std::fmt;

use serde::Serialize;

use crate::{ShellError, ShellResult};

/// Label of the install button.
pub const INSTALL_BUTTON_LABEL: &str = "Install MySkinAge App";

/// Platform prompt captured from the capability event.
pub trait DeferredPrompt: Send {
    /// Show the platform dialog. The handle cannot be reused.
    fn prompt(self: Box<Self>);
}

/// The user's answer to the platform dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PromptOutcome {
    Accepted,
    Dismissed,
}

/// Observable slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PromptState {
    Empty,
    Armed,
    /// Dialog shown, waiting for the user's choice.
    Consumed,
}

enum Slot {
    Empty,
    Armed(Box<dyn DeferredPrompt>),
    Consumed,
}

/// Single-slot install prompt.
pub struct InstallPrompt {
    slot: Slot,
}

impl InstallPrompt {
    pub fn new() -> Self {
        Self { slot: Slot::Empty }
    }

    pub fn state(&self) -> PromptState {
        match self.slot {
            Slot::Empty => PromptState::Empty,
            Slot::Armed(_) => PromptState::Armed,
            Slot::Consumed => PromptState::Consumed,
        }
    }

    /// Whether the install button is shown.
    pub fn is_available(&self) -> bool {
        matches!(self.slot, Slot::Armed(_))
    }

    /// Capability event: stash the prompt, replacing any earlier one.
    pub fn arm(&mut self, prompt: Box<dyn DeferredPrompt>) {
        if matches!(self.slot, Slot::Armed(_)) {
            log::debug!("Replacing armed install prompt");
        }
        self.slot = Slot::Armed(prompt);
        log::info!("Install prompt available");
    }

    /// Install button clicked: hide the button and show the dialog once.
    pub fn click(&mut self) -> ShellResult<()> {
        match std::mem::replace(&mut self.slot, Slot::Consumed) {
            Slot::Armed(prompt) => {
                prompt.prompt();
                Ok(())
            }
            previous => {
                self.slot = previous;
                Err(ShellError::PromptUnavailable)
            }
        }
    }

    /// The user answered; the prompt is discarded either way.
    pub fn resolve(&mut self, outcome: PromptOutcome) -> PromptOutcome {
        match outcome {
            PromptOutcome::Accepted => log::info!("User accepted the install prompt"),
            PromptOutcome::Dismissed => log::info!("User dismissed the install prompt"),
        }
        // a capability event may have re-armed the slot while the dialog was open
        if matches!(self.slot, Slot::Consumed) {
            self.slot = Slot::Empty;
        }
        outcome
    }
}

impl Default for InstallPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InstallPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallPrompt")
            .field("state", &self.state())
            .finish()
    }
}
