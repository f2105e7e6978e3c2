//! Page shell - install prompt, connectivity indicator, upload form, worker updates

pub mod prompt;
pub mod status;
pub mod update;
pub mod upload;

use serde::Serialize;
use skindiary_sw::{AgentConfig, RegistrationOptions, ServiceWorkerContainer, ServiceWorkerError};
use thiserror::Error;
use url::Url;

pub use prompt::{DeferredPrompt, InstallPrompt, PromptOutcome, PromptState};
pub use status::{Connectivity, OnlineStatus};
pub use update::UpdateSignal;
pub use upload::{ImagePreview, SelectedFile, UploadForm};

/// Path the agent script is served from.
pub const SERVICE_WORKER_PATH: &str = "/service-worker.js";

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("Please select an image file (JPG or PNG)")]
    NotAnImage(String),

    #[error("No install prompt is available")]
    PromptUnavailable,

    #[error("Update signal already sent")]
    UpdateAlreadySent,

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Worker(#[from] ServiceWorkerError),
}

pub type ShellResult<T> = std::result::Result<T, ShellError>;

/// Pages the shell navigates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Page {
    Upload,
    History,
}

impl Page {
    pub fn path(&self) -> &'static str {
        match self {
            Page::Upload => "/",
            Page::History => "/history",
        }
    }
}

/// Page-side state for one open document.
pub struct PageShell {
    origin: Url,
    pub prompt: InstallPrompt,
    pub status: OnlineStatus,
    pub upload: UploadForm,
    pub update: UpdateSignal,
}

impl PageShell {
    pub fn new(origin: Url, connectivity: Connectivity) -> Self {
        log::info!("Initializing page shell for {}", origin);

        Self {
            origin,
            prompt: InstallPrompt::new(),
            status: OnlineStatus::new(connectivity),
            upload: UploadForm::new(),
            update: UpdateSignal::new(),
        }
    }

    /// Register the offline agent on page load.
    ///
    /// Registration failure is logged; the page keeps working online.
    pub async fn register_worker(
        &self,
        container: &ServiceWorkerContainer,
        config: AgentConfig,
    ) -> Option<String> {
        let script_url = match self.origin.join(SERVICE_WORKER_PATH) {
            Ok(url) => url,
            Err(e) => {
                log::warn!("ServiceWorker registration failed: {}", e);
                return None;
            }
        };

        match container
            .register(script_url.as_str(), config, RegistrationOptions::default())
            .await
        {
            Ok(scope) => {
                log::info!("ServiceWorker registration successful with scope: {}", scope);
                Some(scope)
            }
            Err(e) => {
                log::warn!("ServiceWorker registration failed: {}", e);
                None
            }
        }
    }

    /// Where a navigation button leads.
    pub fn navigate(&self, page: Page) -> ShellResult<Url> {
        let target = self.origin.join(page.path())?;
        log::debug!("Navigating to {}", target);
        Ok(target)
    }
}
