//! One-time signal that promotes a waiting worker.

use skindiary_sw::{ActivationReport, ClientMessage, ServiceWorkerContainer};

use crate::{ShellError, ShellResult};

/// Sends `SKIP_WAITING` to the registration at most once per page.
#[derive(Debug, Default)]
pub struct UpdateSignal {
    sent: bool,
}

impl UpdateSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    /// Post the signal; returns the activation report if a waiting worker took over.
    pub async fn send(
        &mut self,
        container: &ServiceWorkerContainer,
        scope: &str,
    ) -> ShellResult<Option<ActivationReport>> {
        if self.sent {
            return Err(ShellError::UpdateAlreadySent);
        }
        self.sent = true;

        let report = container
            .post_message(scope, ClientMessage::SkipWaiting)
            .await?;
        if report.is_some() {
            log::info!("New version activated for {}", scope);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{config, EchoFetcher, ORIGIN};
    use skindiary_sw::{LogNotifier, RegistrationOptions};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_signal_promotes_waiting_worker_once() {
        let (container, _rx) =
            ServiceWorkerContainer::new(Arc::new(EchoFetcher), Arc::new(LogNotifier));
        let script = "http://localhost:5000/service-worker.js";
        container
            .register(script, config(), RegistrationOptions::default())
            .await
            .unwrap();
        let (_, waiting) = container
            .install(script, config(), RegistrationOptions::default())
            .await
            .unwrap();

        let mut signal = UpdateSignal::new();
        let report = signal.send(&container, ORIGIN).await.unwrap();
        assert!(report.is_some());
        assert_eq!(container.active(ORIGIN).await.unwrap().id(), waiting.id());

        assert!(matches!(
            signal.send(&container, ORIGIN).await,
            Err(ShellError::UpdateAlreadySent)
        ));
    }

    #[tokio::test]
    async fn test_signal_without_registration() {
        let (container, _rx) =
            ServiceWorkerContainer::new(Arc::new(EchoFetcher), Arc::new(LogNotifier));
        let mut signal = UpdateSignal::new();

        assert!(matches!(
            signal.send(&container, ORIGIN).await,
            Err(ShellError::Worker(_))
        ));
        assert!(signal.is_sent());
    }
}
