//! Online/offline indicator.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Tracks connectivity and the visibility of the offline indicator.
#[derive(Debug, Clone)]
pub struct OnlineStatus {
    connectivity: Connectivity,
    indicator_visible: bool,
}

impl OnlineStatus {
    /// Status checked at page load.
    pub fn new(connectivity: Connectivity) -> Self {
        let mut status = Self {
            connectivity,
            indicator_visible: false,
        };
        status.update(connectivity);
        status
    }

    pub fn connectivity(&self) -> Connectivity {
        self.connectivity
    }

    /// Whether the offline indicator is shown.
    pub fn indicator_visible(&self) -> bool {
        self.indicator_visible
    }

    /// Apply an `online` or `offline` event.
    pub fn update(&mut self, connectivity: Connectivity) {
        if connectivity != self.connectivity {
            log::info!("Connectivity changed to {:?}", connectivity);
        }
        self.connectivity = connectivity;
        self.indicator_visible = connectivity == Connectivity::Offline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert!(!OnlineStatus::new(Connectivity::Online).indicator_visible());
        assert!(OnlineStatus::new(Connectivity::Offline).indicator_visible());
    }

    #[test]
    fn test_toggle() {
        let mut status = OnlineStatus::new(Connectivity::Online);

        status.update(Connectivity::Offline);
        assert!(status.indicator_visible());
        assert_eq!(status.connectivity(), Connectivity::Offline);

        status.update(Connectivity::Online);
        assert!(!status.indicator_visible());
    }
}
