//! Gateway readiness as seen by a page: query the health route once on mount
//! and decide whether the "missing key" warning is shown.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tracing::debug;

use crate::das::DasClient;
use crate::models::health::HealthReport;

pub const MISSING_KEY_TITLE: &str = "Helius API key missing";
pub const MISSING_KEY_BODY: &str = "This app needs a Helius API key to load compressed NFTs. \
     Add PUBLIC_HELIUS_API_KEY to your environment or set it in your deployment settings.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayStatus {
    /// Check still in flight.
    Unknown,
    Ready,
    MissingKey,
}

impl GatewayStatus {
    /// The warning stays up until the gateway has confirmed a usable key.
    pub fn shows_warning(self) -> bool {
        self != GatewayStatus::Ready
    }
}

impl From<&HealthReport> for GatewayStatus {
    fn from(report: &HealthReport) -> Self {
        if report.ok {
            GatewayStatus::Ready
        } else {
            GatewayStatus::MissingKey
        }
    }
}

/// One health check tied to a mounted view. Dropping the watch unmounts it:
/// a check that resolves afterwards is discarded, but the request itself is
/// left to finish.
pub struct HealthWatch {
    status: watch::Receiver<GatewayStatus>,
    mounted: Arc<AtomicBool>,
}

impl HealthWatch {
    pub fn mount(client: DasClient) -> Self {
        Self::mount_with(async move { client.gateway_health().await })
    }

    pub fn mount_with<F>(check: F) -> Self
    where
        F: Future<Output = HealthReport> + Send + 'static,
    {
        let (tx, rx) = watch::channel(GatewayStatus::Unknown);
        let mounted = Arc::new(AtomicBool::new(true));
        let guard = Arc::clone(&mounted);

        tokio::spawn(async move {
            let report = check.await;
            if !guard.load(Ordering::SeqCst) {
                debug!("Health check resolved after unmount, result dropped");
                return;
            }
            tx.send(GatewayStatus::from(&report)).ok();
        });

        Self {
            status: rx,
            mounted,
        }
    }

    pub fn status(&self) -> GatewayStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<GatewayStatus> {
        self.status.clone()
    }

    /// Waits for the check to settle. A check task that died counts as not ok.
    pub async fn resolved(&mut self) -> GatewayStatus {
        match self
            .status
            .wait_for(|status| *status != GatewayStatus::Unknown)
            .await
        {
            Ok(status) => *status,
            Err(_) => GatewayStatus::MissingKey,
        }
    }
}

impl Drop for HealthWatch {
    fn drop(&mut self) {
        self.mounted.store(false, Ordering::SeqCst);
    }
}
