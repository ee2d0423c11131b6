//! Configuration-change subscription.
//!
//! A single task consumes change notifications, so rebuilds never race.
//! Notifications that pile up while a rebuild runs are coalesced into one
//! re-read.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::endpoints::EndpointSource;
use crate::proxy::service::{ProxyService, ReloadOutcome};

/// Re-read endpoints and apply them. Errors are logged, never returned; the
/// previous table keeps serving.
pub fn apply_notification(service: &ProxyService, source: &dyn EndpointSource) -> Option<ReloadOutcome> {
    let endpoints = match source.read_endpoints() {
        Ok(endpoints) => endpoints,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read proxy configuration. Keeping current routes.");
            return None;
        }
    };

    match service.reload(endpoints) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::error!(
                route = %e.route(),
                error = %e,
                "Failed to rebuild proxy routes. Keeping current routes."
            );
            None
        }
    }
}

/// Spawn the task that applies notifications until shutdown or until every
/// sender is dropped.
pub fn spawn_reload_task(
    service: Arc<ProxyService>,
    source: Arc<dyn EndpointSource>,
    mut notifications: mpsc::UnboundedReceiver<()>,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                notification = notifications.recv() => {
                    if notification.is_none() {
                        tracing::debug!("Config change subscription closed");
                        break;
                    }
                    while notifications.try_recv().is_ok() {}

                    let service = service.clone();
                    let source = source.clone();
                    let applied = tokio::task::spawn_blocking(move || {
                        apply_notification(&service, source.as_ref())
                    })
                    .await;

                    if let Err(e) = applied {
                        tracing::error!(error = %e, "Proxy reload task panicked");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Proxy reload task received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    })
}
