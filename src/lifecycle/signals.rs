//! OS signal handling.
//!
//! # Responsibilities
//! - SIGTERM/SIGINT trigger graceful shutdown
//! - SIGHUP sends a configuration-change notification
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A handler that fails to install is logged, not fatal

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::watcher::ChangeNotifier;
use crate::lifecycle::shutdown::Shutdown;

/// Spawn the signal loop. Exits after triggering shutdown.
pub fn spawn_signal_handler(shutdown: Arc<Shutdown>, notifier: ChangeNotifier) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_termination(&notifier).await;
        shutdown.trigger();
    })
}

#[cfg(unix)]
async fn wait_for_termination(notifier: &ChangeNotifier) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            None
        }
    };
    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGHUP handler");
            None
        }
    };

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
                tracing::info!("Interrupt received");
                return;
            }
            _ = recv_or_pending(&mut terminate) => {
                tracing::info!("SIGTERM received");
                return;
            }
            _ = recv_or_pending(&mut hangup) => {
                tracing::info!("SIGHUP received, re-reading proxy configuration");
                let _ = notifier.send(());
            }
        }
    }
}

#[cfg(unix)]
async fn recv_or_pending(stream: &mut Option<tokio::signal::unix::Signal>) {
    if let Some(stream) = stream {
        if stream.recv().await.is_some() {
            return;
        }
    }
    std::future::pending().await
}

#[cfg(not(unix))]
async fn wait_for_termination(_notifier: &ChangeNotifier) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
    tracing::info!("Interrupt received");
}
