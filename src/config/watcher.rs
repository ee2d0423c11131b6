//! Configuration file watcher for hot reload.
//!
//! The watcher does not parse anything. It only tells subscribers to re-read
//! configuration; the reload task decides whether anything changed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// Sender half of the configuration-change subscription.
pub type ChangeNotifier = mpsc::UnboundedSender<()>;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    notifier: ChangeNotifier,
}

impl ConfigWatcher {
    pub fn new(path: &Path, notifier: ChangeNotifier) -> Self {
        Self {
            path: path.to_path_buf(),
            notifier,
        }
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let notifier = self.notifier.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected");
                        let _ = notifier.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
