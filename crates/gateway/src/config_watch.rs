// SPDX-License-Identifier: BUSL-1.1

//! Debounced config file watcher. Splits changes into
//! hot-reloadable updates (applied in place) and restart-required changes
//! (reported, not applied).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::GatewayConfig;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub enum ConfigEvent {
    /// Hot fields changed and were applied in place.
    Updated { config: GatewayConfig, changed_fields: Vec<&'static str> },
    /// Restart-required fields changed; the live config was left untouched.
    RestartRequired { changed_fields: Vec<&'static str> },
    /// The file failed to parse or validate; the live config is retained.
    Error { message: String },
}

/// Watches a config file on disk, re-parsing it on change and diffing
/// against the currently held config.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    current: Arc<RwLock<GatewayConfig>>,
}

impl ConfigWatcher {
    pub fn new(path: PathBuf, initial: GatewayConfig) -> Self {
        Self { path, debounce: DEFAULT_DEBOUNCE, current: Arc::new(RwLock::new(initial)) }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn current(&self) -> GatewayConfig {
        self.current.read().clone()
    }

    pub fn handle(&self) -> Arc<RwLock<GatewayConfig>> {
        Arc::clone(&self.current)
    }

    /// Parse and validate `contents`, returning the new config. Does not
    /// mutate anything; pure, so it is independently unit-testable.
    fn parse(contents: &str) -> Result<GatewayConfig, String> {
        serde_json::from_str(contents).map_err(|e| e.to_string())
    }

    /// Attempt one reload cycle: read the file, parse it, diff against the
    /// held config, and apply hot changes in place. Returns `None` if the
    /// content is unchanged (deep-equal) from the currently held config.
    fn reload_once(&self) -> Option<ConfigEvent> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => return Some(ConfigEvent::Error { message: e.to_string() }),
        };

        let parsed = match Self::parse(&contents) {
            Ok(c) => c,
            Err(message) => return Some(ConfigEvent::Error { message }),
        };

        let previous = self.current.read().clone();
        if previous == parsed {
            return None;
        }

        let (hot, restart) = previous.partition_changes(&parsed);

        if !restart.is_empty() {
            return Some(ConfigEvent::RestartRequired { changed_fields: restart });
        }

        if hot.is_empty() {
            return None;
        }

        *self.current.write() = parsed.clone();
        Some(ConfigEvent::Updated { config: parsed, changed_fields: hot })
    }

    /// Run the watch loop until `shutdown` is cancelled, sending events to
    /// `event_tx`. Bursts of filesystem events within `debounce` collapse
    /// into a single reload attempt.
    pub async fn run(self, event_tx: mpsc::Sender<ConfigEvent>, shutdown: CancellationToken) {
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);
        let _watcher = self.setup_notify_watcher(wake_tx);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                woken = wake_rx.recv() => {
                    if woken.is_none() {
                        break;
                    }
                }
            }

            // Debounce: collapse any further events arriving within the
            // window into this single reload attempt.
            tokio::select! {
                _ = tokio::time::sleep(self.debounce) => {}
                _ = shutdown.cancelled() => break,
            }
            while wake_rx.try_recv().is_ok() {}

            if let Some(event) = self.reload_once() {
                if event_tx.send(event).await.is_err() {
                    break;
                }
            }
        }
    }

    fn setup_notify_watcher(&self, wake_tx: mpsc::Sender<()>) -> Option<notify::RecommendedWatcher> {
        use notify::{RecursiveMode, Watcher};

        let mut watcher = notify::recommended_watcher(move |_: notify::Result<notify::Event>| {
            let _ = wake_tx.try_send(());
        })
        .ok()?;

        let watch_path = self.path.parent().unwrap_or(self.path.as_ref());
        watcher.watch(watch_path, RecursiveMode::NonRecursive).ok()?;
        Some(watcher)
    }
}

#[cfg(test)]
#[path = "config_watch_tests.rs"]
mod tests;
