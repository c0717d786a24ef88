//! Read-through snapshot of the catalog with an explicit refresh lifecycle
//!
//! `start` spawns a single refresh task that reloads the snapshot every
//! `refresh_interval`; `stop` cancels and joins it. A failed reload keeps the
//! previous snapshot.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::{CatalogEntry, CatalogStore};

struct RefreshTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct CatalogCache {
    store: Arc<dyn CatalogStore>,
    snapshot: Arc<RwLock<Vec<CatalogEntry>>>,
    refresh_interval: Duration,
    shutdown: CancellationToken,
    task: Mutex<Option<RefreshTask>>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn CatalogStore>, refresh_interval: Duration) -> Self {
        Self {
            store,
            snapshot: Arc::new(RwLock::new(Vec::new())),
            refresh_interval,
            shutdown: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Tie the refresh task to an outer shutdown token
    pub fn with_parent_token(mut self, parent: &CancellationToken) -> Self {
        self.shutdown = parent.child_token();
        self
    }

    pub const fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Reload now; returns the number of cached rows
    pub async fn refresh_now(&self) -> Result<usize> {
        reload(self.store.as_ref(), &self.snapshot).await
    }

    pub async fn snapshot(&self) -> Vec<CatalogEntry> {
        self.snapshot.read().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Spawn the refresh task; a second call while running is a no-op
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            debug!("Catalog cache refresh already running");
            return;
        }

        let token = self.shutdown.child_token();
        let store = Arc::clone(&self.store);
        let snapshot = Arc::clone(&self.snapshot);
        let interval = self.refresh_interval;
        let loop_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = reload(store.as_ref(), &snapshot).await {
                            warn!("⚠️ Catalog cache refresh failed, keeping previous snapshot: {}", e);
                        }
                    }
                }
            }
            debug!("Catalog cache refresh task stopped");
        });

        info!("🔄 Catalog cache refresh started (every {:?})", interval);
        *task = Some(RefreshTask { token, handle });
    }

    /// Cancel the refresh task and wait for it to finish
    pub async fn stop(&self) {
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        task.token.cancel();
        if let Err(e) = task.handle.await {
            warn!("Catalog cache refresh task ended abnormally: {}", e);
        }
        info!("🛑 Catalog cache refresh stopped");
    }
}

async fn reload(store: &dyn CatalogStore, snapshot: &RwLock<Vec<CatalogEntry>>) -> Result<usize> {
    let entries = store.get_measured_entries().await?;
    let count = entries.len();
    *snapshot.write().await = entries;
    debug!("Catalog cache reloaded ({} rows)", count);
    Ok(count)
}
