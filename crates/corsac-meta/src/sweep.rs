//! The periodic metrics sweep: an independent task with a cancellable timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::catalog::MetaCatalog;

/// Handle to the running sweep task.
pub struct MetricsSweeper {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl MetricsSweeper {
    /// Spawn the sweep loop. Every tick recomputes the cached table and
    /// index aggregates and publishes them to the exporter.
    pub fn spawn(catalog: Arc<MetaCatalog>, interval: Duration) -> Self {
        let (cancel, mut cancelled) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // tokio intervals tick immediately; consume the first one so the
            // sweep starts a full period after spawn.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut cancelled => {
                        info!("metrics sweeper cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        catalog.sweep_table_metrics();
                        catalog.sweep_index_metrics();
                        debug!("metrics sweep completed");
                    }
                }
            }
        });
        Self { cancel, handle }
    }

    /// Cancel the timer and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.cancel.send(());
        let _ = self.handle.await;
    }
}
