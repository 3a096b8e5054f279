//! Background abandonment of idle upload sessions.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::debug;

use super::engine::PartitionedTransferEngine;

/// Periodically sweeps idle sessions out of a [`PartitionedTransferEngine`].
///
/// Sessions are also abandoned lazily when a chunk hits an expired one; the
/// reaper frees staging memory for uploads that are never resumed.
pub struct SessionReaper {
    engine: Arc<PartitionedTransferEngine>,
    interval: Duration,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl SessionReaper {
    /// Creates a reaper sweeping every `interval`.
    pub fn new(engine: Arc<PartitionedTransferEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            shutdown_tx: None,
        }
    }

    /// Starts sweeping in a background task.
    pub fn start(&mut self) -> tokio::task::JoinHandle<()> {
        let (tx, rx) = mpsc::channel(1);
        self.shutdown_tx = Some(tx);

        let engine = self.engine.clone();
        let interval = self.interval;
        tokio::spawn(async move {
            Self::sweep_loop(rx, engine, interval).await;
        })
    }

    /// Stops the background task.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
    }

    /// Returns `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    async fn sweep_loop(
        mut shutdown_rx: mpsc::Receiver<()>,
        engine: Arc<PartitionedTransferEngine>,
        period: Duration,
    ) {
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Session reaper shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let swept = engine.sweep_expired();
                    if swept > 0 {
                        debug!(swept, open = engine.open_sessions(), "Reaper pass");
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for SessionReaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionReaper")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::backends::memory::InMemoryBackend;
    use crate::config::TransferConfig;
    use crate::identity::Identity;
    use crate::registry::Registry;

    #[tokio::test(start_paused = true)]
    async fn test_reaper_sweeps_idle_sessions() {
        let registry = Registry::new(Arc::new(InMemoryBackend::new()));
        let config = TransferConfig {
            idle_timeout_ms: 1_000,
            sweep_interval_ms: 100,
            ..TransferConfig::default()
        };
        let engine = Arc::new(PartitionedTransferEngine::new(registry, &config));
        let owner = Identity::new("urn:test:1");

        engine
            .begin_chunk(&owner, "doc", 0, 10, Bytes::from_static(b"12345"))
            .await
            .unwrap();

        let mut reaper = SessionReaper::new(engine.clone(), config.sweep_interval());
        let handle = reaper.start();
        assert!(reaper.is_running());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.open_sessions(), 1);

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(engine.open_sessions(), 0);

        reaper.stop().await;
        handle.await.unwrap();
        assert!(!reaper.is_running());
    }
}
