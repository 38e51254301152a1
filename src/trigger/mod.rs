//! AutoTrigger: background interval loop
//!
//! Runs in a single tokio task owned by the gateway. Every period it
//! triggers all connected devices through the shared [`NanoClient`],
//! pausing between devices. A failed tick is logged and the loop keeps
//! going; only an explicit stop ends it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::client::NanoClient;

/// Reported when `start` is called while a loop is already active
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("auto-trigger already running")]
pub struct AlreadyRunning;

struct ActiveLoop {
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Interval loop controller. At most one loop is active per instance.
pub struct AutoTrigger {
    client: Arc<NanoClient>,
    state: Mutex<Option<ActiveLoop>>,
}

impl AutoTrigger {
    pub fn new(client: Arc<NanoClient>) -> Self {
        Self {
            client,
            state: Mutex::new(None),
        }
    }

    /// Start the interval loop.
    ///
    /// Fails without side effects when a loop is already active. Each run
    /// owns its own flag, so a stopped loop draining its final tick can
    /// never be confused with a fresh one.
    pub async fn start(&self, interval: Duration) -> Result<(), AlreadyRunning> {
        let mut state = self.state.lock().await;

        if let Some(active) = state.as_ref() {
            if active.running.load(Ordering::SeqCst) {
                return Err(AlreadyRunning);
            }
        }

        let running = Arc::new(AtomicBool::new(true));
        let loop_flag = running.clone();
        let client = self.client.clone();

        let task = tokio::spawn(async move {
            tracing::info!("[AutoTrigger] Loop started (interval: {:?})", interval);

            loop {
                // Cooperative cancellation: the flag is observed at the top
                // of each iteration, an in-flight tick always completes.
                if !loop_flag.load(Ordering::SeqCst) {
                    break;
                }

                match client.trigger_all("auto-trigger interval").await {
                    Ok(results) => {
                        for (device, result) in results {
                            if result.success {
                                tracing::info!("[AutoTrigger] {} triggered", device);
                            } else {
                                tracing::warn!(
                                    "[AutoTrigger] {} failed: {}",
                                    device,
                                    result.error.as_deref().unwrap_or("unknown")
                                );
                            }
                        }
                    }
                    Err(e) => {
                        // A failed tick never terminates the loop
                        tracing::error!("[AutoTrigger] Tick failed: {}", e);
                    }
                }

                tokio::time::sleep(interval).await;
            }

            tracing::info!("[AutoTrigger] Loop stopped");
        });

        *state = Some(ActiveLoop { running, task });
        Ok(())
    }

    /// Stop the loop. Idempotent; returns whether a loop was running.
    /// Stop latency is up to one full tick plus the interval sleep.
    pub async fn stop(&self) -> bool {
        let mut state = self.state.lock().await;

        match state.take() {
            Some(active) => {
                let was_running = active.running.swap(false, Ordering::SeqCst);
                // The task winds down on its own once it observes the flag
                drop(active.task);
                was_running
            }
            None => false,
        }
    }

    pub async fn is_running(&self) -> bool {
        self.state
            .lock()
            .await
            .as_ref()
            .map(|active| active.running.load(Ordering::SeqCst))
            .unwrap_or(false)
    }
}
