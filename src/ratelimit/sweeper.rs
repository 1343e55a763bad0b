//! Background reclamation of idle window counters.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::limiter::LimiterStore;

/// Handle to a running sweeper task.
///
/// Dropping the handle also stops the task.
pub struct SweeperHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

/// Spawn a task that sweeps `store` every `interval`.
///
/// Must be called from within a Tokio runtime.
pub fn spawn_sweeper(store: Arc<LimiterStore>, interval: Duration) -> SweeperHandle {
    let (stop, mut stopped) = oneshot::channel();

    info!(
        interval = ?interval,
        retention = ?store.config().retention(),
        "Starting window counter sweeper"
    );

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = store.sweep(Instant::now());
                    if evicted > 0 {
                        debug!(
                            evicted,
                            remaining = store.counter_count(),
                            "Evicted idle window counters"
                        );
                    }
                }
                _ = &mut stopped => {
                    debug!("Window counter sweeper stopped");
                    break;
                }
            }
        }
    });

    SweeperHandle { stop, task }
}
