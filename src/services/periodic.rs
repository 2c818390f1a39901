use std::time::Duration;

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, warn};

/// Background loop invoking a callback at a fixed period until stopped.
pub(crate) struct PeriodicTask {
    name: &'static str,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    /// Spawn the loop. The first call happens one full period after spawning.
    pub(crate) fn spawn<F>(name: &'static str, period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => on_tick(),
                }
            }
            debug!(task = name, "periodic task stopped");
        });
        Self { name, stop, handle }
    }

    /// Signal the loop and wait for it to exit.
    pub(crate) async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(err) = self.handle.await {
            warn!(task = self.name, error = %err, "periodic task ended abnormally");
        }
    }
}
