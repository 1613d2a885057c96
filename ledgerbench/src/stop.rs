use std::sync::Arc;
use tokio::sync::watch;

/// Cooperative cancellation flag shared by a runner, its workers and any external caller.
///
/// Setting it is idempotent and never blocks, so it can be called from a signal handler task.
/// Workers poll [`StopSignal::is_stopped`] between units of work and can also await
/// [`StopSignal::stopped`] while parked on a stream receive.
#[derive(Clone, Debug)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request a stop. Returns `true` for the first request only.
    pub fn stop(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }

    /// Completes once a stop has been requested.
    pub async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // NOTE: The sender lives as long as `self`, so this can only return once set.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}
