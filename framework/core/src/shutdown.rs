use std::sync::Arc;

use tokio::sync::watch::{self, Receiver, Sender};

/// Owner side of the cancellation signal shared by a benchmark run.
///
/// Once [ShutdownHandle::shutdown] has been called every listener, including listeners created
/// afterwards, observes the signal.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::channel(false).0),
        }
    }

    pub fn shutdown(&self) {
        let was_shutdown = self.sender.send_replace(true);
        if !was_shutdown {
            log::debug!(
                "Shutdown signalled to {} listeners",
                self.sender.receiver_count()
            );
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }

    /// Signal shutdown once `after` has elapsed, unless it has already been signalled.
    pub fn shutdown_after(&self, after: std::time::Duration) {
        let handle = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            handle.shutdown();
        });
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Receiver<bool>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<bool>) -> Self {
        Self { receiver }
    }

    /// Point in time check if the shutdown signal has been received.
    pub fn should_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait for the shutdown signal. It is safe to race this with another future so that the
    /// signal can be used to cancel work in progress.
    ///
    /// Dropping every [ShutdownHandle] also counts as a shutdown.
    pub async fn wait_for_shutdown(&mut self) {
        if self.receiver.wait_for(|stopped| *stopped).await.is_err() {
            log::trace!("Shutdown handle dropped, treating as shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn late_listener_sees_shutdown() {
        let handle = ShutdownHandle::new();
        handle.shutdown();

        let mut listener = handle.new_listener();
        assert!(listener.should_shutdown());
        tokio::time::timeout(Duration::from_millis(100), listener.wait_for_shutdown())
            .await
            .expect("listener should not block after shutdown");
    }

    #[tokio::test]
    async fn listener_waits_until_shutdown() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();
        assert!(!listener.should_shutdown());

        let waiter = tokio::spawn(async move {
            listener.wait_for_shutdown().await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        handle.shutdown();
        waiter.await.unwrap();
        assert!(handle.is_shutdown());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_after_fires_at_deadline() {
        let handle = ShutdownHandle::new();
        handle.shutdown_after(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(!handle.is_shutdown());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_shutdown());
    }

    #[tokio::test]
    async fn dropped_handle_releases_listener() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();
        drop(handle);
        tokio::time::timeout(Duration::from_millis(100), listener.wait_for_shutdown())
            .await
            .expect("listener should return once the handle is gone");
    }
}
