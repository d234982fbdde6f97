//! Backend reachability.
//!
//! [`ConnectionStatus`] is a shared, observable boolean.  It starts out
//! `false` and is updated by health checks ([`ConnectionMonitor`]) and by
//! any failed API call.  Subscribers receive the current value first and
//! then every change.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::backend::ChatBackend;
use crate::observability::{CONNECTION_TRANSITIONS, HEALTH_CHECK_FAILURES, HEALTH_CHECKS};

/// Shared handle to the "is the backend reachable" flag.
///
/// Clones observe and update the same flag.
#[derive(Clone, Debug)]
pub struct ConnectionStatus {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectionStatus {
    /// Creates a new status, initially disconnected.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns the current value.
    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// Sets the value, notifying subscribers only if it changed.
    ///
    /// Returns true if the value changed.
    pub fn set(&self, connected: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
        if changed {
            CONNECTION_TRANSITIONS.click();
            if connected {
                tracing::info!("NOVA API connection established");
            } else {
                tracing::warn!("NOVA API connection lost");
            }
        }
        changed
    }

    /// Subscribes to the current value and all future changes.
    pub fn subscribe(&self) -> ConnectionWatcher {
        ConnectionWatcher {
            rx: self.tx.subscribe(),
            last: None,
        }
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription to a [`ConnectionStatus`].
#[derive(Debug)]
pub struct ConnectionWatcher {
    rx: watch::Receiver<bool>,
    last: Option<bool>,
}

impl ConnectionWatcher {
    /// Returns the current value without waiting.
    pub fn current(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for the next value.
    ///
    /// The first call resolves immediately with the current value; later
    /// calls resolve when the value differs from the one last returned.
    /// Returns `None` once every [`ConnectionStatus`] handle is dropped.
    ///
    /// ```
    /// use novachat::ConnectionStatus;
    ///
    /// # tokio_test::block_on(async {
    /// let status = ConnectionStatus::new();
    /// let mut watcher = status.subscribe();
    /// assert_eq!(watcher.next().await, Some(false));
    /// status.set(true);
    /// assert_eq!(watcher.next().await, Some(true));
    /// # });
    /// ```
    pub async fn next(&mut self) -> Option<bool> {
        if self.last.is_none() {
            let value = *self.rx.borrow_and_update();
            self.last = Some(value);
            return Some(value);
        }
        loop {
            self.rx.changed().await.ok()?;
            let value = *self.rx.borrow_and_update();
            if Some(value) != self.last {
                self.last = Some(value);
                return Some(value);
            }
        }
    }
}

/// Derives [`ConnectionStatus`] from health checks.
pub struct ConnectionMonitor<B: ChatBackend + ?Sized> {
    backend: Arc<B>,
    status: ConnectionStatus,
}

impl<B: ChatBackend + ?Sized> Clone for ConnectionMonitor<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            status: self.status.clone(),
        }
    }
}

impl<B: ChatBackend + ?Sized> ConnectionMonitor<B> {
    /// Creates a monitor that checks `backend` and records into `status`.
    pub fn new(backend: Arc<B>, status: ConnectionStatus) -> Self {
        Self { backend, status }
    }

    /// Returns the status this monitor updates.
    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    /// Returns the last recorded reachability.
    pub fn is_connected(&self) -> bool {
        self.status.get()
    }

    /// Checks the backend once.
    ///
    /// Returns true iff the check succeeded and the backend reports itself
    /// operational.  Failures are absorbed: they set the status to `false`
    /// and are never returned.
    pub async fn check_connection(&self) -> bool {
        HEALTH_CHECKS.click();
        let connected = match self.backend.check_health().await {
            Ok(health) if health.is_operational() => true,
            Ok(health) => {
                tracing::warn!(status = %health.status, "NOVA API is not operational");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "NOVA API health check failed");
                false
            }
        };
        if !connected {
            HEALTH_CHECK_FAILURES.click();
        }
        self.status.set(connected);
        connected
    }
}

impl<B: ChatBackend + ?Sized + 'static> ConnectionMonitor<B> {
    /// Spawns a task that calls [`Self::check_connection`] every `period`.
    ///
    /// The first check runs one period from now; abort the returned handle to
    /// stop polling.
    pub fn spawn_polling(&self, period: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.check_connection().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::{FakeBackend, health};
    use crate::error::Error;

    #[test]
    fn starts_disconnected() {
        let status = ConnectionStatus::new();
        assert!(!status.get());
    }

    #[test]
    fn set_reports_changes_only() {
        let status = ConnectionStatus::new();
        assert!(!status.set(false));
        assert!(status.set(true));
        assert!(!status.set(true));
        assert!(status.get());
        let clone = status.clone();
        assert!(clone.set(false));
        assert!(!status.get());
    }

    #[tokio::test]
    async fn watcher_sees_current_then_changes() {
        let status = ConnectionStatus::new();
        status.set(true);
        let mut watcher = status.subscribe();
        assert_eq!(watcher.next().await, Some(true));

        status.set(false);
        assert_eq!(watcher.next().await, Some(false));

        // A round trip that ends where it started is not a change.
        status.set(true);
        status.set(false);
        let pending = tokio::time::timeout(Duration::from_millis(20), watcher.next()).await;
        assert!(pending.is_err());

        status.set(true);
        assert_eq!(watcher.next().await, Some(true));
        assert!(watcher.current());
    }

    #[tokio::test]
    async fn watcher_ends_when_status_dropped() {
        let status = ConnectionStatus::new();
        let mut watcher = status.subscribe();
        assert_eq!(watcher.next().await, Some(false));
        drop(status);
        assert_eq!(watcher.next().await, None);
    }

    #[tokio::test]
    async fn healthy_check_connects() {
        let backend = Arc::new(FakeBackend::default());
        let monitor = ConnectionMonitor::new(backend.clone(), ConnectionStatus::new());
        assert!(monitor.check_connection().await);
        assert!(monitor.is_connected());
        assert_eq!(backend.health_calls(), 1);
    }

    #[tokio::test]
    async fn failed_check_disconnects_without_error() {
        let backend = Arc::new(FakeBackend::default());
        let status = ConnectionStatus::new();
        status.set(true);
        backend.push_health(Err(Error::from_status(500, None)));
        let monitor = ConnectionMonitor::new(backend, status.clone());
        assert!(!monitor.check_connection().await);
        assert!(!status.get());
    }

    #[tokio::test]
    async fn non_operational_check_disconnects() {
        let backend = Arc::new(FakeBackend::default());
        backend.push_health(Ok(health("maintenance")));
        let monitor = ConnectionMonitor::new(backend, ConnectionStatus::new());
        assert!(!monitor.check_connection().await);
        assert!(!monitor.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_checks_each_period() {
        let backend = Arc::new(FakeBackend::default());
        let monitor = ConnectionMonitor::new(backend.clone(), ConnectionStatus::new());
        let handle = monitor.spawn_polling(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(backend.health_calls(), 0);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.health_calls(), 1);
        assert!(monitor.is_connected());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.health_calls(), 2);

        handle.abort();
    }
}
