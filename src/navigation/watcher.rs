//! Host event loop.
//!
//! The watcher owns a channel the host binding pushes [`HostEvent`]s into,
//! runs every event through the signal adapters, and hands resulting
//! signals to the dispatcher.
//!
//! # Event Loop
//!
//! ```text
//! host binding ──HostEvent──▶ mpsc ──▶ adapters ──NavigationSignal──▶ dispatcher ──▶ subscribers
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::adapters::SignalAdapter;
use super::dispatcher::NavigationDispatcher;
use super::signal::HostEvent;

// ============================================================================
// NavigationWatcher
// ============================================================================

/// Listens to host events for the lifetime of the page.
pub struct NavigationWatcher {
    /// Channel into the event loop.
    event_tx: mpsc::UnboundedSender<HostEvent>,
    /// Wakes the event loop for shutdown.
    shutdown: Arc<Notify>,
    /// Event loop task.
    task: JoinHandle<()>,
}

impl fmt::Debug for NavigationWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationWatcher")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl NavigationWatcher {
    /// Spawns the event loop.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(
        dispatcher: Arc<NavigationDispatcher>,
        adapters: Vec<Box<dyn SignalAdapter>>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());

        let task = tokio::spawn(Self::run_event_loop(
            event_rx,
            Arc::clone(&shutdown),
            dispatcher,
            adapters,
        ));

        Self {
            event_tx,
            shutdown,
            task,
        }
    }

    /// Returns a sender for the host binding.
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<HostEvent> {
        self.event_tx.clone()
    }

    /// Feeds one host event into the loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the loop has stopped.
    pub fn notify(&self, event: HostEvent) -> Result<()> {
        self.event_tx.send(event).map_err(|_| Error::ChannelClosed)
    }

    /// Stops the event loop. Pending events are dropped.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Returns `true` while the event loop runs.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Runs one event through the adapters and dispatches the signals.
    ///
    /// Returns the number of signals produced.
    pub fn handle_event(
        event: HostEvent,
        adapters: &[Box<dyn SignalAdapter>],
        dispatcher: &NavigationDispatcher,
    ) -> usize {
        let mut produced = 0;
        for adapter in adapters {
            if let Some(signal) = adapter.adapt(event) {
                debug!(?event, %signal, adapter = adapter.name(), "Navigation detected");
                dispatcher.dispatch(signal);
                produced += 1;
            }
        }
        if produced == 0 {
            trace!(?event, "Host event ignored");
        }
        produced
    }

    /// Event loop.
    async fn run_event_loop(
        mut event_rx: mpsc::UnboundedReceiver<HostEvent>,
        shutdown: Arc<Notify>,
        dispatcher: Arc<NavigationDispatcher>,
        adapters: Vec<Box<dyn SignalAdapter>>,
    ) {
        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    match event {
                        Some(event) => {
                            Self::handle_event(event, &adapters, &dispatcher);
                        }
                        None => {
                            debug!("Host event channel closed");
                            break;
                        }
                    }
                }

                () = shutdown.notified() => {
                    debug!("Navigation watcher shutdown requested");
                    break;
                }
            }
        }

        debug!("Navigation watcher terminated");
    }
}

impl Drop for NavigationWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::adapters::default_adapters;
    use crate::navigation::signal::NavigationSignal;
    use parking_lot::Mutex;
    use std::time::Duration;

    fn recording_dispatcher() -> (Arc<NavigationDispatcher>, Arc<Mutex<Vec<NavigationSignal>>>) {
        let dispatcher = Arc::new(NavigationDispatcher::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        dispatcher.on_navigate(move |signal| sink.lock().push(signal));
        (dispatcher, log)
    }

    #[test]
    fn test_handle_event_sync() {
        let (dispatcher, log) = recording_dispatcher();
        let adapters = default_adapters();

        assert_eq!(
            NavigationWatcher::handle_event(HostEvent::PopState, &adapters, &dispatcher),
            1
        );
        assert_eq!(
            NavigationWatcher::handle_event(
                HostEvent::VisibilityChanged { hidden: true },
                &adapters,
                &dispatcher
            ),
            0
        );
        assert_eq!(*log.lock(), vec![NavigationSignal::BackForward]);
    }

    #[tokio::test]
    async fn test_event_loop_dispatches() {
        let (dispatcher, log) = recording_dispatcher();
        let watcher = NavigationWatcher::spawn(dispatcher, default_adapters());

        watcher.notify(HostEvent::TouchStart).unwrap();
        watcher.notify(HostEvent::TouchEnd).unwrap();
        watcher.notify(HostEvent::Focus).unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(
            *log.lock(),
            vec![NavigationSignal::TouchGesture, NavigationSignal::Focus]
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let (dispatcher, _log) = recording_dispatcher();
        let watcher = NavigationWatcher::spawn(dispatcher, default_adapters());
        assert!(watcher.is_running());

        watcher.shutdown();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!watcher.is_running());
        assert!(matches!(
            watcher.notify(HostEvent::Focus),
            Err(Error::ChannelClosed)
        ));
    }
}
