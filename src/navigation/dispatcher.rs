//! Navigation signal dispatcher.
//!
//! A single fan-out point: adapters feed signals in, subscribers registered
//! with [`NavigationDispatcher::on_navigate`] receive them in registration
//! order.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, trace};

use crate::identifiers::SubscriptionId;

use super::signal::NavigationSignal;

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback.
pub type NavigationHandler = Arc<dyn Fn(NavigationSignal) + Send + Sync>;

// ============================================================================
// NavigationDispatcher
// ============================================================================

/// Delivers navigation signals to subscribers.
#[derive(Default)]
pub struct NavigationDispatcher {
    /// Subscribers in registration order.
    handlers: RwLock<Vec<(SubscriptionId, NavigationHandler)>>,
}

impl fmt::Debug for NavigationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationDispatcher")
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl NavigationDispatcher {
    /// Creates a dispatcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to every navigation signal.
    pub fn on_navigate<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(NavigationSignal) + Send + Sync + 'static,
    {
        let id = SubscriptionId::next();
        self.handlers.write().push((id, Arc::new(handler)));
        debug!(subscription_id = %id, "Navigation subscriber added");
        id
    }

    /// Removes a subscriber. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        before != handlers.len()
    }

    /// Delivers `signal` to every subscriber and returns how many ran.
    ///
    /// Handlers run outside the subscriber lock, so they may subscribe or
    /// unsubscribe. A panicking handler is logged and skipped; later
    /// handlers still run.
    pub fn dispatch(&self, signal: NavigationSignal) -> usize {
        let handlers: Vec<(SubscriptionId, NavigationHandler)> = self
            .handlers
            .read()
            .iter()
            .map(|(id, handler)| (*id, Arc::clone(handler)))
            .collect();

        trace!(%signal, subscribers = handlers.len(), "Dispatching navigation signal");
        for (id, handler) in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(signal))).is_err() {
                error!(subscription_id = %id, %signal, "Navigation subscriber panicked");
            }
        }
        handlers.len()
    }

    /// Returns the number of subscribers.
    #[inline]
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

// ============================================================================
// Tests
// ============================================================================
