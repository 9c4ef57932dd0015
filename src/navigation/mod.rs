//! Navigation watching.
//!
//! The host application re-renders its view on internal navigation without
//! telling anyone. This module turns the indirect evidence (history calls,
//! back/forward, page-show, focus, visibility, touch gestures) into
//! [`NavigationSignal`]s behind a single subscription interface.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HostEvent`] | Raw event reported by the host binding |
//! | [`SignalAdapter`] | Per-source translation into signals |
//! | [`NavigationDispatcher`] | `on_navigate` subscription and fan-out |
//! | [`NavigationWatcher`] | Event loop feeding adapters and dispatcher |

// ============================================================================
// Submodules
// ============================================================================

/// Per-source signal adapters.
pub mod adapters;

/// Signal fan-out.
pub mod dispatcher;

/// Host events and navigation signals.
pub mod signal;

/// Host event loop.
pub mod watcher;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapters::{
    FocusAdapter, GestureAdapter, HistoryAdapter, LifecycleAdapter, SignalAdapter,
    VisibilityAdapter, default_adapters,
};
pub use dispatcher::{NavigationDispatcher, NavigationHandler};
pub use signal::{HostEvent, NavigationSignal};
pub use watcher::NavigationWatcher;
