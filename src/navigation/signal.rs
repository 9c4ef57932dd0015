//! Host events and the navigation signals derived from them.
//!
//! [`HostEvent`] is what the host page reports, one variant per DOM event
//! the injector listens to. [`NavigationSignal`] is what the injector reacts
//! to: the adapters in [`super::adapters`] turn the former into the latter.
//!
//! # Wire Names
//!
//! Host bindings may forward events as JSON using the DOM event names:
//!
//! ```json
//! { "type": "visibilitychange", "hidden": false }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PluginOptions;
use crate::error::Result;

// ============================================================================
// HostEvent
// ============================================================================

/// Raw event observed in the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostEvent {
    /// `history.pushState` completed.
    #[serde(rename = "pushState")]
    HistoryPushed,

    /// `history.replaceState` completed.
    #[serde(rename = "replaceState")]
    HistoryReplaced,

    /// Back/forward navigation (`popstate`).
    #[serde(rename = "popstate")]
    PopState,

    /// Page shown, including restores from the back/forward cache (`pageshow`).
    #[serde(rename = "pageshow")]
    PageShow,

    /// Window regained focus (`focus`).
    #[serde(rename = "focus")]
    Focus,

    /// Document visibility changed (`visibilitychange`).
    #[serde(rename = "visibilitychange")]
    VisibilityChanged {
        /// `document.hidden` after the change.
        hidden: bool,
    },

    /// Touch began (`touchstart`).
    #[serde(rename = "touchstart")]
    TouchStart,

    /// Touch ended (`touchend`).
    #[serde(rename = "touchend")]
    TouchEnd,

    /// Initial document parsed (`DOMContentLoaded`).
    #[serde(rename = "DOMContentLoaded")]
    DomContentLoaded,
}

impl HostEvent {
    /// Parses an event forwarded as JSON by a host binding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) for unknown or malformed events.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// NavigationSignal
// ============================================================================

/// A reason to re-run the activation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationSignal {
    /// Programmatic navigation via `pushState`.
    HistoryPush,
    /// Programmatic navigation via `replaceState`.
    HistoryReplace,
    /// Back/forward navigation.
    BackForward,
    /// Page shown again.
    PageShow,
    /// Window focus regained.
    Focus,
    /// Document became visible.
    BecameVisible,
    /// Touch gesture completed.
    TouchGesture,
    /// Document finished loading.
    DocumentReady,
}

impl NavigationSignal {
    /// Returns the settle delay to wait before reacting.
    #[must_use]
    pub fn settle_delay(&self, options: &PluginOptions) -> Duration {
        match self {
            Self::HistoryPush
            | Self::HistoryReplace
            | Self::BackForward
            | Self::PageShow
            | Self::Focus => options.navigation_delay(),
            Self::BecameVisible => options.visibility_delay(),
            Self::TouchGesture => options.touch_delay(),
            Self::DocumentReady => Duration::ZERO,
        }
    }

    /// Returns a short name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HistoryPush => "history-push",
            Self::HistoryReplace => "history-replace",
            Self::BackForward => "back-forward",
            Self::PageShow => "page-show",
            Self::Focus => "focus",
            Self::BecameVisible => "became-visible",
            Self::TouchGesture => "touch-gesture",
            Self::DocumentReady => "document-ready",
        }
    }
}

impl fmt::Display for NavigationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_delays() {
        let options = PluginOptions::new();
        let ms = |signal: NavigationSignal| signal.settle_delay(&options).as_millis();

        assert_eq!(ms(NavigationSignal::HistoryPush), 800);
        assert_eq!(ms(NavigationSignal::HistoryReplace), 800);
        assert_eq!(ms(NavigationSignal::BackForward), 800);
        assert_eq!(ms(NavigationSignal::PageShow), 800);
        assert_eq!(ms(NavigationSignal::Focus), 800);
        assert_eq!(ms(NavigationSignal::BecameVisible), 300);
        assert_eq!(ms(NavigationSignal::TouchGesture), 1000);
        assert_eq!(ms(NavigationSignal::DocumentReady), 0);
    }

    #[test]
    fn test_host_event_from_json() {
        assert_eq!(
            HostEvent::from_json(r#"{"type":"popstate"}"#).unwrap(),
            HostEvent::PopState
        );
        assert_eq!(
            HostEvent::from_json(r#"{"type":"visibilitychange","hidden":true}"#).unwrap(),
            HostEvent::VisibilityChanged { hidden: true }
        );
        assert!(HostEvent::from_json(r#"{"type":"scroll"}"#).is_err());
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(NavigationSignal::TouchGesture.to_string(), "touch-gesture");
    }
}
