//! Signal adapters.
//!
//! One adapter per signal source. Each looks at every [`HostEvent`] and
//! either ignores it or turns it into a [`NavigationSignal`]; none of them
//! touch the host's history object.

use std::sync::atomic::{AtomicBool, Ordering};

use super::signal::{HostEvent, NavigationSignal};

// ============================================================================
// SignalAdapter
// ============================================================================

/// Translates host events from one source into navigation signals.
pub trait SignalAdapter: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Returns the signal `event` stands for, if any.
    fn adapt(&self, event: HostEvent) -> Option<NavigationSignal>;
}

/// Returns one adapter per supported signal source.
#[must_use]
pub fn default_adapters() -> Vec<Box<dyn SignalAdapter>> {
    vec![
        Box::new(LifecycleAdapter),
        Box::new(HistoryAdapter),
        Box::new(FocusAdapter),
        Box::new(VisibilityAdapter),
        Box::new(GestureAdapter::new()),
    ]
}

// ============================================================================
// LifecycleAdapter
// ============================================================================

/// Document load completion.
#[derive(Debug, Clone, Copy, Default)]
pub struct LifecycleAdapter;

impl SignalAdapter for LifecycleAdapter {
    fn name(&self) -> &'static str {
        "lifecycle"
    }

    fn adapt(&self, event: HostEvent) -> Option<NavigationSignal> {
        matches!(event, HostEvent::DomContentLoaded).then_some(NavigationSignal::DocumentReady)
    }
}

// ============================================================================
// HistoryAdapter
// ============================================================================

/// History mutations and back/forward navigation.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryAdapter;

impl SignalAdapter for HistoryAdapter {
    fn name(&self) -> &'static str {
        "history"
    }

    fn adapt(&self, event: HostEvent) -> Option<NavigationSignal> {
        match event {
            HostEvent::HistoryPushed => Some(NavigationSignal::HistoryPush),
            HostEvent::HistoryReplaced => Some(NavigationSignal::HistoryReplace),
            HostEvent::PopState => Some(NavigationSignal::BackForward),
            _ => None,
        }
    }
}

// ============================================================================
// FocusAdapter
// ============================================================================

/// Focus regained and page shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct FocusAdapter;

impl SignalAdapter for FocusAdapter {
    fn name(&self) -> &'static str {
        "focus"
    }

    fn adapt(&self, event: HostEvent) -> Option<NavigationSignal> {
        match event {
            HostEvent::Focus => Some(NavigationSignal::Focus),
            HostEvent::PageShow => Some(NavigationSignal::PageShow),
            _ => None,
        }
    }
}

// ============================================================================
// VisibilityAdapter
// ============================================================================

/// Document becoming visible. Becoming hidden is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityAdapter;

impl SignalAdapter for VisibilityAdapter {
    fn name(&self) -> &'static str {
        "visibility"
    }

    fn adapt(&self, event: HostEvent) -> Option<NavigationSignal> {
        matches!(event, HostEvent::VisibilityChanged { hidden: false })
            .then_some(NavigationSignal::BecameVisible)
    }
}

// ============================================================================
// GestureAdapter
// ============================================================================

/// Completed touch gestures: a touch-end preceded by a touch-start.
#[derive(Debug, Default)]
pub struct GestureAdapter {
    /// Touch-start seen since the last emitted gesture.
    touch_started: AtomicBool,
}

impl GestureAdapter {
    /// Creates an adapter with no touch in progress.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalAdapter for GestureAdapter {
    fn name(&self) -> &'static str {
        "gesture"
    }

    fn adapt(&self, event: HostEvent) -> Option<NavigationSignal> {
        match event {
            HostEvent::TouchStart => {
                self.touch_started.store(true, Ordering::SeqCst);
                None
            }
            HostEvent::TouchEnd => self
                .touch_started
                .swap(false, Ordering::SeqCst)
                .then_some(NavigationSignal::TouchGesture),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn signals(event: HostEvent, adapters: &[Box<dyn SignalAdapter>]) -> Vec<NavigationSignal> {
        adapters.iter().filter_map(|a| a.adapt(event)).collect()
    }

    #[test]
    fn test_each_event_maps_to_one_signal() {
        let adapters = default_adapters();
        assert_eq!(
            signals(HostEvent::HistoryPushed, &adapters),
            vec![NavigationSignal::HistoryPush]
        );
        assert_eq!(
            signals(HostEvent::HistoryReplaced, &adapters),
            vec![NavigationSignal::HistoryReplace]
        );
        assert_eq!(
            signals(HostEvent::PopState, &adapters),
            vec![NavigationSignal::BackForward]
        );
        assert_eq!(
            signals(HostEvent::PageShow, &adapters),
            vec![NavigationSignal::PageShow]
        );
        assert_eq!(
            signals(HostEvent::Focus, &adapters),
            vec![NavigationSignal::Focus]
        );
        assert_eq!(
            signals(HostEvent::DomContentLoaded, &adapters),
            vec![NavigationSignal::DocumentReady]
        );
    }

    #[test]
    fn test_visibility_only_when_shown() {
        let adapter = VisibilityAdapter;
        assert_eq!(
            adapter.adapt(HostEvent::VisibilityChanged { hidden: false }),
            Some(NavigationSignal::BecameVisible)
        );
        assert_eq!(
            adapter.adapt(HostEvent::VisibilityChanged { hidden: true }),
            None
        );
    }

    #[test]
    fn test_gesture_needs_touch_start() {
        let adapter = GestureAdapter::new();
        assert_eq!(adapter.adapt(HostEvent::TouchEnd), None);

        assert_eq!(adapter.adapt(HostEvent::TouchStart), None);
        assert_eq!(
            adapter.adapt(HostEvent::TouchEnd),
            Some(NavigationSignal::TouchGesture)
        );

        // The start is consumed by the first end.
        assert_eq!(adapter.adapt(HostEvent::TouchEnd), None);
    }

    #[test]
    fn test_repeated_touch_starts_emit_once() {
        let adapter = GestureAdapter::new();
        adapter.adapt(HostEvent::TouchStart);
        adapter.adapt(HostEvent::TouchStart);
        assert!(adapter.adapt(HostEvent::TouchEnd).is_some());
        assert!(adapter.adapt(HostEvent::TouchEnd).is_none());
    }
}
