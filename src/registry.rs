//! Tab registry and plugin state.
//!
//! [`PluginState`] is the one piece of mutable state the injector keeps for
//! the page's lifetime. It is owned by the controller's context and written
//! only by the reconciler (registry, container) and the renderer (current
//! tab).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::client::TabDefinition;
use crate::identifiers::{NodeId, TabKey};

// ============================================================================
// TabRegistry
// ============================================================================

/// Tab key to definition map for the current reconciliation pass.
///
/// Replaced wholesale at the start of every pass; entries from an older
/// pass never survive into a newer one.
#[derive(Debug, Clone, Default)]
pub struct TabRegistry {
    entries: FxHashMap<TabKey, Arc<TabDefinition>>,
}

impl TabRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Stores a definition, replacing any previous one under the same key.
    pub fn insert(&mut self, key: TabKey, definition: TabDefinition) {
        self.entries.insert(key, Arc::new(definition));
    }

    /// Looks up a definition.
    #[must_use]
    pub fn get(&self, key: &TabKey) -> Option<Arc<TabDefinition>> {
        self.entries.get(key).cloned()
    }

    /// Returns `true` if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &TabKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the registered keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<TabKey> {
        let mut keys: Vec<TabKey> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }
}

// ============================================================================
// PluginPhase
// ============================================================================

/// Top-level lifecycle. There is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PluginPhase {
    /// `start` has not run yet.
    #[default]
    NotInitialized,
    /// A cycle is waiting for the host UI.
    WaitingForUi,
    /// The last completed pass created (or found) the tabs.
    TabsCreated,
}

impl fmt::Display for PluginPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotInitialized => "not-initialized",
            Self::WaitingForUi => "waiting-for-ui",
            Self::TabsCreated => "tabs-created",
        })
    }
}

// ============================================================================
// PluginState
// ============================================================================

/// Page-lifetime injector state.
#[derive(Debug, Clone, Default)]
pub struct PluginState {
    /// Set once the controller has started.
    pub initialized: bool,
    /// Tab whose content is mounted in the container.
    pub current_tab: Option<TabKey>,
    /// Definitions of the current pass.
    pub registry: TabRegistry,
    /// Shared content container.
    pub container: Option<NodeId>,
    /// Lifecycle phase.
    pub phase: PluginPhase,
}

impl PluginState {
    /// Creates the initial state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
