//! Type-safe identifiers.
//!
//! Newtype wrappers keep page nodes, tab keys, subscriptions and cycles
//! from being mixed up at compile time.
//!
//! | Type | Backing | Source |
//! |------|---------|--------|
//! | [`NodeId`] | UUID v4 | minted by the page for each element |
//! | [`TabKey`] | `String` | `<prefix><index>`, e.g. `tab_0` |
//! | [`SubscriptionId`] | `u64` | navigation dispatcher |
//! | [`CycleId`] | `u64` | one per scheduled activation cycle |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// NodeId
// ============================================================================

/// Handle to an element in the host document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generates a fresh random node ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// TabKey
// ============================================================================

/// Deterministic identifier of an injected tab: prefix followed by the
/// definition's position in the fetched sequence.
///
/// The key doubles as the DOM `id` of the tab's button.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabKey(String);

impl TabKey {
    /// Builds the key for the definition at `index`.
    #[inline]
    #[must_use]
    pub fn new(prefix: &str, index: usize) -> Self {
        Self(format!("{prefix}{index}"))
    }

    /// Wraps an arbitrary identifier, e.g. one read back from the page.
    #[inline]
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the positional index if the key carries `prefix`.
    #[must_use]
    pub fn index(&self, prefix: &str) -> Option<usize> {
        self.0.strip_prefix(prefix)?.parse().ok()
    }
}

impl fmt::Display for TabKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TabKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Global counter for subscription IDs.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a handler registered with the navigation dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates the next subscription ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CycleId
// ============================================================================

/// Global counter for cycle IDs.
static NEXT_CYCLE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one activation cycle (settle delay, poll, reconcile) in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(u64);

impl CycleId {
    /// Allocates the next cycle ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CYCLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
