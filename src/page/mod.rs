//! Host page contract.
//!
//! The injector never owns the document it works on. [`Page`] is the
//! narrow surface it needs from the host: the current route, the host's
//! global API client, and a handful of DOM primitives.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Page`] | Document-tree contract implemented by a host binding |
//! | [`By`] | Element locator strategies |
//! | [`MemoryPage`] | In-memory document for tests, benches and simulations |
//!
//! Operations are synchronous, mirroring the DOM: one callback body runs to
//! completion before the next begins.

// ============================================================================
// Submodules
// ============================================================================

/// Fragment parsing and serialization for the in-memory document.
mod markup;

/// In-memory document.
pub mod memory;

/// Element locator strategies.
pub mod selector;

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{MemoryPage, ScriptHook};
pub use selector::By;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use crate::client::ApiClient;
use crate::error::Result;
use crate::identifiers::NodeId;

// ============================================================================
// Types
// ============================================================================

/// Callback run when an element is clicked.
pub type ClickHandler = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Page
// ============================================================================

/// The host document as seen by the injector.
///
/// Implementations must tolerate stale handles: the host router replaces
/// subtrees at will, so any [`NodeId`] may stop referring to an attached
/// node between two calls. Mutating a node that no longer exists returns
/// [`Error::NodeNotFound`](crate::Error::NodeNotFound).
///
/// Mounting a `script` element into the document (via
/// [`append_child`](Self::append_child) or [`insert_after`](Self::insert_after))
/// runs its text once in the page context. Scripts created through
/// [`set_inner_html`](Self::set_inner_html) do not run.
pub trait Page: Send + Sync {
    // ------------------------------------------------------------------------
    // Globals
    // ------------------------------------------------------------------------

    /// Returns the location hash, including the leading `#` (or empty).
    fn location_hash(&self) -> String;

    /// Returns the host's API client once the host has defined it.
    fn api_client(&self) -> Option<Arc<dyn ApiClient>>;

    /// Returns `true` while the document is still loading.
    fn is_loading(&self) -> bool {
        false
    }

    // ------------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------------

    /// Returns the first attached element matching `by`, in document order.
    fn query(&self, by: &By) -> Option<NodeId>;

    /// Returns the first descendant of `root` matching `by`.
    fn query_within(&self, root: NodeId, by: &By) -> Option<NodeId>;

    /// Returns `true` if `node` is attached to the document.
    fn contains(&self, node: NodeId) -> bool;

    /// Returns the parent element of `node`.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    /// Creates a detached element.
    fn create_element(&self, tag: &str) -> NodeId;

    /// Sets an attribute, replacing any previous value.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<()>;

    /// Reads an attribute.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Adds a class to the element's class list.
    fn add_class(&self, node: NodeId, class: &str) -> Result<()>;

    /// Sets one inline style property.
    fn set_style(&self, node: NodeId, property: &str, value: &str) -> Result<()>;

    // ------------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------------

    /// Replaces the element's children with a single text node.
    fn set_text(&self, node: NodeId, text: &str) -> Result<()>;

    /// Returns the concatenated text of the element's descendants.
    fn text_content(&self, node: NodeId) -> Option<String>;

    /// Replaces the element's children with parsed `markup`, verbatim.
    fn set_inner_html(&self, node: NodeId, markup: &str) -> Result<()>;

    /// Serializes the element's children.
    fn inner_html(&self, node: NodeId) -> Option<String>;

    // ------------------------------------------------------------------------
    // Tree Mutation
    // ------------------------------------------------------------------------

    /// Appends `child` as the last child of `parent`, moving it if attached.
    fn append_child(&self, parent: NodeId, child: NodeId) -> Result<()>;

    /// Inserts `node` as the next sibling of `reference`.
    fn insert_after(&self, reference: NodeId, node: NodeId) -> Result<()>;

    /// Detaches `node` and discards it with its subtree.
    fn remove_node(&self, node: NodeId) -> Result<()>;

    // ------------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------------

    /// Registers a click listener on the element.
    fn add_click_listener(&self, node: NodeId, handler: ClickHandler) -> Result<()>;
}
