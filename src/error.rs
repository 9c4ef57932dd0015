//! Error types for the tab injector.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]. The
//! controller never lets an [`Error`] escape into the host page: every
//! failure is logged and degrades to "no visible change" or the fallback
//! message.
//!
//! ```ignore
//! use custom_tabs::{Error, Result};
//!
//! fn container(page: &dyn Page, by: &By) -> Result<NodeId> {
//!     page.query(by)
//!         .ok_or_else(|| Error::container_unavailable("not in the document"))
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Environment | [`Error::ContainerUnavailable`] |
//! | Document | [`Error::NodeNotFound`], [`Error::Page`] |
//! | Endpoint | [`Error::Fetch`], [`Error::InvalidPayload`] |
//! | Execution | [`Error::Script`] |
//! | External | [`Error::Json`], [`Error::Url`], [`Error::ChannelClosed`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::NodeId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when plugin options or the builder are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Environment Errors
    // ========================================================================
    /// The shared content container could not be found or created.
    #[error("Content container unavailable: {message}")]
    ContainerUnavailable {
        /// Why the container is unavailable.
        message: String,
    },

    // ========================================================================
    // Document Errors
    // ========================================================================
    /// Node handle does not refer to a live node.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The unknown node.
        node_id: NodeId,
    },

    /// Document operation rejected by the page.
    #[error("Page error: {message}")]
    Page {
        /// Description of the rejected operation.
        message: String,
    },

    // ========================================================================
    // Endpoint Errors
    // ========================================================================
    /// Request to the config endpoint failed.
    #[error("Fetch failed for {url}: {message}")]
    Fetch {
        /// Requested URL.
        url: String,
        /// Transport or status error.
        message: String,
    },

    /// Endpoint answered with something other than a list of tab definitions.
    #[error("Invalid tab payload: {message}")]
    InvalidPayload {
        /// Description of the mismatch.
        message: String,
    },

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Injected script failed while mounting or running.
    #[error("Script error: {message}")]
    Script {
        /// Error message from the script host.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL resolution error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Host event channel closed.
    #[error("Channel closed")]
    ChannelClosed,
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a container-unavailable error.
    #[inline]
    pub fn container_unavailable(message: impl Into<String>) -> Self {
        Self::ContainerUnavailable {
            message: message.into(),
        }
    }

    /// Creates a node-not-found error.
    #[inline]
    pub fn node_not_found(node_id: NodeId) -> Self {
        Self::NodeNotFound { node_id }
    }

    /// Creates a page error.
    #[inline]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Creates a fetch error.
    #[inline]
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid payload error.
    #[inline]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Creates a script error.
    #[inline]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
