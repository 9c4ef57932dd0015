//! Tab script execution.
//!
//! Tab scripts come from the configured backend and run in the host page's
//! context with the page's full privileges. There is no sandboxing or
//! validation here; whoever controls the endpoint controls the page.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::error::Result;
use crate::identifiers::NodeId;
use crate::page::Page;

// ============================================================================
// ScriptExecutor
// ============================================================================

/// Runs a tab's script body.
pub trait ScriptExecutor: Send + Sync {
    /// Runs `body` once, in the page, on behalf of the content `container`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Script`](crate::Error::Script) if the script threw,
    /// or a page error if it could not be mounted.
    fn execute(&self, page: &dyn Page, container: NodeId, body: &str) -> Result<()>;
}

// ============================================================================
// ScriptNodeExecutor
// ============================================================================

/// Mounts a `<script type="text/javascript">` node at the end of the
/// container, which makes the page run it.
///
/// Every call mounts a fresh node, so rendering a tab twice runs its script
/// twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptNodeExecutor;

impl ScriptNodeExecutor {
    /// Creates the executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ScriptExecutor for ScriptNodeExecutor {
    fn execute(&self, page: &dyn Page, container: NodeId, body: &str) -> Result<()> {
        debug!(container = %container, script_len = body.len(), "Mounting tab script");

        let script = page.create_element("script");
        page.set_attribute(script, "type", "text/javascript")?;
        page.set_text(script, body)?;
        page.append_child(container, script)
    }
}

// ============================================================================
// Tests
// ============================================================================
