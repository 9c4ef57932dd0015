//! Builder for the tab injector.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use custom_tabs::{CustomTabs, MemoryPage, PluginOptions};
//!
//! # fn example() -> custom_tabs::Result<()> {
//! let page = Arc::new(MemoryPage::new());
//! let tabs = CustomTabs::builder()
//!     .page(page)
//!     .options(PluginOptions::new().with_poll_budget(50))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::config::PluginOptions;
use crate::context::PluginContext;
use crate::error::{Error, Result};
use crate::navigation::{SignalAdapter, default_adapters};
use crate::page::Page;
use crate::script::{ScriptExecutor, ScriptNodeExecutor};

use super::core::CustomTabs;

// ============================================================================
// CustomTabsBuilder
// ============================================================================

/// Builder for [`CustomTabs`].
///
/// Use [`CustomTabs::builder()`] to create one.
#[derive(Default)]
pub struct CustomTabsBuilder {
    /// Host page.
    page: Option<Arc<dyn Page>>,
    /// Script executor, [`ScriptNodeExecutor`] if unset.
    executor: Option<Arc<dyn ScriptExecutor>>,
    /// Options.
    options: PluginOptions,
    /// Signal adapters, [`default_adapters`] if unset.
    adapters: Option<Vec<Box<dyn SignalAdapter>>>,
}

impl fmt::Debug for CustomTabsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTabsBuilder")
            .field("has_page", &self.page.is_some())
            .field("has_executor", &self.executor.is_some())
            .field("options", &self.options)
            .field(
                "adapters",
                &self
                    .adapters
                    .as_ref()
                    .map(|a| a.iter().map(|a| a.name()).collect::<Vec<_>>()),
            )
            .finish()
    }
}

// ============================================================================
// CustomTabsBuilder Implementation
// ============================================================================

impl CustomTabsBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host page.
    #[inline]
    #[must_use]
    pub fn page(mut self, page: Arc<dyn Page>) -> Self {
        self.page = Some(page);
        self
    }

    /// Sets the script executor.
    #[inline]
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn ScriptExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: PluginOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the signal adapters.
    #[inline]
    #[must_use]
    pub fn adapters(mut self, adapters: Vec<Box<dyn SignalAdapter>>) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Adds one signal adapter to the defaults (or to those already set).
    #[must_use]
    pub fn adapter(mut self, adapter: impl SignalAdapter + 'static) -> Self {
        self.adapters
            .get_or_insert_with(default_adapters)
            .push(Box::new(adapter));
        self
    }

    /// Builds the injector. Nothing runs until [`CustomTabs::start`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no page was set or the options are
    /// invalid.
    pub fn build(self) -> Result<CustomTabs> {
        let page = self.page.ok_or_else(|| {
            Error::config(
                "Host page is required. Use .page() to set it.\n\
                 Example: CustomTabs::builder().page(Arc::new(MemoryPage::new()))",
            )
        })?;
        self.options.validate()?;

        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(ScriptNodeExecutor::new()));
        let adapters = self.adapters.unwrap_or_else(default_adapters);

        let context = PluginContext::new(self.options, page, executor);
        Ok(CustomTabs::new(context, adapters))
    }
}

// ============================================================================
// Tests
// ============================================================================
