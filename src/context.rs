//! Shared context for one page session.
//!
//! The controller creates exactly one [`PluginContext`] and passes it to
//! every component operation. Nothing in the crate reads ambient globals.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::PluginOptions;
use crate::page::{By, Page};
use crate::registry::{PluginPhase, PluginState};
use crate::script::ScriptExecutor;

// ============================================================================
// PluginContext
// ============================================================================

/// Everything a cycle needs: options, host page, script executor, state.
pub struct PluginContext {
    /// Validated options.
    pub(crate) options: PluginOptions,
    /// Host page.
    pub(crate) page: Arc<dyn Page>,
    /// Runs tab scripts.
    pub(crate) executor: Arc<dyn ScriptExecutor>,
    /// Registry, container handle, current tab, phase.
    pub(crate) state: Mutex<PluginState>,
    /// Held from before the config fetch until the pass ends.
    pub(crate) reconciling: AtomicBool,
    /// Bumped by every cycle that starts polling.
    pub(crate) poll_generation: Arc<AtomicU64>,
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("phase", &self.phase())
            .field("reconciling", &self.is_reconciling())
            .field("poll_generation", &self.poll_generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl PluginContext {
    /// Creates a context with fresh state.
    #[must_use]
    pub fn new(
        options: PluginOptions,
        page: Arc<dyn Page>,
        executor: Arc<dyn ScriptExecutor>,
    ) -> Self {
        Self {
            options,
            page,
            executor,
            state: Mutex::new(PluginState::new()),
            reconciling: AtomicBool::new(false),
            poll_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Returns the host page.
    #[inline]
    #[must_use]
    pub fn page(&self) -> &dyn Page {
        self.page.as_ref()
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn state(&self) -> PluginState {
        self.state.lock().clone()
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PluginPhase {
        self.state.lock().phase
    }

    /// Sets the lifecycle phase.
    pub(crate) fn set_phase(&self, phase: PluginPhase) {
        self.state.lock().phase = phase;
    }

    /// Returns `true` while a reconciliation pass holds the guard.
    #[inline]
    #[must_use]
    pub fn is_reconciling(&self) -> bool {
        self.reconciling.load(Ordering::SeqCst)
    }

    /// Selector for the host tab slider.
    #[must_use]
    pub fn slider_selector(&self) -> By {
        By::class(self.options.slider_class.as_str())
    }

    /// Selector for any injected tab button.
    #[must_use]
    pub fn injected_selector(&self) -> By {
        By::id_prefix(self.options.tab_id_prefix.as_str())
    }

    /// Selector for the content container.
    #[must_use]
    pub fn container_selector(&self) -> By {
        By::id(self.options.container_id.as_str())
    }
}

// ============================================================================
// ReconcileGuard
// ============================================================================

/// Exclusive right to run a reconciliation pass.
///
/// Released on drop, whichever way the pass ends.
pub(crate) struct ReconcileGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ReconcileGuard<'a> {
    /// Takes the guard, or returns `None` if another pass holds it.
    pub(crate) fn try_acquire(context: &'a PluginContext) -> Option<Self> {
        context
            .reconciling
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag: &context.reconciling,
            })
    }
}

impl Drop for ReconcileGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MemoryPage;
    use crate::script::ScriptNodeExecutor;

    fn context() -> PluginContext {
        PluginContext::new(
            PluginOptions::new(),
            Arc::new(MemoryPage::new()),
            Arc::new(ScriptNodeExecutor::new()),
        )
    }

    #[test]
    fn test_guard_is_exclusive() {
        let ctx = context();
        let guard = ReconcileGuard::try_acquire(&ctx).expect("first acquire");
        assert!(ctx.is_reconciling());
        assert!(ReconcileGuard::try_acquire(&ctx).is_none());

        drop(guard);
        assert!(!ctx.is_reconciling());
        assert!(ReconcileGuard::try_acquire(&ctx).is_some());
    }

    #[test]
    fn test_selectors_follow_options() {
        let ctx = context();
        assert_eq!(ctx.slider_selector().to_css(), ".emby-tabs-slider");
        assert_eq!(ctx.injected_selector().to_css(), "[id^=\"tab_\"]");
        assert_eq!(ctx.container_selector().to_css(), "#customTabContentContainer");
    }

    #[test]
    fn test_initial_phase() {
        assert_eq!(context().phase(), PluginPhase::NotInitialized);
    }
}
