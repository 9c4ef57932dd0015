//! Content renderer.
//!
//! Mounts one tab's content into the shared container. Markup is written
//! verbatim and the tab's script, if any, runs on every render. Nothing
//! here fails outward: a missing container is a no-op, an unknown tab shows
//! the fallback message, and script failures are logged.

// ============================================================================
// Imports
// ============================================================================

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, warn};

use crate::context::PluginContext;
use crate::identifiers::{NodeId, TabKey};

// ============================================================================
// RenderOutcome
// ============================================================================

/// What a render call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The tab's markup is mounted.
    Rendered {
        /// Whether a script ran.
        script_ran: bool,
    },
    /// Markup is mounted but the script failed.
    ScriptFailed {
        /// Failure description.
        message: String,
    },
    /// The key is not registered; the fallback message is shown.
    Fallback,
    /// No attached container; nothing changed.
    NoContainer,
}

impl RenderOutcome {
    /// Returns `true` if the container now shows the tab's markup.
    #[inline]
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered { .. } | Self::ScriptFailed { .. })
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Shows the content of `key` in the shared container.
pub fn render_tab_content(context: &PluginContext, key: &TabKey) -> RenderOutcome {
    let page = context.page();

    let (container, definition) = {
        let state = context.state.lock();
        (state.container, state.registry.get(key))
    };

    let Some(container) = container.filter(|node| page.contains(*node)) else {
        debug!(tab = %key, "No content container, skipping render");
        return RenderOutcome::NoContainer;
    };

    let Some(definition) = definition else {
        warn!(tab = %key, "No content found for tab");
        if let Err(e) = page.set_inner_html(container, &context.options.fallback_markup) {
            debug!(tab = %key, error = %e, "Container vanished before fallback");
            return RenderOutcome::NoContainer;
        }
        context.state.lock().current_tab = None;
        return RenderOutcome::Fallback;
    };

    if let Err(e) = page.set_inner_html(container, &definition.content_markup) {
        debug!(tab = %key, error = %e, "Container vanished before render");
        return RenderOutcome::NoContainer;
    }
    context.state.lock().current_tab = Some(key.clone());

    if !definition.has_script() {
        debug!(tab = %key, "Rendered tab");
        return RenderOutcome::Rendered { script_ran: false };
    }

    run_script(context, container, key, &definition.content_script)
}

fn run_script(
    context: &PluginContext,
    container: NodeId,
    key: &TabKey,
    body: &str,
) -> RenderOutcome {
    let executed = catch_unwind(AssertUnwindSafe(|| {
        context.executor.execute(context.page(), container, body)
    }));

    match executed {
        Ok(Ok(())) => {
            debug!(tab = %key, "Rendered tab with script");
            RenderOutcome::Rendered { script_ran: true }
        }
        Ok(Err(e)) => {
            error!(tab = %key, error = %e, "Error executing tab script");
            RenderOutcome::ScriptFailed {
                message: e.to_string(),
            }
        }
        Err(_) => {
            error!(tab = %key, "Tab script executor panicked");
            RenderOutcome::ScriptFailed {
                message: "script executor panicked".to_string(),
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::TabDefinition;
    use crate::config::PluginOptions;
    use crate::error::Result;
    use crate::page::{By, MemoryPage, Page};
    use crate::script::{ScriptExecutor, ScriptNodeExecutor};
    use std::sync::Arc;

    struct PanickingExecutor;

    impl ScriptExecutor for PanickingExecutor {
        fn execute(&self, _page: &dyn Page, _container: NodeId, _body: &str) -> Result<()> {
            panic!("engine crashed");
        }
    }

    fn setup_with(
        executor: Arc<dyn ScriptExecutor>,
    ) -> (Arc<MemoryPage>, PluginContext, NodeId) {
        let page = Arc::new(MemoryPage::with_body(
            r#"<div class="emby-tabs-slider"></div><div id="customTabContentContainer"></div>"#,
        ));
        let container = page.query(&By::id("customTabContentContainer")).unwrap();
        let ctx = PluginContext::new(PluginOptions::new(), page.clone(), executor);
        {
            let mut state = ctx.state.lock();
            state.container = Some(container);
            state
                .registry
                .insert(TabKey::new("tab_", 0), TabDefinition::new("Info", "<p>hi</p>", ""));
            state.registry.insert(
                TabKey::new("tab_", 1),
                TabDefinition::new("Stats", "<div id=\"s\"></div>", "count()"),
            );
        }
        (page, ctx, container)
    }

    fn setup() -> (Arc<MemoryPage>, PluginContext, NodeId) {
        setup_with(Arc::new(ScriptNodeExecutor::new()))
    }

    #[test]
    fn test_renders_markup_verbatim() {
        let (page, ctx, container) = setup();

        let outcome = render_tab_content(&ctx, &TabKey::new("tab_", 0));
        assert_eq!(outcome, RenderOutcome::Rendered { script_ran: false });
        assert_eq!(page.inner_html(container).as_deref(), Some("<p>hi</p>"));
        assert_eq!(ctx.state().current_tab, Some(TabKey::new("tab_", 0)));
        assert!(page.executed_scripts().is_empty());
    }

    #[test]
    fn test_script_runs_on_every_render() {
        let (page, ctx, _) = setup();
        let key = TabKey::new("tab_", 1);

        assert_eq!(
            render_tab_content(&ctx, &key),
            RenderOutcome::Rendered { script_ran: true }
        );
        assert_eq!(page.executed_scripts(), vec!["count()".to_string()]);

        render_tab_content(&ctx, &key);
        assert_eq!(page.executed_scripts().len(), 2);
    }

    #[test]
    fn test_unknown_key_shows_fallback() {
        let (page, ctx, container) = setup();
        render_tab_content(&ctx, &TabKey::new("tab_", 0));

        let outcome = render_tab_content(&ctx, &TabKey::from_raw("tab_9"));
        assert_eq!(outcome, RenderOutcome::Fallback);
        assert_eq!(
            page.inner_html(container).as_deref(),
            Some("<p>No content available.</p>")
        );
        assert_eq!(ctx.state().current_tab, None);
    }

    #[test]
    fn test_no_container_is_noop() {
        let (page, ctx, container) = setup();
        ctx.state.lock().container = None;
        assert_eq!(
            render_tab_content(&ctx, &TabKey::new("tab_", 0)),
            RenderOutcome::NoContainer
        );
        assert_eq!(page.inner_html(container).as_deref(), Some(""));
    }

    #[test]
    fn test_detached_container_is_noop() {
        let (page, ctx, container) = setup();
        page.remove(container);
        assert_eq!(
            render_tab_content(&ctx, &TabKey::new("tab_", 1)),
            RenderOutcome::NoContainer
        );
        assert!(page.executed_scripts().is_empty());
    }

    #[test]
    fn test_script_error_keeps_markup() {
        let (page, ctx, container) = setup();
        page.set_script_hook(Arc::new(|_: &MemoryPage, _: &str| {
            Err("ReferenceError: count".into())
        }));

        let outcome = render_tab_content(&ctx, &TabKey::new("tab_", 1));
        assert!(matches!(outcome, RenderOutcome::ScriptFailed { .. }));
        assert!(outcome.is_rendered());
        assert!(
            page.inner_html(container)
                .unwrap()
                .starts_with("<div id=\"s\"></div>")
        );
    }

    #[test]
    fn test_executor_panic_is_contained() {
        let (page, ctx, container) = setup_with(Arc::new(PanickingExecutor));

        let outcome = render_tab_content(&ctx, &TabKey::new("tab_", 1));
        assert_eq!(
            outcome,
            RenderOutcome::ScriptFailed {
                message: "script executor panicked".to_string()
            }
        );
        assert_eq!(
            page.inner_html(container).as_deref(),
            Some("<div id=\"s\"></div>")
        );
    }
}
