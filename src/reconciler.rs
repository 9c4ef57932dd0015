//! Tab reconciler.
//!
//! One reconciliation pass fetches the tab definitions and builds the tab
//! buttons and content container under the host's tab slider. A pass either
//! finds the tabs already present, builds them all, or aborts. A pass that
//! fails partway through the buttons removes the ones it added, so the next
//! pass starts clean.
//!
//! # Pass
//!
//! | Step | Action | Abort outcome |
//! |------|--------|---------------|
//! | 0 | Take the reentrancy guard | [`ReconcileOutcome::Busy`] |
//! | 1 | Look for injected buttons under the slider | [`ReconcileOutcome::AlreadyPresent`] |
//! | 2 | Clear the registry | |
//! | 3 | Fetch definitions | [`ReconcileOutcome::FetchFailed`] |
//! | 4 | Re-query the slider | [`ReconcileOutcome::SliderLost`] |
//! | 5 | Find or insert the container | [`ReconcileOutcome::ContainerUnavailable`] |
//! | 6 | Build buttons, register definitions | [`ReconcileOutcome::ButtonFailed`] |
//! | 7 | Wire click handlers | |
//! | 8 | Render the first tab | |

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use tracing::{debug, error, info, trace, warn};

use crate::client::fetch_tab_definitions;
use crate::context::{PluginContext, ReconcileGuard};
use crate::error::{Error, Result};
use crate::identifiers::{NodeId, TabKey};
use crate::page::{By, Page};
use crate::registry::PluginPhase;
use crate::renderer::render_tab_content;

// ============================================================================
// Constants
// ============================================================================

/// Classes on each injected button, matching the host's own tabs.
const BUTTON_CLASSES: [&str; 2] = ["emby-tab-button", "emby-button"];

/// Class on the title element inside each button.
const TITLE_CLASS: &str = "emby-button-foreground";

/// Custom element the host uses for its tab buttons.
const BUTTON_IS: &str = "empty-button";

// ============================================================================
// ReconcileOutcome
// ============================================================================

/// How a reconciliation pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Buttons were built.
    Created {
        /// Buttons added by this pass.
        count: usize,
    },
    /// Injected buttons were already under the slider.
    AlreadyPresent,
    /// Another pass is running.
    Busy,
    /// No tab slider in the document.
    SliderMissing,
    /// The host has no API client.
    ApiClientMissing,
    /// The config fetch failed.
    FetchFailed {
        /// Failure description.
        message: String,
    },
    /// The slider disappeared while the fetch was in flight.
    SliderLost,
    /// The content container could not be found or created.
    ContainerUnavailable {
        /// Failure description.
        message: String,
    },
    /// A button could not be added; buttons from this pass were removed.
    ButtonFailed {
        /// The tab whose button failed.
        tab: TabKey,
        /// Failure description.
        message: String,
    },
}

impl ReconcileOutcome {
    /// Returns `true` if the tabs are in place after this pass.
    #[inline]
    #[must_use]
    pub fn has_tabs(&self) -> bool {
        matches!(self, Self::Created { .. } | Self::AlreadyPresent)
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Runs one reconciliation pass.
///
/// Never fails outward; every abort is logged and reported in the outcome.
pub async fn create_custom_tabs(context: &Arc<PluginContext>) -> ReconcileOutcome {
    let Some(_guard) = ReconcileGuard::try_acquire(context) else {
        debug!("Reconciliation already running, skipping");
        return ReconcileOutcome::Busy;
    };

    let page = context.page();
    let options = context.options();
    let slider_selector = context.slider_selector();

    let Some(slider) = page.query(&slider_selector) else {
        warn!("Tab slider not found");
        return ReconcileOutcome::SliderMissing;
    };

    if page
        .query_within(slider, &context.injected_selector())
        .is_some()
    {
        debug!("Custom tabs already exist, skipping");
        context.set_phase(PluginPhase::TabsCreated);
        return ReconcileOutcome::AlreadyPresent;
    }

    context.state.lock().registry.clear();

    let Some(client) = page.api_client() else {
        warn!("API client not available");
        return ReconcileOutcome::ApiClientMissing;
    };

    let definitions = match fetch_tab_definitions(client.as_ref(), &options.config_path).await {
        Ok(definitions) => definitions,
        Err(e) => {
            error!(error = %e, "Error fetching tab definitions");
            return ReconcileOutcome::FetchFailed {
                message: e.to_string(),
            };
        }
    };

    let Some(slider) = page.query(&slider_selector) else {
        warn!("Tab slider disappeared during fetch");
        return ReconcileOutcome::SliderLost;
    };

    let container = match ensure_container(context, slider) {
        Ok(container) => container,
        Err(e) => {
            error!(error = %e, "Content container unavailable");
            return ReconcileOutcome::ContainerUnavailable {
                message: e.to_string(),
            };
        }
    };
    context.state.lock().container = Some(container);

    let fetched = definitions.len();
    let mut buttons: Vec<(TabKey, NodeId)> = Vec::with_capacity(fetched);

    for (index, definition) in definitions.into_iter().enumerate() {
        let key = TabKey::new(&options.tab_id_prefix, index);
        if page.query(&By::id(key.as_str())).is_some() {
            debug!(tab = %key, "Tab already exists, skipping");
            continue;
        }

        match build_button(context, slider, &key, index, &definition.title) {
            Ok(button) => {
                debug!(tab = %key, title = %definition.title, "Added tab");
                context.state.lock().registry.insert(key.clone(), definition);
                buttons.push((key, button));
            }
            Err(e) => {
                error!(tab = %key, error = %e, "Failed to add tab button, rolling back");
                roll_back(context, &buttons);
                return ReconcileOutcome::ButtonFailed {
                    tab: key,
                    message: e.to_string(),
                };
            }
        }
    }

    let weak = Arc::downgrade(context);
    for (key, button) in &buttons {
        if let Err(e) = attach_click(page, &weak, key, *button) {
            warn!(tab = %key, error = %e, "Failed to attach click handler");
        }
    }

    if fetched > 0 {
        render_tab_content(context, &TabKey::new(&options.tab_id_prefix, 0));
    }

    context.set_phase(PluginPhase::TabsCreated);
    info!(count = buttons.len(), fetched, "Custom tabs created");
    ReconcileOutcome::Created {
        count: buttons.len(),
    }
}

// ============================================================================
// Document Building
// ============================================================================

/// Finds the content container, or inserts one right after the slider.
fn ensure_container(context: &PluginContext, slider: NodeId) -> Result<NodeId> {
    let page = context.page();
    if let Some(existing) = page.query(&context.container_selector()) {
        return Ok(existing);
    }

    let options = context.options();
    let container = page.create_element("div");
    let build = || -> Result<()> {
        page.set_attribute(container, "id", &options.container_id)?;
        page.set_style(container, "padding", &options.container_padding)?;
        page.set_style(container, "min-height", &options.container_min_height)?;
        page.insert_after(slider, container)
    };
    build().map_err(|e| Error::container_unavailable(e.to_string()))?;

    debug!(container = %container, "Created content container");
    Ok(container)
}

/// Builds one tab button and appends it to the slider.
fn build_button(
    context: &PluginContext,
    slider: NodeId,
    key: &TabKey,
    index: usize,
    title: &str,
) -> Result<NodeId> {
    let page = context.page();
    let data_index = index + context.options().index_offset;

    let title_node = page.create_element("div");
    let button = page.create_element("button");
    let assemble = || -> Result<()> {
        page.add_class(title_node, TITLE_CLASS)?;
        page.set_text(title_node, title)?;
        page.set_attribute(button, "type", "button")?;
        page.set_attribute(button, "is", BUTTON_IS)?;
        for class in BUTTON_CLASSES {
            page.add_class(button, class)?;
        }
        page.set_attribute(button, "data-index", &data_index.to_string())?;
        page.set_attribute(button, "id", key.as_str())?;
        page.append_child(button, title_node)?;
        page.append_child(slider, button)
    };

    if let Err(e) = assemble() {
        // The title may already be gone with the button's subtree.
        for node in [button, title_node] {
            if page.remove_node(node).is_err() {
                trace!(node_id = %node, "Partial button node already discarded");
            }
        }
        return Err(e);
    }
    Ok(button)
}

/// Removes the buttons added by the current pass and forgets their tabs.
fn roll_back(context: &PluginContext, buttons: &[(TabKey, NodeId)]) {
    let page = context.page();
    for (key, button) in buttons {
        if let Err(e) = page.remove_node(*button) {
            warn!(tab = %key, error = %e, "Failed to remove tab button");
        }
    }
    context.state.lock().registry.clear();
}

/// Renders `key` whenever `button` is clicked.
fn attach_click(
    page: &dyn Page,
    context: &Weak<PluginContext>,
    key: &TabKey,
    button: NodeId,
) -> Result<()> {
    let context = Weak::clone(context);
    let key = key.clone();
    page.add_click_listener(
        button,
        Arc::new(move || {
            if let Some(context) = context.upgrade() {
                render_tab_content(&context, &key);
            }
        }),
    )
}

// ============================================================================
// Tests
// ============================================================================
