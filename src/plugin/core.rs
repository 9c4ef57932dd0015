//! Tab injector controller.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use custom_tabs::{CustomTabs, MemoryPage};
//!
//! # async fn example() -> custom_tabs::Result<()> {
//! let page = Arc::new(MemoryPage::new());
//! let tabs = CustomTabs::builder().page(page.clone()).build()?;
//!
//! tabs.start();
//! if let Some(sender) = tabs.event_sender() {
//!     page.connect_events(sender);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::PluginOptions;
use crate::context::PluginContext;
use crate::error::{Error, Result};
use crate::identifiers::{SubscriptionId, TabKey};
use crate::navigation::{
    HostEvent, NavigationDispatcher, NavigationSignal, NavigationWatcher, SignalAdapter,
};
use crate::registry::{PluginPhase, PluginState};
use crate::renderer::{RenderOutcome, render_tab_content};

use super::builder::CustomTabsBuilder;
use super::cycle::{CycleReport, run_cycle, schedule_cycle};

// ============================================================================
// CustomTabs
// ============================================================================

/// Injects configured tabs into the host page and keeps them there.
///
/// Owns the page session's [`PluginContext`], the navigation dispatcher and,
/// once started, the navigation watcher.
pub struct CustomTabs {
    /// Page session context.
    context: Arc<PluginContext>,
    /// Navigation subscription interface.
    dispatcher: Arc<NavigationDispatcher>,
    /// Adapters handed to the watcher on start.
    adapters: Mutex<Option<Vec<Box<dyn SignalAdapter>>>>,
    /// Running watcher.
    watcher: Mutex<Option<NavigationWatcher>>,
    /// The controller's own navigation subscription.
    subscription: Mutex<Option<SubscriptionId>>,
}

impl fmt::Debug for CustomTabs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTabs")
            .field("context", &self.context)
            .field("started", &self.is_started())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// CustomTabs - Construction
// ============================================================================

impl CustomTabs {
    /// Creates a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> CustomTabsBuilder {
        CustomTabsBuilder::new()
    }

    pub(crate) fn new(context: PluginContext, adapters: Vec<Box<dyn SignalAdapter>>) -> Self {
        Self {
            context: Arc::new(context),
            dispatcher: Arc::new(NavigationDispatcher::new()),
            adapters: Mutex::new(Some(adapters)),
            watcher: Mutex::new(None),
            subscription: Mutex::new(None),
        }
    }
}

// ============================================================================
// CustomTabs - Lifecycle
// ============================================================================

impl CustomTabs {
    /// Installs the injector: subscribes to navigation, starts the watcher
    /// and runs the first cycle, or defers it to `DOMContentLoaded` while
    /// the document is loading.
    ///
    /// Returns `false` if already started. Must be called from within a
    /// tokio runtime.
    pub fn start(&self) -> bool {
        {
            let mut state = self.context.state.lock();
            if state.initialized {
                debug!("Custom tabs already started");
                return false;
            }
            state.initialized = true;
        }

        let weak = Arc::downgrade(&self.context);
        let subscription = self.dispatcher.on_navigate(move |signal: NavigationSignal| {
            if let Some(context) = weak.upgrade() {
                let delay = signal.settle_delay(context.options());
                schedule_cycle(context, delay, signal.as_str());
            }
        });
        *self.subscription.lock() = Some(subscription);

        let adapters = self.adapters.lock().take().unwrap_or_default();
        let watcher = NavigationWatcher::spawn(Arc::clone(&self.dispatcher), adapters);
        *self.watcher.lock() = Some(watcher);

        if self.context.page().is_loading() {
            debug!("Document loading, waiting for DOMContentLoaded");
        } else {
            schedule_cycle(Arc::clone(&self.context), Duration::ZERO, "startup");
        }

        info!("Custom tabs started");
        true
    }

    /// Returns `true` once [`start`](Self::start) has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.context.state.lock().initialized
    }

    /// Returns the sender a host binding pushes events into.
    ///
    /// `None` until started or after shutdown.
    #[must_use]
    pub fn event_sender(&self) -> Option<mpsc::UnboundedSender<HostEvent>> {
        self.watcher.lock().as_ref().map(NavigationWatcher::sender)
    }

    /// Feeds one host event to the watcher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the watcher is not running.
    pub fn notify(&self, event: HostEvent) -> Result<()> {
        match self.watcher.lock().as_ref() {
            Some(watcher) => watcher.notify(event),
            None => Err(Error::ChannelClosed),
        }
    }

    /// Stops reacting to navigation. Cycles already scheduled still run.
    pub fn shutdown(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.dispatcher.unsubscribe(id);
        }
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.shutdown();
        }
        info!("Custom tabs shut down");
    }
}

// ============================================================================
// CustomTabs - Operations
// ============================================================================

impl CustomTabs {
    /// Runs one cycle now and waits for it.
    pub async fn run_cycle(&self) -> CycleReport {
        run_cycle(&self.context, "manual").await
    }

    /// Runs one cycle on its own task after `delay`.
    pub fn schedule_cycle(&self, delay: Duration) -> JoinHandle<Option<CycleReport>> {
        schedule_cycle(Arc::clone(&self.context), delay, "manual")
    }

    /// Shows a tab's content in the container.
    pub fn render_tab_content(&self, key: &TabKey) -> RenderOutcome {
        render_tab_content(&self.context, key)
    }

    /// Subscribes to navigation signals.
    pub fn on_navigate<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(NavigationSignal) + Send + Sync + 'static,
    {
        self.dispatcher.on_navigate(handler)
    }
}

// ============================================================================
// CustomTabs - Accessors
// ============================================================================

impl CustomTabs {
    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> PluginPhase {
        self.context.phase()
    }

    /// Returns a snapshot of the state.
    #[must_use]
    pub fn state(&self) -> PluginState {
        self.context.state()
    }

    /// Returns the options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &PluginOptions {
        self.context.options()
    }

    /// Returns the page session context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &Arc<PluginContext> {
        &self.context
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MemoryApiClient, TabDefinition};
    use crate::page::{By, MemoryPage, Page};
    use proptest::prelude::*;
    use regex::Regex;
    use tokio::time::sleep;

    const HOST: &str = r#"<div class="tabs"><div class="emby-tabs-slider"><button id="home">Home</button></div></div>"#;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn scenario_definitions() -> Vec<TabDefinition> {
        vec![
            TabDefinition::new("Info", "<p>hi</p>", ""),
            TabDefinition::new(
                "Stats",
                "<div id='s'></div>",
                "document.getElementById('s').innerText='42'",
            ),
        ]
    }

    /// Understands `document.getElementById('x').innerText='y'` and nothing else.
    fn install_script_engine(page: &MemoryPage) {
        let pattern =
            Regex::new(r"document\.getElementById\('([^']+)'\)\.innerText\s*=\s*'([^']*)'")
                .unwrap();
        page.set_script_hook(Arc::new(move |page: &MemoryPage, body: &str| {
            let captures = pattern
                .captures(body)
                .ok_or_else(|| format!("SyntaxError: {body}"))?;
            let node = page
                .query(&By::id(&captures[1]))
                .ok_or_else(|| "TypeError: element is null".to_string())?;
            page.set_text(node, &captures[2]).map_err(|e| e.to_string())
        }));
    }

    struct Harness {
        page: Arc<MemoryPage>,
        client: Arc<MemoryApiClient>,
        tabs: CustomTabs,
    }

    impl Harness {
        fn new(definitions: &[TabDefinition]) -> Self {
            Self::with_options(definitions, PluginOptions::new())
        }

        fn with_options(definitions: &[TabDefinition], options: PluginOptions) -> Self {
            init_tracing();
            let page = Arc::new(MemoryPage::with_body(HOST));
            install_script_engine(&page);
            let client =
                Arc::new(MemoryApiClient::new("http://media.local/emby/", definitions).unwrap());
            page.install_api_client(client.clone());
            let tabs = CustomTabs::builder()
                .page(page.clone())
                .options(options)
                .build()
                .unwrap();
            Self { page, client, tabs }
        }

        fn start(&self) {
            assert!(self.tabs.start());
            self.page.connect_events(self.tabs.event_sender().unwrap());
        }

        fn tab_count(&self) -> usize {
            self.page.count(&By::id_prefix("tab_"))
        }

        fn container_html(&self) -> Option<String> {
            let container = self.page.query(&By::id("customTabContentContainer"))?;
            self.page.inner_html(container)
        }
    }

    async fn advance(ms: u64) {
        sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        assert!(!h.tabs.start());
        assert_eq!(h.tabs.dispatcher.handler_count(), 1);

        advance(10).await;
        assert_eq!(h.tab_count(), 2);
        assert_eq!(h.client.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_two_tabs() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        advance(10).await;

        assert_eq!(h.tabs.phase(), PluginPhase::TabsCreated);
        assert_eq!(h.tab_count(), 2);
        assert_eq!(h.container_html().as_deref(), Some("<p>hi</p>"));

        h.page.click_id("tab_1").unwrap();
        let s = h.page.query(&By::id("s")).unwrap();
        assert_eq!(h.page.text_content(s).as_deref(), Some("42"));
        assert_eq!(h.tabs.state().current_tab, Some(TabKey::new("tab_", 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cycle_twice_is_idempotent() {
        let h = Harness::new(&scenario_definitions());

        let first = h.tabs.run_cycle().await;
        assert!(first.has_tabs());
        let after_first = h.page.body_html();

        let second = h.tabs.run_cycle().await;
        assert!(second.has_tabs());
        assert_eq!(h.page.body_html(), after_first);
        assert_eq!(h.client.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_runs_once_per_render() {
        let h = Harness::new(&scenario_definitions());
        h.tabs.run_cycle().await;
        assert!(h.page.executed_scripts().is_empty());

        let stats = TabKey::new("tab_", 1);
        h.tabs.render_tab_content(&stats);
        assert_eq!(h.page.executed_scripts().len(), 1);

        h.tabs.render_tab_content(&stats);
        assert_eq!(h.page.executed_scripts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_tab_shows_fallback() {
        let h = Harness::new(&scenario_definitions());
        h.tabs.run_cycle().await;

        let outcome = h.tabs.render_tab_content(&TabKey::from_raw("tab_7"));
        assert_eq!(outcome, RenderOutcome::Fallback);
        assert_eq!(
            h.container_html().as_deref(),
            Some("<p>No content available.</p>")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ineligible_route_creates_nothing() {
        let h = Harness::new(&scenario_definitions());
        h.page.set_hash("#/movies");
        h.start();

        advance(1000).await;
        assert_eq!(h.tab_count(), 0);
        assert_eq!(h.client.request_count(), 0);
        assert!(h.container_html().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_then_retry_on_navigation() {
        let h = Harness::new(&scenario_definitions());
        h.client.fail_next("network error");
        let before = h.page.body_html();

        h.start();
        advance(10).await;
        assert_eq!(h.tab_count(), 0);
        assert_eq!(h.page.body_html(), before);
        assert_eq!(h.client.request_count(), 1);

        h.page.push_state("#/home");
        advance(799).await;
        assert_eq!(h.tab_count(), 0);

        advance(2).await;
        assert_eq!(h.tab_count(), 2);
        assert_eq!(h.client.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_router_rerender_restores_tabs() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        advance(10).await;
        assert_eq!(h.tab_count(), 2);

        h.page.set_body(HOST);
        assert_eq!(h.tab_count(), 0);

        h.page.pop_state("#/home.html");
        advance(801).await;
        assert_eq!(h.tab_count(), 2);
        assert_eq!(h.container_html().as_deref(), Some("<p>hi</p>"));
        assert_eq!(h.page.count(&By::id("customTabContentContainer")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_subscriber_keeps_watcher_alive() {
        let h = Harness::new(&scenario_definitions());
        h.tabs.on_navigate(|signal| {
            if signal == NavigationSignal::Focus {
                panic!("subscriber failed on focus");
            }
        });
        h.start();
        advance(10).await;
        assert_eq!(h.tab_count(), 2);

        h.page.focus();
        advance(10).await;

        h.page.set_body(HOST);
        h.page.push_state("#/home");
        advance(2000).await;
        assert_eq!(h.tab_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_touch_gesture_waits_longer() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        advance(10).await;
        h.page.set_body(HOST);

        h.page.touch_end();
        advance(2000).await;
        assert_eq!(h.tab_count(), 0);

        h.page.touch_start();
        h.page.touch_end();
        advance(999).await;
        assert_eq!(h.tab_count(), 0);

        advance(2).await;
        assert_eq!(h.tab_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_regained() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        advance(10).await;
        h.page.set_body(HOST);

        h.page.set_hidden(true);
        advance(1000).await;
        assert_eq!(h.tab_count(), 0);

        h.page.set_hidden(false);
        advance(299).await;
        assert_eq!(h.tab_count(), 0);

        advance(2).await;
        assert_eq!(h.tab_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_dom_content_loaded() {
        let h = Harness::new(&scenario_definitions());
        h.page.set_loading(true);
        h.start();

        advance(500).await;
        assert_eq!(h.tab_count(), 0);
        assert_eq!(h.tabs.phase(), PluginPhase::NotInitialized);

        h.page.dom_content_loaded();
        advance(1).await;
        assert_eq!(h.tab_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_client_defined() {
        let h = Harness::new(&scenario_definitions());
        h.page.remove_api_client();
        h.start();

        advance(1000).await;
        assert_eq!(h.tabs.phase(), PluginPhase::WaitingForUi);
        assert_eq!(h.tab_count(), 0);

        h.page.install_api_client(h.client.clone());
        advance(201).await;
        assert_eq!(h.tab_count(), 2);
        assert_eq!(h.tabs.phase(), PluginPhase::TabsCreated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_triggers_converge() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        advance(10).await;
        h.page.set_body(HOST);

        h.page.focus();
        h.page.page_show();
        h.page.replace_state("");
        advance(1000).await;

        assert_eq!(h.tab_count(), 2);
        assert_eq!(h.page.count(&By::id("customTabContentContainer")), 1);
        assert_eq!(h.client.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_reacting() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        advance(10).await;

        h.tabs.shutdown();
        assert!(h.tabs.event_sender().is_none());
        assert!(matches!(
            h.tabs.notify(HostEvent::Focus),
            Err(Error::ChannelClosed)
        ));

        h.page.set_body(HOST);
        h.page.push_state("");
        advance(2000).await;
        assert_eq!(h.tab_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_schedules_cycle() {
        let h = Harness::new(&scenario_definitions());
        h.start();
        advance(10).await;
        h.page.set_body(HOST);

        h.tabs.notify(HostEvent::Focus).unwrap();
        advance(801).await;
        assert_eq!(h.tab_count(), 2);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_one_button_per_definition(titles in prop::collection::vec("[A-Za-z ]{1,12}", 0..10)) {
            let definitions: Vec<TabDefinition> = titles
                .iter()
                .map(|title| TabDefinition::new(title.clone(), "<p>x</p>", ""))
                .collect();
            let h = Harness::new(&definitions);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let report = runtime.block_on(h.tabs.run_cycle());
            prop_assert!(report.has_tabs());

            prop_assert_eq!(h.tab_count(), titles.len());
            for (index, title) in titles.iter().enumerate() {
                let button = h.page.query(&By::id(format!("tab_{index}"))).unwrap();
                let data_index = (index + 2).to_string();
                prop_assert_eq!(h.page.attribute(button, "data-index"), Some(data_index));
                prop_assert_eq!(h.page.text_content(button), Some(title.clone()));
            }
        }
    }
}
