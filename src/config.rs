//! Plugin options.
//!
//! Every constant the injector depends on lives here with a default that
//! matches the host it was written for. Options can be built fluently or
//! deserialized from a JSON object handed over by the page.
//!
//! # Example
//!
//! ```ignore
//! use custom_tabs::PluginOptions;
//!
//! let options = PluginOptions::new()
//!     .with_poll_interval(Duration::from_millis(100))
//!     .with_poll_budget(50)
//!     .with_allowed_route("#/home?tab=1");
//!
//! options.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Defaults
// ============================================================================

/// Route fragments treated as the host's home view.
pub const DEFAULT_ALLOWED_ROUTES: &[&str] = &["", "#/home", "#/home.html"];

/// Delay between readiness samples.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Settle delay after history, back/forward, page-show and focus signals.
pub const DEFAULT_NAVIGATION_DELAY_MS: u64 = 800;

/// Settle delay after the page becomes visible again.
pub const DEFAULT_VISIBILITY_DELAY_MS: u64 = 300;

/// Settle delay after a completed touch gesture.
pub const DEFAULT_TOUCH_DELAY_MS: u64 = 1000;

/// Class of the host's tab bar.
pub const DEFAULT_SLIDER_CLASS: &str = "emby-tabs-slider";

/// Prefix of injected button IDs.
pub const DEFAULT_TAB_ID_PREFIX: &str = "tab_";

/// Offset added to a tab's index for its `data-index` attribute.
///
/// The host owns the first two positions.
pub const DEFAULT_INDEX_OFFSET: usize = 2;

/// ID of the shared content container.
pub const DEFAULT_CONTAINER_ID: &str = "customTabContentContainer";

/// Relative path of the config endpoint.
pub const DEFAULT_CONFIG_PATH: &str = "CustomTabs/Config";

/// Markup shown for an unknown tab.
pub const DEFAULT_FALLBACK_MARKUP: &str = "<p>No content available.</p>";

// ============================================================================
// PluginOptions
// ============================================================================

/// Injector configuration.
///
/// Durations are stored in milliseconds so the struct round-trips through
/// JSON; use the accessor methods to get [`Duration`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginOptions {
    /// Location hashes on which the injector activates.
    pub allowed_routes: Vec<String>,

    /// Milliseconds between readiness samples.
    pub poll_interval_ms: u64,

    /// Maximum readiness samples per cycle (`None` polls forever).
    pub poll_budget: Option<u32>,

    /// Stop an older poll loop once a newer cycle starts polling.
    pub cancel_superseded_polls: bool,

    /// Settle delay for history, back/forward, page-show and focus.
    pub navigation_delay_ms: u64,

    /// Settle delay for the page becoming visible.
    pub visibility_delay_ms: u64,

    /// Settle delay for a completed touch gesture.
    pub touch_delay_ms: u64,

    /// Class identifying the host's tab slider.
    pub slider_class: String,

    /// Prefix of injected button IDs.
    pub tab_id_prefix: String,

    /// Added to each tab's index for the `data-index` attribute.
    pub index_offset: usize,

    /// ID of the shared content container.
    pub container_id: String,

    /// CSS padding of the content container.
    pub container_padding: String,

    /// CSS min-height of the content container.
    pub container_min_height: String,

    /// Config endpoint path, relative to the API client's base URL.
    pub config_path: String,

    /// Markup written when a tab has no registered content.
    pub fallback_markup: String,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl PluginOptions {
    /// Creates options with the default host settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed_routes: DEFAULT_ALLOWED_ROUTES
                .iter()
                .map(|route| (*route).to_string())
                .collect(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_budget: None,
            cancel_superseded_polls: true,
            navigation_delay_ms: DEFAULT_NAVIGATION_DELAY_MS,
            visibility_delay_ms: DEFAULT_VISIBILITY_DELAY_MS,
            touch_delay_ms: DEFAULT_TOUCH_DELAY_MS,
            slider_class: DEFAULT_SLIDER_CLASS.to_string(),
            tab_id_prefix: DEFAULT_TAB_ID_PREFIX.to_string(),
            index_offset: DEFAULT_INDEX_OFFSET,
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            container_padding: "1em".to_string(),
            container_min_height: "400px".to_string(),
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            fallback_markup: DEFAULT_FALLBACK_MARKUP.to_string(),
        }
    }

    /// Parses options from a JSON object, filling gaps with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] on malformed input and [`Error::Config`]
    /// if the result fails [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl PluginOptions {
    /// Replaces the route allow-list.
    #[must_use]
    pub fn with_allowed_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_routes = routes.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one route to the allow-list.
    #[must_use]
    pub fn with_allowed_route(mut self, route: impl Into<String>) -> Self {
        self.allowed_routes.push(route.into());
        self
    }

    /// Sets the delay between readiness samples.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Caps readiness samples per cycle.
    #[inline]
    #[must_use]
    pub fn with_poll_budget(mut self, attempts: u32) -> Self {
        self.poll_budget = Some(attempts);
        self
    }

    /// Lets overlapping poll loops all run to completion.
    #[inline]
    #[must_use]
    pub fn with_overlapping_polls(mut self) -> Self {
        self.cancel_superseded_polls = false;
        self
    }

    /// Sets the settle delay for history, back/forward, page-show and focus.
    #[inline]
    #[must_use]
    pub fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the settle delay for visibility regained.
    #[inline]
    #[must_use]
    pub fn with_visibility_delay(mut self, delay: Duration) -> Self {
        self.visibility_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the settle delay for touch gestures.
    #[inline]
    #[must_use]
    pub fn with_touch_delay(mut self, delay: Duration) -> Self {
        self.touch_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Sets the class of the host tab slider.
    #[inline]
    #[must_use]
    pub fn with_slider_class(mut self, class: impl Into<String>) -> Self {
        self.slider_class = class.into();
        self
    }

    /// Sets the prefix of injected button IDs.
    #[inline]
    #[must_use]
    pub fn with_tab_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.tab_id_prefix = prefix.into();
        self
    }

    /// Sets the `data-index` offset.
    #[inline]
    #[must_use]
    pub fn with_index_offset(mut self, offset: usize) -> Self {
        self.index_offset = offset;
        self
    }

    /// Sets the content container ID.
    #[inline]
    #[must_use]
    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = id.into();
        self
    }

    /// Sets the config endpoint path.
    #[inline]
    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Sets the markup shown for unknown tabs.
    #[inline]
    #[must_use]
    pub fn with_fallback_markup(mut self, markup: impl Into<String>) -> Self {
        self.fallback_markup = markup.into();
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl PluginOptions {
    /// Returns the delay between readiness samples.
    #[inline]
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the history/back-forward/focus settle delay.
    #[inline]
    #[must_use]
    pub const fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }

    /// Returns the visibility settle delay.
    #[inline]
    #[must_use]
    pub const fn visibility_delay(&self) -> Duration {
        Duration::from_millis(self.visibility_delay_ms)
    }

    /// Returns the touch settle delay.
    #[inline]
    #[must_use]
    pub const fn touch_delay(&self) -> Duration {
        Duration::from_millis(self.touch_delay_ms)
    }

    /// Checks whether `hash` is an eligible route.
    #[must_use]
    pub fn is_allowed_route(&self, hash: &str) -> bool {
        self.allowed_routes.iter().any(|route| route == hash)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl PluginOptions {
    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any value cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.allowed_routes.is_empty() {
            return Err(Error::config("At least one allowed route is required"));
        }

        if self.poll_interval_ms == 0 {
            return Err(Error::config("Poll interval must be greater than zero"));
        }

        if self.poll_budget == Some(0) {
            return Err(Error::config(
                "Poll budget must be greater than zero (omit it to poll forever)",
            ));
        }

        if self.slider_class.trim().is_empty() {
            return Err(Error::config("Slider class cannot be empty"));
        }

        if self.tab_id_prefix.is_empty() {
            return Err(Error::config("Tab ID prefix cannot be empty"));
        }

        if self.container_id.trim().is_empty() {
            return Err(Error::config("Container ID cannot be empty"));
        }

        if self.config_path.trim().is_empty() {
            return Err(Error::config("Config endpoint path cannot be empty"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
