//! Custom tabs - configured tab injection for a host single-page application.
//!
//! The host application has a tab bar (the "slider") and no extension point.
//! This library fetches a list of tab definitions from the host's API,
//! injects one button per definition into the slider, mounts the selected
//! tab's markup and script into a shared content container, and puts the
//! tabs back whenever the host's router re-renders the view.
//!
//! # Architecture
//!
//! ```text
//! host events ─▶ NavigationWatcher ─▶ NavigationDispatcher ─▶ settle delay
//!                                                                 │
//!                    ┌────────────────────────────────────────────┘
//!                    ▼
//!            wait_for_ui (poller) ─▶ create_custom_tabs (reconciler)
//!                                              │
//!                                 click ─▶ render_tab_content (renderer)
//! ```
//!
//! Key design principles:
//!
//! - One [`PluginContext`] per page session, passed to every operation
//! - The host document is reached only through the [`Page`] trait
//! - Failures never escape into the host: every abort is logged and reported
//!   as an outcome enum
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use custom_tabs::{CustomTabs, MemoryApiClient, MemoryPage, Result, TabDefinition};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let page = Arc::new(MemoryPage::with_body(
//!         r#"<div class="emby-tabs-slider"></div>"#,
//!     ));
//!     page.install_api_client(Arc::new(MemoryApiClient::new(
//!         "http://localhost:8096/emby/",
//!         &[TabDefinition::new("Info", "<p>hi</p>", "")],
//!     )?));
//!
//!     let tabs = CustomTabs::builder().page(page.clone()).build()?;
//!     let report = tabs.run_cycle().await;
//!     assert!(report.has_tabs());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | API client contract and tab definitions |
//! | [`config`] | [`PluginOptions`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`navigation`] | Host events, adapters, dispatcher, watcher |
//! | [`page`] | Host page contract and [`MemoryPage`] |
//! | [`plugin`] | [`CustomTabs`] controller |
//! | [`poller`] | Readiness polling |
//! | [`reconciler`] | Tab creation |
//! | [`renderer`] | Tab content rendering |

// ============================================================================
// Modules
// ============================================================================

/// API client contract and tab definitions.
pub mod client;

/// Injector options.
pub mod config;

/// Page session context.
pub mod context;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Navigation signals and their sources.
pub mod navigation;

/// Host page contract.
pub mod page;

/// Controller.
pub mod plugin;

/// Readiness polling.
pub mod poller;

/// Tab creation.
pub mod reconciler;

/// Tab registry and plugin state.
pub mod registry;

/// Tab content rendering.
pub mod renderer;

/// Tab script execution.
pub mod script;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ApiClient, HttpMethod, MemoryApiClient, TabDefinition};

// Configuration
pub use config::PluginOptions;

// Context
pub use context::PluginContext;

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CycleId, NodeId, SubscriptionId, TabKey};

// Navigation types
pub use navigation::{HostEvent, NavigationDispatcher, NavigationSignal, SignalAdapter};

// Page types
pub use page::{By, MemoryPage, Page};

// Controller types
pub use plugin::{CustomTabs, CustomTabsBuilder, CycleReport};

// Outcomes
pub use poller::PollOutcome;
pub use reconciler::ReconcileOutcome;
pub use renderer::RenderOutcome;

// State
pub use registry::{PluginPhase, PluginState, TabRegistry};

// Scripts
pub use script::{ScriptExecutor, ScriptNodeExecutor};
