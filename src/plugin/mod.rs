//! Tab injector controller.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CustomTabs`] | Controller owning the page session |
//! | [`CustomTabsBuilder`] | Fluent configuration builder |
//! | [`CycleReport`] | Outcome of one activation cycle |
//!
//! # Lifecycle
//!
//! ```text
//! NotInitialized ──start──▶ WaitingForUi ──reconcile──▶ TabsCreated
//!                                ▲                          │
//!                                └──── navigation signal ───┘
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder.
pub mod builder;

/// Controller implementation.
pub mod core;

/// Activation cycles.
pub mod cycle;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::CustomTabsBuilder;
pub use self::core::CustomTabs;
pub use cycle::{CycleReport, run_cycle, schedule_cycle};
