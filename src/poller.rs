//! Readiness poller.
//!
//! Samples the host page until both the global API client and the tab
//! slider exist, then hands off to the reconciler. Only runs while the
//! location hash is on the route allow-list; leaving the allowed routes
//! ends the loop silently.
//!
//! # States
//!
//! ```text
//! Idle ─▶ CheckingRoute ─┬─▶ Aborted (route not eligible)
//!                        └─▶ Polling ─┬─▶ Ready
//!                                     ├─▶ Superseded (newer cycle polling)
//!                                     └─▶ BudgetExhausted
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::sleep;
use tracing::{debug, trace};

use crate::context::PluginContext;

// ============================================================================
// CycleToken
// ============================================================================

/// Cancellation token for one poll loop.
///
/// Issuing a token supersedes every token issued before it. A superseded
/// loop stops at its next sample when the options ask for cancellation.
#[derive(Debug, Clone)]
pub struct CycleToken {
    generation: u64,
    current: Arc<AtomicU64>,
    cancellable: bool,
}

impl CycleToken {
    /// Issues a token for a new poll loop, superseding older ones.
    #[must_use]
    pub fn issue(context: &PluginContext) -> Self {
        let generation = context.poll_generation.fetch_add(1, Ordering::SeqCst) + 1;
        Self {
            generation,
            current: Arc::clone(&context.poll_generation),
            cancellable: context.options.cancel_superseded_polls,
        }
    }

    /// Returns this token's generation.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once a newer token exists and cancellation is enabled.
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.cancellable && self.current.load(Ordering::SeqCst) != self.generation
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// How a poll loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// API client and slider are present.
    Ready,
    /// The current route is not on the allow-list.
    RouteIneligible {
        /// Location hash at the time of the check.
        hash: String,
    },
    /// A newer cycle took over.
    Superseded,
    /// The configured attempt budget ran out.
    BudgetExhausted {
        /// Samples taken.
        attempts: u32,
    },
}

/// Result of a single readiness sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Both conditions hold.
    Ready,
    /// The host has not defined its API client yet.
    MissingApiClient,
    /// The tab slider is not in the document.
    MissingSlider,
    /// Neither condition holds.
    MissingBoth,
}

// ============================================================================
// Sampling
// ============================================================================

/// Takes one readiness sample.
#[must_use]
pub fn check_readiness(context: &PluginContext) -> Readiness {
    let page = context.page();
    let has_client = page.api_client().is_some();
    let has_slider = page.query(&context.slider_selector()).is_some();

    match (has_client, has_slider) {
        (true, true) => Readiness::Ready,
        (false, true) => Readiness::MissingApiClient,
        (true, false) => Readiness::MissingSlider,
        (false, false) => Readiness::MissingBoth,
    }
}

/// Waits for the host UI.
///
/// Re-checks the route before every sample, sleeps the poll interval between
/// samples, and stops on the first of: ready, route left, superseded, budget
/// exhausted. Never fails.
pub async fn wait_for_ui(context: &PluginContext, token: &CycleToken) -> PollOutcome {
    let options = context.options();
    let mut attempts: u32 = 0;

    loop {
        let hash = context.page().location_hash();
        if !options.is_allowed_route(&hash) {
            debug!(hash = %hash, "Not on an eligible route, skipping UI check");
            return PollOutcome::RouteIneligible { hash };
        }

        if token.is_superseded() {
            debug!(generation = token.generation(), "Poll loop superseded");
            return PollOutcome::Superseded;
        }

        attempts = attempts.saturating_add(1);
        match check_readiness(context) {
            Readiness::Ready => {
                debug!(attempts, "Host UI ready");
                return PollOutcome::Ready;
            }
            missing => {
                trace!(?missing, attempts, "Waiting for host UI");
            }
        }

        if let Some(budget) = options.poll_budget
            && attempts >= budget
        {
            debug!(attempts, "Poll budget exhausted");
            return PollOutcome::BudgetExhausted { attempts };
        }

        sleep(options.poll_interval()).await;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApiClient;
    use crate::config::PluginOptions;
    use crate::page::MemoryPage;
    use crate::script::ScriptNodeExecutor;
    use std::time::Duration;
    use tokio::time::Instant;

    const SLIDER: &str = r#"<div class="emby-tabs-slider"></div>"#;

    fn setup(options: PluginOptions) -> (Arc<MemoryPage>, Arc<PluginContext>) {
        let page = Arc::new(MemoryPage::new());
        let context = Arc::new(PluginContext::new(
            options,
            page.clone(),
            Arc::new(ScriptNodeExecutor::new()),
        ));
        (page, context)
    }

    fn install_client(page: &MemoryPage) {
        page.install_api_client(Arc::new(
            MemoryApiClient::new("http://media.local/", &[]).unwrap(),
        ));
    }

    #[test]
    fn test_readiness_combinations() {
        let (page, ctx) = setup(PluginOptions::new());
        assert_eq!(check_readiness(&ctx), Readiness::MissingBoth);

        page.set_body(SLIDER);
        assert_eq!(check_readiness(&ctx), Readiness::MissingApiClient);

        install_client(&page);
        assert_eq!(check_readiness(&ctx), Readiness::Ready);

        page.set_body("");
        assert_eq!(check_readiness(&ctx), Readiness::MissingSlider);
    }

    #[test]
    fn test_tokens_supersede() {
        let (_page, ctx) = setup(PluginOptions::new());
        let first = CycleToken::issue(&ctx);
        assert!(!first.is_superseded());

        let second = CycleToken::issue(&ctx);
        assert!(first.is_superseded());
        assert!(!second.is_superseded());
    }

    #[test]
    fn test_tokens_not_cancellable_when_overlapping() {
        let (_page, ctx) = setup(PluginOptions::new().with_overlapping_polls());
        let first = CycleToken::issue(&ctx);
        let _second = CycleToken::issue(&ctx);
        assert!(!first.is_superseded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_immediately() {
        let (page, ctx) = setup(PluginOptions::new());
        page.set_body(SLIDER);
        install_client(&page);

        let token = CycleToken::issue(&ctx);
        assert_eq!(wait_for_ui(&ctx, &token).await, PollOutcome::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ineligible_route_aborts() {
        let (page, ctx) = setup(PluginOptions::new());
        page.set_body(SLIDER);
        install_client(&page);
        page.set_hash("#/movies");

        let token = CycleToken::issue(&ctx);
        assert_eq!(
            wait_for_ui(&ctx, &token).await,
            PollOutcome::RouteIneligible {
                hash: "#/movies".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_host_renders() {
        let (page, ctx) = setup(PluginOptions::new());
        install_client(&page);

        let renderer = Arc::clone(&page);
        tokio::spawn(async move {
            sleep(Duration::from_millis(1000)).await;
            renderer.set_body(SLIDER);
        });

        let started = Instant::now();
        let token = CycleToken::issue(&ctx);
        assert_eq!(wait_for_ui(&ctx, &token).await, PollOutcome::Ready);

        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1000));
        assert!(waited <= Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_route_change_during_polling_aborts() {
        let (page, ctx) = setup(PluginOptions::new());

        let navigator = Arc::clone(&page);
        tokio::spawn(async move {
            sleep(Duration::from_millis(500)).await;
            navigator.set_hash("#/details");
        });

        let token = CycleToken::issue(&ctx);
        assert!(matches!(
            wait_for_ui(&ctx, &token).await,
            PollOutcome::RouteIneligible { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_exhausted() {
        let (_page, ctx) = setup(PluginOptions::new().with_poll_budget(5));
        let started = Instant::now();

        let token = CycleToken::issue(&ctx);
        assert_eq!(
            wait_for_ui(&ctx, &token).await,
            PollOutcome::BudgetExhausted { attempts: 5 }
        );
        assert_eq!(started.elapsed(), Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_loop_stops() {
        let (_page, ctx) = setup(PluginOptions::new());
        let old = CycleToken::issue(&ctx);

        let ctx_clone = Arc::clone(&ctx);
        let handle = tokio::spawn(async move { wait_for_ui(&ctx_clone, &old).await });

        sleep(Duration::from_millis(450)).await;
        let _newer = CycleToken::issue(&ctx);

        assert_eq!(handle.await.unwrap(), PollOutcome::Superseded);
    }
}
