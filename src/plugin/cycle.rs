//! Activation cycles.
//!
//! A cycle is one settle delay, one poll loop and at most one reconciliation
//! pass. Scheduled cycles run on their own task and are never cancelled;
//! overlapping cycles are made safe by the poll token and the reconciler's
//! guards.

// ============================================================================
// Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error};

use crate::context::PluginContext;
use crate::identifiers::CycleId;
use crate::poller::{CycleToken, PollOutcome, wait_for_ui};
use crate::reconciler::{ReconcileOutcome, create_custom_tabs};
use crate::registry::PluginPhase;

// ============================================================================
// CycleReport
// ============================================================================

/// What one cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Cycle ID used in logs.
    pub cycle: CycleId,
    /// What started the cycle.
    pub trigger: &'static str,
    /// How polling ended.
    pub poll: PollOutcome,
    /// Reconciliation result, if polling reached ready.
    pub reconcile: Option<ReconcileOutcome>,
}

impl CycleReport {
    /// Returns `true` if the tabs are in place after this cycle.
    #[must_use]
    pub fn has_tabs(&self) -> bool {
        self.reconcile
            .as_ref()
            .is_some_and(ReconcileOutcome::has_tabs)
    }
}

// ============================================================================
// Running
// ============================================================================

/// Runs one cycle now: poll for the host UI, then reconcile.
pub async fn run_cycle(context: &Arc<PluginContext>, trigger: &'static str) -> CycleReport {
    let cycle = CycleId::next();
    debug!(cycle = %cycle, trigger, "Cycle started");

    context.set_phase(PluginPhase::WaitingForUi);
    let token = CycleToken::issue(context);
    let poll = wait_for_ui(context, &token).await;

    let reconcile = match poll {
        PollOutcome::Ready => Some(create_custom_tabs(context).await),
        _ => None,
    };

    debug!(cycle = %cycle, ?poll, ?reconcile, "Cycle finished");
    CycleReport {
        cycle,
        trigger,
        poll,
        reconcile,
    }
}

/// Runs one cycle on a new task after `delay`.
///
/// A panic inside the cycle is logged and yields `None`; it never reaches
/// the caller or the runtime. Must be called from within a tokio runtime.
pub fn schedule_cycle(
    context: Arc<PluginContext>,
    delay: Duration,
    trigger: &'static str,
) -> JoinHandle<Option<CycleReport>> {
    debug!(trigger, delay_ms = delay.as_millis(), "Cycle scheduled");

    tokio::spawn(async move {
        if !delay.is_zero() {
            sleep(delay).await;
        }

        match AssertUnwindSafe(run_cycle(&context, trigger))
            .catch_unwind()
            .await
        {
            Ok(report) => Some(report),
            Err(_) => {
                error!(trigger, "Cycle panicked");
                None
            }
        }
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MemoryApiClient, TabDefinition};
    use crate::config::PluginOptions;
    use crate::error::Result;
    use crate::identifiers::NodeId;
    use crate::page::{By, MemoryPage, Page};
    use crate::script::{ScriptExecutor, ScriptNodeExecutor};
    use tokio::time::Instant;

    const HOST: &str = r#"<div class="emby-tabs-slider"></div>"#;

    fn setup(executor: Arc<dyn ScriptExecutor>) -> (Arc<MemoryPage>, Arc<PluginContext>) {
        let page = Arc::new(MemoryPage::with_body(HOST));
        page.install_api_client(Arc::new(
            MemoryApiClient::new(
                "http://media.local/",
                &[TabDefinition::new("Info", "<p>hi</p>", "boom()")],
            )
            .unwrap(),
        ));
        let ctx = Arc::new(PluginContext::new(PluginOptions::new(), page.clone(), executor));
        (page, ctx)
    }

    struct PanickingExecutor;

    impl ScriptExecutor for PanickingExecutor {
        fn execute(&self, _page: &dyn Page, _container: NodeId, _body: &str) -> Result<()> {
            panic!("engine crashed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_cycle_creates_tabs() {
        let (page, ctx) = setup(Arc::new(ScriptNodeExecutor::new()));

        let report = run_cycle(&ctx, "test").await;
        assert_eq!(report.poll, PollOutcome::Ready);
        assert!(report.has_tabs());
        assert_eq!(ctx.phase(), PluginPhase::TabsCreated);
        assert_eq!(page.count(&By::id_prefix("tab_")), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ineligible_route_skips_reconcile() {
        let (page, ctx) = setup(Arc::new(ScriptNodeExecutor::new()));
        page.set_hash("#/details?id=4");

        let report = run_cycle(&ctx, "test").await;
        assert!(report.reconcile.is_none());
        assert!(!report.has_tabs());
        assert_eq!(ctx.phase(), PluginPhase::WaitingForUi);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_waits_for_delay() {
        let (page, ctx) = setup(Arc::new(ScriptNodeExecutor::new()));
        let started = Instant::now();

        let handle = schedule_cycle(ctx, Duration::from_millis(800), "test");
        sleep(Duration::from_millis(799)).await;
        assert_eq!(page.count(&By::id_prefix("tab_")), 0);

        let report = handle.await.unwrap().unwrap();
        assert!(report.has_tabs());
        assert!(started.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_cycle_is_contained() {
        let (_page, ctx) = setup(Arc::new(PanickingExecutor));

        // The renderer contains executor panics, so the cycle still reports.
        let report = schedule_cycle(Arc::clone(&ctx), Duration::ZERO, "test")
            .await
            .unwrap();
        assert!(report.is_some());
        assert!(!ctx.is_reconciling());
    }
}
