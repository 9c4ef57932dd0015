//! Reconciliation benchmark suite.
//!
//! Benchmarks one full activation cycle and tab rendering against the
//! in-memory page at different tab counts.
//!
//! Run with: cargo bench --bench reconcile
//! Results saved to: target/criterion/

use std::sync::Arc;

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use custom_tabs::{By, CustomTabs, MemoryApiClient, MemoryPage, Page, TabDefinition, TabKey};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const TAB_COUNTS: &[usize] = &[1, 10, 50];

const HOST: &str = r#"<div class="skinHeader"><div class="emby-tabs-slider"><button>Home</button><button>Favorites</button></div></div><div class="view"></div>"#;

// ============================================================================
// Fixtures
// ============================================================================

fn definitions(count: usize) -> Vec<TabDefinition> {
    (0..count)
        .map(|i| {
            TabDefinition::new(
                format!("Tab {i}"),
                format!("<section><h2>Tab {i}</h2><p id=\"v{i}\"></p></section>"),
                format!("render({i})"),
            )
        })
        .collect()
}

fn fixture(count: usize) -> (Arc<MemoryPage>, CustomTabs) {
    let page = Arc::new(MemoryPage::with_body(HOST));
    page.install_api_client(Arc::new(
        MemoryApiClient::new("http://localhost:8096/emby/", &definitions(count))
            .expect("valid base url"),
    ));
    let tabs = CustomTabs::builder()
        .page(page.clone())
        .build()
        .expect("valid options");
    (page, tabs)
}

// ============================================================================
// Benchmark: Full Cycle
// ============================================================================

fn bench_full_cycle(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("full_cycle");

    for &count in TAB_COUNTS {
        group.bench_with_input(BenchmarkId::new("tabs", count), &count, |b, &count| {
            b.to_async(&rt).iter_batched(
                || fixture(count),
                |(page, tabs)| async move {
                    let report = tabs.run_cycle().await;
                    assert!(report.has_tabs());
                    page
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Already Present
// ============================================================================

fn bench_already_present(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (page, tabs) = fixture(10);
    rt.block_on(tabs.run_cycle());
    assert_eq!(page.count(&By::id_prefix("tab_")), 10);

    c.bench_function("already_present", |b| {
        b.to_async(&rt).iter(|| async { tabs.run_cycle().await });
    });
}

// ============================================================================
// Benchmark: Render
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("render");

    for &count in TAB_COUNTS {
        let (page, tabs) = fixture(count);
        rt.block_on(tabs.run_cycle());
        let last = TabKey::new("tab_", count - 1);
        assert!(page.query(&By::id(last.as_str())).is_some());

        group.bench_with_input(BenchmarkId::new("tabs", count), &last, |b, key| {
            b.iter(|| tabs.render_tab_content(key));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_full_cycle,
    bench_already_present,
    bench_render
);
criterion_main!(benches);
