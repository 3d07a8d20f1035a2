use std::sync::Arc;
use std::time::Duration;

use tabula_client::clock::{Clock, ManualClock, SystemClock};
use tabula_client::orchestrator::{Applied, FetchPhase};
use tabula_client::preference_store::PreferenceStore;
use tabula_client::storage::{MemoryBackend, StorageBackend, StorageKey};
use tabula_client::table::{ServerSideTable, TableEvent, TableOptions};
use tabula_common::fetch::Row;
use tabula_common::ids::RowId;
use tabula_common::query::Sorting;
use tabula_server::distribution::{distribution_columns, Distribution};
use tabula_server::source::{MockDataSource, MockSourceOptions};

const PAGE: &str = "Distributions";

type Source = Arc<MockDataSource<Distribution>>;
type Table = ServerSideTable<Source>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn source(rows: usize, latency: Duration) -> Source {
    Arc::new(MockDataSource::distributions(
        rows,
        MockSourceOptions::with_latency(latency),
    ))
}

fn mount_with(
    source: &Source,
    backend: &MemoryBackend,
    clock: Arc<dyn Clock>,
) -> (Table, Arc<PreferenceStore>) {
    let store = Arc::new(PreferenceStore::new(backend.clone()));
    let table = ServerSideTable::mount(
        source.clone(),
        store.clone(),
        clock,
        TableOptions::for_page(PAGE, distribution_columns()),
    );
    (table, store)
}

fn mount(source: &Source) -> Table {
    mount_with(source, &MemoryBackend::new(), Arc::new(SystemClock)).0
}

/// Run events until idle, keeping what each fetch reply did
async fn collect_until_idle(table: &mut Table) -> Vec<Applied> {
    let mut ret = Vec::new();
    while table.orchestrator().in_flight() > 0 || table.filter().is_pending() {
        if let TableEvent::Fetch(a) = table.next_event().await {
            ret.push(a);
        }
    }
    ret
}

// =============================================================================

#[tokio::test(start_paused = true)]
async fn mount_loads_first_page() {
    init_logging();

    let source = source(75, ms(200));
    let mut table = mount(&source);

    let view = table.view();
    assert!(view.loading);
    assert!(view.pagination_disabled);
    assert!(view.items.is_empty());
    assert_eq!(table.phase(), FetchPhase::Loading);

    table.run_until_idle().await;

    let view = table.view();
    assert!(!view.loading);
    assert_eq!(view.items.len(), 30);
    assert_eq!(view.total_count, 75);
    assert_eq!(view.pages_count, 3);
    assert_eq!(view.effective_page_index, 1);
    assert_eq!(view.header_counter_text, "(75+)");
    assert_eq!(view.filter_counter_text, None);
    assert_eq!(view.columns.len(), distribution_columns().len());
    assert_eq!(table.query().sorting(), &Sorting::ascending("id"));
}

#[tokio::test(start_paused = true)]
async fn late_replies_never_overwrite_newer_ones() {
    init_logging();

    let source = source(75, ms(10));
    // mount, page 2, page 3: the older requests answer last
    source.script_latencies([ms(900), ms(600), ms(50)]);

    let mut table = mount(&source);
    table.set_page_index(2);
    table.set_page_index(3);

    let expected = table.query().clone();
    assert_eq!(table.active_query(), Some(&expected));

    let applied = collect_until_idle(&mut table).await;
    log::info!("Replies applied: {applied:?}");

    assert_eq!(
        applied,
        vec![Applied::Published, Applied::Stale, Applied::Stale]
    );
    assert_eq!(table.active_query(), Some(&expected));

    let view = table.view();
    let page_three = source.store().page(&expected);
    assert_eq!(view.items, page_three.items);
    assert_eq!(view.effective_page_index, 3);
    assert_eq!(source.request_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn out_of_range_page_shows_resolved_index() {
    init_logging();

    let source = source(75, ms(100));
    let mut table = mount(&source);
    table.run_until_idle().await;

    table.set_page_index(10);
    table.run_until_idle().await;

    let view = table.view();
    assert_eq!(table.query().page_index(), 10);
    assert_eq!(view.pages_count, 3);
    assert_eq!(view.effective_page_index, 3);
    assert_eq!(view.items.len(), 15);

    let resolved = table.orchestrator().result().unwrap().resolved_page_index;
    assert_eq!(view.effective_page_index, resolved);
}

#[tokio::test(start_paused = true)]
async fn failed_page_keeps_last_resolved_index() {
    init_logging();

    let source = source(75, ms(100));
    let mut table = mount(&source);
    table.run_until_idle().await;

    source.fail_next(1);
    table.set_page_index(10);

    assert_eq!(table.view().effective_page_index, 1);

    table.run_until_idle().await;

    let view = table.view();
    assert_eq!(table.phase(), FetchPhase::Failed);
    assert_eq!(view.pages_count, 0);
    assert_eq!(view.effective_page_index, 1);

    table.retry();
    table.run_until_idle().await;

    assert_eq!(table.view().effective_page_index, 3);
}

#[tokio::test(start_paused = true)]
async fn requested_page_is_not_shown_before_first_reply() {
    let source = source(75, ms(100));
    let mut table = mount(&source);

    table.set_page_index(10);

    assert_eq!(table.view().effective_page_index, 1);
}

#[tokio::test(start_paused = true)]
async fn page_zero_clamps_to_one() {
    let source = source(75, ms(100));
    let mut table = mount(&source);

    table.set_page_index(0);

    assert_eq!(table.query().page_index(), 1);
}

#[tokio::test(start_paused = true)]
async fn keystrokes_inside_window_build_one_query() {
    init_logging();

    let source = source(75, ms(100));
    let mut table = mount(&source);
    table.run_until_idle().await;

    let before = table.rebuild_count();

    for text in ["r", "rt", "rtmp"] {
        table.filter_input(text);
        tokio::time::sleep(ms(100)).await;
    }

    assert_eq!(table.rebuild_count(), before);
    assert_eq!(table.view().filter_text, "rtmp");
    assert_eq!(table.query().filter_text(), "");

    let event = table.next_event().await;

    assert_eq!(event, TableEvent::FilterSettled);
    assert_eq!(table.rebuild_count(), before + 1);
    assert_eq!(table.query().filter_text(), "rtmp");

    table.run_until_idle().await;

    let view = table.view();
    assert!(!view.items.is_empty());
    assert!(view.items.iter().all(|d| d.delivery_method == "RTMP"));
    assert!(view.filter_counter_text.is_some());
    assert_eq!(source.requests().last().unwrap().filter_text(), "rtmp");
}

#[tokio::test(start_paused = true)]
async fn explicit_settle_uses_last_text() {
    init_logging();

    let source = source(75, ms(100));
    let clock = ManualClock::new();
    let (mut table, _) =
        mount_with(&source, &MemoryBackend::new(), Arc::new(clock.clone()));

    let before = table.rebuild_count();

    table.filter_input("e");
    clock.advance(ms(50));
    table.filter_input("ena");
    clock.advance(ms(50));
    table.filter_input("enabled");

    assert!(!table.poll_filter());

    table.settle_filter();

    assert_eq!(table.rebuild_count(), before + 1);
    assert_eq!(table.query().filter_text(), "enabled");
    assert!(!table.filter().is_pending());
}

#[tokio::test(start_paused = true)]
async fn manual_clock_table_goes_idle() {
    init_logging();

    let source = source(75, ms(100));
    let clock = ManualClock::new();
    let (mut table, _) =
        mount_with(&source, &MemoryBackend::new(), Arc::new(clock.clone()));

    table.filter_input("rtmp");

    let idle =
        tokio::time::timeout(Duration::from_secs(3600), table.run_until_idle())
            .await;

    assert!(idle.is_ok());
    assert!(!table.filter().is_pending());
    assert_eq!(table.query().filter_text(), "rtmp");
    assert_eq!(source.requests().last().unwrap().filter_text(), "rtmp");
}

#[tokio::test(start_paused = true)]
async fn manual_clock_advance_settles_waiting_table() {
    let source = source(75, ms(100));
    let clock = ManualClock::new();
    let (mut table, _) =
        mount_with(&source, &MemoryBackend::new(), Arc::new(clock.clone()));
    table.run_until_idle().await;

    let before = table.rebuild_count();
    table.filter_input("web");

    let advancer = {
        let clock = clock.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            clock.advance(ms(300));
        })
    };

    assert_eq!(table.next_event().await, TableEvent::FilterSettled);
    advancer.await.unwrap();

    assert_eq!(table.rebuild_count(), before + 1);
    assert_eq!(table.query().filter_text(), "web");
}

#[tokio::test(start_paused = true)]
async fn selection_follows_reloads() {
    init_logging();

    let source = source(75, ms(100));
    let mut table = mount(&source);
    table.run_until_idle().await;

    let items = table.view().items;
    let kept = items[0].clone();
    table.set_selection([kept.id(), items[1].id(), RowId::from("E000000000000X")]);

    assert_eq!(table.selection().len(), 3);
    // the unknown id counts until a reload drops it
    assert_eq!(table.view().header_counter_text, "(3/75+)");
    assert_eq!(table.view().selected_items.len(), 2);

    table.filter_input(kept.id.as_str());
    table.settle_filter();
    table.run_until_idle().await;

    let view = table.view();
    assert_eq!(view.items, vec![kept.clone()]);
    assert_eq!(view.selected_items, vec![kept.clone()]);
    assert_eq!(table.selection().ids().collect::<Vec<_>>(), vec![&kept.id()]);
    assert_eq!(view.filter_counter_text.as_deref(), Some("1 match"));
    assert_eq!(view.header_counter_text, "(1/1+)");

    // clearing the filter does not bring dropped rows back
    table.clear_filter();
    table.run_until_idle().await;

    assert_eq!(table.selection().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn no_match_until_filter_cleared() {
    init_logging();

    let source = source(75, ms(100));
    let mut table = mount(&source);

    table.filter_input("no such distribution");
    table.settle_filter();
    table.run_until_idle().await;

    let view = table.view();
    assert!(view.items.is_empty());
    assert!(view.no_match);
    assert_eq!(view.effective_page_index, 1);

    table.clear_filter();

    assert_eq!(table.view().filter_text, "");

    table.run_until_idle().await;

    let view = table.view();
    assert!(!view.no_match);
    assert_eq!(view.items.len(), 30);
    assert_eq!(view.filter_counter_text, None);
}

#[tokio::test(start_paused = true)]
async fn failure_then_retry() {
    init_logging();

    let source = source(75, ms(100));
    source.fail_next(1);

    let mut table = mount(&source);
    let applied = collect_until_idle(&mut table).await;

    assert!(matches!(applied.as_slice(), [Applied::Failed(_)]));

    let view = table.view();
    assert_eq!(table.phase(), FetchPhase::Failed);
    assert!(view.error.is_some());
    assert!(view.items.is_empty());
    assert!(!view.loading);
    assert!(!view.no_match);

    let request = table.retry();
    assert!(request.is_some());
    assert!(table.view().loading);

    table.run_until_idle().await;

    let view = table.view();
    assert_eq!(table.phase(), FetchPhase::Resolved);
    assert_eq!(view.error, None);
    assert_eq!(view.items.len(), 30);
    assert_eq!(source.request_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_failure_is_ignored() {
    init_logging();

    let source = source(75, ms(100));
    source.fail_next(1);
    source.script_latencies([ms(500), ms(50)]);

    let mut table = mount(&source);
    table.set_page_index(2);

    let applied = collect_until_idle(&mut table).await;

    assert_eq!(applied, vec![Applied::Published, Applied::Stale]);
    assert_eq!(table.phase(), FetchPhase::Resolved);
    assert_eq!(table.view().effective_page_index, 2);
}

#[tokio::test(start_paused = true)]
async fn identical_query_is_not_reissued() {
    let source = source(75, ms(100));
    let mut table = mount(&source);
    table.run_until_idle().await;

    table.set_page_index(1);

    assert_eq!(table.rebuild_count(), 2);
    assert_eq!(source.request_count(), 1);
    assert_eq!(table.phase(), FetchPhase::Resolved);
}

#[tokio::test(start_paused = true)]
async fn unsortable_column_is_ignored() {
    let source = source(75, ms(100));
    let mut table = mount(&source);

    table.set_sorting(Sorting::ascending("origin"));
    assert_eq!(table.query().sorting(), &Sorting::ascending("id"));

    table.set_sorting(Sorting {
        column: "domainName".into(),
        descending: true,
    });
    table.run_until_idle().await;

    let names: Vec<_> = table
        .view()
        .items
        .iter()
        .map(|d| d.domain_name.clone())
        .collect();
    let mut sorted = names.clone();
    sorted.sort_by(|a, b| b.cmp(a));

    assert_eq!(names, sorted);
}

#[tokio::test(start_paused = true)]
async fn fetch_timeout_fails_the_request() {
    init_logging();

    let source = source(75, ms(5000));
    let store = Arc::new(PreferenceStore::new(MemoryBackend::new()));

    let mut table = ServerSideTable::mount(
        source.clone(),
        store,
        Arc::new(SystemClock),
        TableOptions {
            fetch_timeout: Some(ms(1000)),
            ..TableOptions::for_page(PAGE, distribution_columns())
        },
    );

    table.run_until_idle().await;

    assert_eq!(table.phase(), FetchPhase::Failed);
    assert!(table.view().error.is_some());
}

// =============================================================================

#[tokio::test(start_paused = true)]
async fn preferences_survive_remount() {
    init_logging();

    let source = source(75, ms(100));
    let backend = MemoryBackend::new();

    let (mut table, store) =
        mount_with(&source, &backend, Arc::new(SystemClock));
    table.run_until_idle().await;

    let mut prefs = table.preferences().clone();
    prefs.page_size = 10;
    prefs.wrap_lines = true;
    prefs.visible_columns = vec!["id".into(), "domainName".into()];

    table.confirm_preferences(prefs.clone());
    table.resize_columns(&[220, 310]);

    assert_eq!(table.query().page_size(), 10);

    table.run_until_idle().await;

    let view = table.view();
    assert_eq!(view.items.len(), 10);
    assert_eq!(view.pages_count, 8);
    assert!(view.wrap_lines);
    assert_eq!(view.columns.len(), 2);

    store.flush().await;
    drop(table);

    let (table, store) = mount_with(&source, &backend, Arc::new(SystemClock));

    assert!(!store.is_degraded());
    assert_eq!(table.preferences(), &prefs);
    assert_eq!(table.query().page_size(), 10);

    let columns = table.view().columns;
    assert_eq!(columns[0].width, Some(220));
    assert_eq!(columns[1].width, Some(310));
}

#[tokio::test(start_paused = true)]
async fn same_page_size_does_not_refetch() {
    let source = source(75, ms(100));
    let mut table = mount(&source);
    table.run_until_idle().await;

    let rebuilds = table.rebuild_count();

    let mut prefs = table.preferences().clone();
    prefs.striped_rows = true;
    table.confirm_preferences(prefs);

    assert_eq!(table.rebuild_count(), rebuilds);
    assert_eq!(source.request_count(), 1);
    assert!(table.view().striped_rows);
}

#[tokio::test(start_paused = true)]
async fn corrupt_preferences_fall_back_to_defaults() {
    init_logging();

    let source = source(75, ms(100));
    let backend = MemoryBackend::new();
    backend
        .set(&StorageKey::preferences(PAGE), vec![0xff, 0xfe, 0x00])
        .unwrap();
    backend
        .set(&StorageKey::widths(PAGE), vec![0x13, 0x37])
        .unwrap();

    let (mut table, store) =
        mount_with(&source, &backend, Arc::new(SystemClock));

    let defaults = TableOptions::for_page(PAGE, distribution_columns());

    assert!(!store.is_degraded());
    assert_eq!(table.preferences(), &defaults.default_preferences);
    assert!(table.layout().widths().is_empty());

    table.run_until_idle().await;
    assert_eq!(table.view().items.len(), 30);
}
