//! Scripted demo session for the distributions table.
//!
//! Drives a server side table against the mock data source the way a user
//! would: rapid page clicks, typing into the filter, sorting, selecting,
//! changing preferences. Each step prints the resulting view.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::info;
use tokio::runtime;

use tabula_client::clock::SystemClock;
use tabula_client::preference_store::PreferenceStore;
use tabula_client::storage::{FileBackend, MemoryBackend};
use tabula_client::table::{ServerSideTable, TableOptions};
use tabula_client::view::TableView;
use tabula_common::ids::RowId;
use tabula_common::query::Sorting;
use tabula_server::distribution::{distribution_columns, Distribution};
use tabula_server::source::{MockDataSource, MockSourceOptions};

const PAGE_NAME: &str = "Distributions";

#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(about = "Server side table demo session", long_about = None)]
struct CLIArgs {
    /// Number of generated distributions
    #[arg(long, default_value_t = 150)]
    rows: usize,

    /// Page size to switch to through the preferences dialog
    #[arg(long)]
    page_size: Option<u32>,

    /// Text typed into the filter, one keystroke at a time
    #[arg(long, default_value = "rtmp")]
    filter: String,

    /// Shortest simulated latency in milliseconds
    #[arg(long, default_value_t = 100)]
    latency_min: u64,

    /// Longest simulated latency in milliseconds
    #[arg(long, default_value_t = 400)]
    latency_max: u64,

    /// Make every n-th request fail
    #[arg(long)]
    fail_every: Option<u32>,

    /// Directory to keep preferences in between runs
    #[arg(long)]
    storage: Option<PathBuf>,

    /// Print views as JSON
    #[arg(long)]
    json: bool,

    /// Debug mode
    #[arg(short, long)]
    debug: bool,
}

type Table = ServerSideTable<Arc<MockDataSource<Distribution>>>;

fn print_view(step: &str, view: &TableView<Distribution>, json: bool) {
    if json {
        match serde_json::to_string_pretty(view) {
            Ok(s) => println!("{s}"),
            Err(e) => log::error!("Unable to encode view: {e}"),
        }
        return;
    }

    println!("== {step}");
    println!(
        "Distributions {}  page {}/{}{}{}",
        view.header_counter_text,
        view.effective_page_index,
        view.pages_count,
        if view.loading { "  [loading]" } else { "" },
        if view.pagination_disabled { "  [pagination disabled]" } else { "" },
    );

    if !view.filter_text.is_empty() {
        print!("Filter: {:?}", view.filter_text);
        if let Some(c) = &view.filter_counter_text {
            print!("  ({c})");
        }
        println!();
    }

    if let Some(e) = &view.error {
        println!("Error: {e}  (retry available)");
        return;
    }

    if view.no_match {
        println!("No matches. Clear the filter to see all distributions.");
        return;
    }

    let header: Vec<_> = view.columns.iter().map(|c| c.header.as_str()).collect();
    println!("  {}", header.join(" | "));

    for d in view.items.iter().take(5) {
        let mark = if view.selected_items.contains(d) { "*" } else { " " };
        println!("{mark} {}  {:<11}  {}", d.id, d.state, d.domain_name);
    }

    if view.items.len() > 5 {
        println!("  ... {} more on this page", view.items.len() - 5);
    }
}

async fn settle(table: &mut Table, step: &str, json: bool) {
    table.run_until_idle().await;
    print_view(step, &table.view(), json);
}

async fn session(args: CLIArgs) -> anyhow::Result<()> {
    let store = Arc::new(match &args.storage {
        Some(dir) => {
            info!("Keeping preferences in {}", dir.display());
            PreferenceStore::new(FileBackend::new(dir))
        }
        None => PreferenceStore::new(MemoryBackend::new()),
    });

    let source = Arc::new(MockDataSource::distributions(
        args.rows,
        MockSourceOptions {
            latency_min: Duration::from_millis(args.latency_min),
            latency_max: Duration::from_millis(args.latency_max),
            fail_every: args.fail_every,
            ..Default::default()
        },
    ));

    let options = TableOptions::for_page(PAGE_NAME, distribution_columns());
    let settle_window = options.settle_window;

    let mut table = ServerSideTable::mount(
        source.clone(),
        store.clone(),
        Arc::new(SystemClock),
        options,
    );

    print_view("Mounted", &table.view(), args.json);
    settle(&mut table, "Initial page", args.json).await;

    // clicks faster than replies arrive; only the last one may land
    for page in 2..=4 {
        table.set_page_index(page);
    }
    print_view("Clicked pages 2, 3, 4", &table.view(), args.json);
    settle(&mut table, "After rapid page clicks", args.json).await;

    let picks: Vec<RowId> = table
        .view()
        .items
        .iter()
        .take(2)
        .map(|d| d.id.clone().into())
        .collect();
    table.set_selection(picks);
    print_view("Selected two rows", &table.view(), args.json);

    for end in 1..=args.filter.len() {
        if !args.filter.is_char_boundary(end) {
            continue;
        }
        table.filter_input(&args.filter[..end]);
        tokio::time::sleep(settle_window / 3).await;
    }
    settle(&mut table, "Filtered", args.json).await;

    table.set_sorting(Sorting {
        column: "domainName".into(),
        descending: true,
    });
    settle(&mut table, "Sorted by domain name, descending", args.json).await;

    table.set_page_index(10);
    settle(&mut table, "Asked for page 10", args.json).await;

    if let Some(size) = args.page_size {
        let mut prefs = table.preferences().clone();
        prefs.page_size = size;
        prefs.wrap_lines = !prefs.wrap_lines;
        table.confirm_preferences(prefs);
        settle(&mut table, "Changed page size", args.json).await;
    }

    let widths: Vec<u32> = table
        .view()
        .columns
        .iter()
        .map(|c| c.width.unwrap_or(150) + 10)
        .collect();
    table.resize_columns(&widths);

    table.clear_filter();
    settle(&mut table, "Cleared filter", args.json).await;

    if table.view().error.is_some() {
        table.retry();
        settle(&mut table, "Retried", args.json).await;
    }

    store.flush().await;

    info!(
        "Session done: {} requests served, {} queries built",
        source.request_count(),
        table.rebuild_count()
    );

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = CLIArgs::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?;

    runtime.block_on(session(args))
}
