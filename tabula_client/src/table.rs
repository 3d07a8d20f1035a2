//! A server side table: query state, fetch cycle, selection, and preferences
//! wired together.
//!
//! All mutation goes through `&mut self`. Fetches run as tokio tasks and
//! their replies are applied one at a time through [ServerSideTable::apply],
//! usually via [ServerSideTable::next_event].

use std::{sync::Arc, time::Duration};

use log::{debug, info};
use tabula_common::{
    columns::ColumnDefinition,
    fetch::DataSource,
    ids::{RequestId, RowId},
    preferences::{ColumnWidths, Preferences},
    query::{build_query, Pagination, QueryState, Sorting},
};

use crate::{
    clock::Clock,
    columns::ColumnLayout,
    filter::DebouncedFilter,
    orchestrator::{Applied, Completion, FetchOrchestrator, FetchPhase},
    preference_store::PreferenceStore,
    selection::SelectionSet,
    storage::StorageKey,
    view::{project, TableView},
};

/// Table configuration
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Storage key for preferences
    pub preferences_key: String,
    /// Storage key for column widths
    pub widths_key: String,
    /// How long filter input must be idle before it is committed
    pub settle_window: Duration,
    /// Give up on a fetch after this long. `None` waits forever.
    pub fetch_timeout: Option<Duration>,
    pub default_preferences: Preferences,
    pub columns: Vec<ColumnDefinition>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            preferences_key: StorageKey::preferences("Table"),
            widths_key: StorageKey::widths("Table"),
            settle_window: Duration::from_millis(300),
            fetch_timeout: None,
            default_preferences: Preferences::default(),
            columns: Vec::new(),
        }
    }
}

impl TableOptions {
    /// Options with both storage keys derived from one page name
    pub fn for_page(page: &str, columns: Vec<ColumnDefinition>) -> Self {
        Self {
            preferences_key: StorageKey::preferences(page),
            widths_key: StorageKey::widths(page),
            default_preferences: Preferences::with_columns(
                columns.iter().map(|c| c.id.clone()),
            ),
            columns,
            ..Default::default()
        }
    }
}

/// Something that happened while waiting on the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableEvent {
    Fetch(Applied),
    FilterSettled,
}

pub struct ServerSideTable<S: DataSource> {
    store: Arc<PreferenceStore>,
    preferences_key: String,
    widths_key: String,

    preferences: Preferences,
    layout: ColumnLayout,

    page_index: u32,
    sorting: Sorting,
    filter: DebouncedFilter,
    selection: SelectionSet,

    orchestrator: FetchOrchestrator<S>,
    query: QueryState,
    rebuilds: u64,
}

impl<S: DataSource> std::fmt::Debug for ServerSideTable<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerSideTable")
            .field("query", &self.query)
            .field("orchestrator", &self.orchestrator)
            .field("selection", &self.selection)
            .finish()
    }
}

impl<S: DataSource> ServerSideTable<S> {
    /// Load stored preferences and widths, then issue the first fetch.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        source: S,
        store: Arc<PreferenceStore>,
        clock: Arc<dyn Clock>,
        options: TableOptions,
    ) -> Self {
        let mut preferences = store.load(
            &options.preferences_key,
            options.default_preferences.clone(),
        );

        if preferences.page_size == 0 {
            preferences.page_size = options.default_preferences.page_size.max(1);
        }

        let widths = store.load(&options.widths_key, ColumnWidths::new());
        let layout = ColumnLayout::new(options.columns).with_widths(widths);

        let sorting = layout
            .default_sorting()
            .unwrap_or_else(|| Sorting::ascending("id"));

        let query = build_query(
            Pagination::new(1, preferences.page_size),
            sorting.clone(),
            "",
        );

        let mut orchestrator =
            FetchOrchestrator::new(source, options.fetch_timeout);
        orchestrator.issue(query.clone());

        info!("Mounted table, page size {}", preferences.page_size);

        Self {
            store,
            preferences_key: options.preferences_key,
            widths_key: options.widths_key,
            preferences,
            layout,
            page_index: 1,
            sorting,
            filter: DebouncedFilter::new(options.settle_window, clock),
            selection: SelectionSet::new(),
            orchestrator,
            query,
            rebuilds: 1,
        }
    }

    // =========================================================================

    /// The most recently built query
    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// The query whose reply will be published next
    pub fn active_query(&self) -> Option<&QueryState> {
        self.orchestrator.active_query()
    }

    pub fn phase(&self) -> FetchPhase {
        self.orchestrator.phase()
    }

    /// How many times a query has been built, the initial one included
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn filter(&self) -> &DebouncedFilter {
        &self.filter
    }

    pub fn orchestrator(&self) -> &FetchOrchestrator<S> {
        &self.orchestrator
    }

    pub fn view(&self) -> TableView<S::Row> {
        project(
            &self.orchestrator,
            &self.selection,
            &self.filter,
            &self.preferences,
            &self.layout,
        )
    }

    // =========================================================================

    fn rebuild_query(&mut self) {
        let query = build_query(
            Pagination::new(self.page_index, self.preferences.page_size),
            self.sorting.clone(),
            self.filter.committed_text(),
        );

        self.rebuilds += 1;
        self.query = query.clone();

        let unchanged = self.orchestrator.active_query() == Some(&query)
            && self.orchestrator.phase() != FetchPhase::Failed;

        if unchanged {
            debug!("Query unchanged, not re-issuing: {query}");
            return;
        }

        self.orchestrator.issue(query);
    }

    /// Go to a page. Indices below one are clamped to one.
    pub fn set_page_index(&mut self, page_index: u32) {
        self.page_index = page_index.max(1);
        self.rebuild_query();
    }

    /// Change the sorting. Requests to sort by an unsortable column are
    /// ignored.
    pub fn set_sorting(&mut self, sorting: Sorting) {
        if let Some(def) = self.layout.find(&sorting.column) {
            if !def.sortable {
                debug!("Column {} is not sortable", sorting.column);
                return;
            }
        }

        self.sorting = sorting;
        self.rebuild_query();
    }

    /// A keystroke in the filter box. Does not fetch.
    pub fn filter_input(&mut self, text: impl Into<String>) {
        self.filter.set_live_text(text);
    }

    /// Commit the filter text now and rebuild the query
    pub fn settle_filter(&mut self) {
        self.filter.settle();
        self.rebuild_query();
    }

    /// Commit the filter text if its settle window has passed.
    /// Returns true if it did.
    pub fn poll_filter(&mut self) -> bool {
        if self.filter.poll() {
            self.rebuild_query();
            return true;
        }
        false
    }

    /// Empty the filter and refetch at once
    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.rebuild_query();
    }

    /// Direct user selection, applied as-is
    pub fn set_selection<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = RowId>,
    {
        self.selection.set(ids);
    }

    /// Accept the preferences dialog: persist, and refetch if the page size
    /// changed
    pub fn confirm_preferences(&mut self, mut preferences: Preferences) {
        preferences.page_size = preferences.page_size.max(1);

        self.store.save(&self.preferences_key, &preferences);

        let resized = preferences.page_size != self.preferences.page_size;
        self.preferences = preferences;

        if resized {
            self.rebuild_query();
        }
    }

    /// Columns were resized. `widths` are for the visible columns in display
    /// order.
    pub fn resize_columns(&mut self, widths: &[u32]) {
        let saved = self.layout.resize(&self.preferences, widths);
        self.store.save(&self.widths_key, &saved);
    }

    /// Re-issue the current query, such as after a failure
    pub fn retry(&mut self) -> Option<RequestId> {
        self.orchestrator.retry()
    }

    // =========================================================================

    /// Apply a fetch completion, reconciling the selection if it landed
    pub fn apply(&mut self, completion: Completion<S::Row>) -> Applied {
        let applied = self.orchestrator.apply(completion);

        if applied == Applied::Published {
            if let Some(result) = self.orchestrator.result() {
                let dropped = self.selection.reconcile(result.ids());
                if dropped > 0 {
                    debug!("Dropped {dropped} selected rows no longer present");
                }
            }
        }

        applied
    }

    /// Apply every completion that has already arrived
    pub fn drain(&mut self) -> Vec<Applied> {
        let mut ret = Vec::new();
        while let Some(c) = self.orchestrator.try_next_completion() {
            ret.push(self.apply(c));
        }
        ret
    }

    /// Wait for the next fetch completion or filter settle, and apply it
    pub async fn next_event(&mut self) -> TableEvent {
        loop {
            let settle = self.filter.settle_due();

            let completion = tokio::select! {
                c = self.orchestrator.next_completion() => Some(c),
                _ = settle => None,
            };

            match completion {
                Some(c) => return TableEvent::Fetch(self.apply(c)),
                None => {
                    if self.poll_filter() {
                        return TableEvent::FilterSettled;
                    }
                }
            }
        }
    }

    /// Process events until nothing is in flight and no filter text is
    /// waiting to settle
    pub async fn run_until_idle(&mut self) {
        while self.orchestrator.in_flight() > 0 || self.filter.is_pending() {
            self.next_event().await;
        }
    }
}
