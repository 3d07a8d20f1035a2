//! Read-only snapshot of everything a renderer needs

use serde::Serialize;
use tabula_common::{
    columns::ColumnDefinition,
    counter,
    fetch::DataSource,
    preferences::{ContentDensity, Preferences},
};

use crate::{
    columns::ColumnLayout, filter::DebouncedFilter,
    orchestrator::FetchOrchestrator, selection::SelectionSet,
};

/// Everything the presentation layer sees.
///
/// Snapshots own their data; taking a new one never changes an old one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView<R> {
    pub items: Vec<R>,
    pub loading: bool,
    pub error: Option<String>,
    pub total_count: u64,
    pub pages_count: u32,
    pub effective_page_index: u32,
    pub pagination_disabled: bool,
    pub selected_items: Vec<R>,
    pub columns: Vec<ColumnDefinition>,
    pub wrap_lines: bool,
    pub striped_rows: bool,
    pub content_density: ContentDensity,
    pub filter_text: String,
    pub filter_counter_text: Option<String>,
    pub header_counter_text: String,
    /// A committed filter matched nothing
    pub no_match: bool,
}

/// Derive the view from the current component state.
///
/// While a fetch is loading the previous page stays visible. The page index
/// is the last one the data source resolved, failures included, and page one
/// before anything has resolved. The requested index is never shown.
pub fn project<S: DataSource>(
    orchestrator: &FetchOrchestrator<S>,
    selection: &SelectionSet,
    filter: &DebouncedFilter,
    preferences: &Preferences,
    layout: &ColumnLayout,
) -> TableView<S::Row> {
    let result = orchestrator.result();

    let items = result.map(|r| r.items.clone()).unwrap_or_default();
    let total_count = result.map(|r| r.total_count).unwrap_or(0);
    let pages_count = result.map(|r| r.pages_count).unwrap_or(0);

    let effective_page_index = result
        .map(|r| r.resolved_page_index)
        .or(orchestrator.resolved_page_index())
        .unwrap_or(1)
        .max(1);

    let loading = orchestrator.is_loading();
    let selected_items = selection.selected_items(&items);

    let filter_counter_text = if filter.committed_text().is_empty() {
        None
    } else {
        Some(counter::filter_counter_text(
            items.len(),
            pages_count,
            preferences.page_size,
        ))
    };

    let no_match = !loading
        && result.is_some()
        && items.is_empty()
        && !filter.committed_text().is_empty();

    TableView {
        header_counter_text: counter::header_counter_text(
            total_count,
            selection.len(),
        ),
        items,
        loading,
        error: orchestrator.error().map(|e| e.to_string()),
        total_count,
        pages_count,
        effective_page_index,
        pagination_disabled: loading,
        selected_items,
        columns: layout.visible(preferences),
        wrap_lines: preferences.wrap_lines,
        striped_rows: preferences.striped_rows,
        content_density: preferences.content_density,
        filter_text: filter.live_text().to_string(),
        filter_counter_text,
        no_match,
    }
}
