//! In-memory rows with filtering, sorting and pagination

use std::{cmp::Ordering, ops::Range};

use tabula_common::{fetch::Row, ids::ColumnId, query::QueryState};

/// A row the mock table can filter and sort
pub trait Searchable: Row {
    /// Value used when sorting by `column`, if the column exists
    fn sort_key(&self, column: &ColumnId) -> Option<String>;

    /// True if any text field contains `needle`, which is already lowercase
    fn matches(&self, needle: &str) -> bool;
}

/// Where a page lands after clamping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    pub pages_count: u32,
    pub page_index: u32,
    pub range: Range<usize>,
}

/// Compute the window for `requested` over `total` rows.
///
/// Pages past the end clamp to the last page; an empty set resolves to page
/// one with no rows.
pub fn paginate(total: usize, page_size: u32, requested: u32) -> PageWindow {
    let page_size = page_size.max(1) as usize;
    let pages_count = total.div_ceil(page_size);

    let page_index = requested.clamp(1, pages_count.max(1) as u32);

    let start = ((page_index as usize - 1) * page_size).min(total);
    let end = (start + page_size).min(total);

    PageWindow {
        pages_count: pages_count as u32,
        page_index,
        range: start..end,
    }
}

/// One answered page
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    pub total_count: u64,
    pub pages_count: u32,
    pub page_index: u32,
}

#[derive(Debug, Clone, Default)]
pub struct TableStore<R> {
    rows: Vec<R>,
}

impl<R: Searchable> TableStore<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Answer a query. Sorting is stable, and rows tie-break on id so equal
    /// queries always give identical pages.
    pub fn page(&self, query: &QueryState) -> Page<R> {
        let needle = query.filter_text().trim().to_lowercase();

        let mut matched: Vec<&R> = self
            .rows
            .iter()
            .filter(|r| needle.is_empty() || r.matches(&needle))
            .collect();

        let sorting = query.sorting();

        matched.sort_by(|a, b| {
            let ord = match (a.sort_key(&sorting.column), b.sort_key(&sorting.column))
            {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => Ordering::Equal,
            };

            let ord = ord.then_with(|| a.id().cmp(&b.id()));

            if sorting.descending {
                ord.reverse()
            } else {
                ord
            }
        });

        let window = paginate(matched.len(), query.page_size(), query.page_index());

        Page {
            items: matched[window.range.clone()]
                .iter()
                .map(|r| (*r).clone())
                .collect(),
            total_count: matched.len() as u64,
            pages_count: window.pages_count,
            page_index: window.page_index,
        }
    }
}
