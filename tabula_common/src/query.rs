//! Query snapshots sent to a data source

use serde::{Deserialize, Serialize};

use crate::ids::ColumnId;

/// Requested page, one-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
    pub page_index: u32,
    pub page_size: u32,
}

impl Pagination {
    pub fn new(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index: page_index.max(1),
            page_size: page_size.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sorting {
    pub column: ColumnId,
    pub descending: bool,
}

impl Sorting {
    pub fn ascending(column: impl Into<ColumnId>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }
}

impl From<&str> for Sorting {
    fn from(value: &str) -> Self {
        Self::ascending(value)
    }
}

/// Immutable description of one page request.
///
/// Only [build_query] creates these, so the page index is always at least one
/// and the page size is never zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryState {
    pagination: Pagination,
    sorting: Sorting,
    filter_text: String,
}

impl QueryState {
    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn page_index(&self) -> u32 {
        self.pagination.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.pagination.page_size
    }

    pub fn sorting(&self) -> &Sorting {
        &self.sorting
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }
}

impl std::fmt::Display for QueryState {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "page {} (size {}), sort {} {}, filter {:?}",
            self.pagination.page_index,
            self.pagination.page_size,
            self.sorting.column,
            if self.sorting.descending { "desc" } else { "asc" },
            self.filter_text
        )
    }
}

/// Assemble a query from the current pagination, sorting, and committed
/// filter text. Out of range pagination values are clamped.
pub fn build_query(
    pagination: Pagination,
    sorting: Sorting,
    committed_filter_text: &str,
) -> QueryState {
    QueryState {
        pagination: Pagination::new(
            pagination.page_index,
            pagination.page_size,
        ),
        sorting,
        filter_text: committed_filter_text.to_string(),
    }
}
