//! User display preferences and column widths

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::ColumnId;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentDensity {
    #[default]
    Comfortable,
    Compact,
}

/// Settings chosen through the table's preferences dialog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub page_size: u32,
    /// Visible columns, in display order
    pub visible_columns: Vec<ColumnId>,
    pub wrap_lines: bool,
    #[serde(default)]
    pub striped_rows: bool,
    #[serde(default)]
    pub content_density: ContentDensity,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            page_size: 30,
            visible_columns: Vec::new(),
            wrap_lines: false,
            striped_rows: false,
            content_density: ContentDensity::default(),
        }
    }
}

impl Preferences {
    /// Defaults showing the given columns
    pub fn with_columns<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnId>,
    {
        Self {
            visible_columns: columns.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn is_visible(&self, column: &ColumnId) -> bool {
        self.visible_columns.contains(column)
    }
}

/// Persisted column widths in pixels, keyed by column
pub type ColumnWidths = IndexMap<ColumnId, u32>;
