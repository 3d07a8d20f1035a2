//! Column layout with persisted widths

use log::debug;
use tabula_common::{
    columns::ColumnDefinition,
    ids::ColumnId,
    preferences::{ColumnWidths, Preferences},
    query::Sorting,
};

/// Column definitions with stored widths applied
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    definitions: Vec<ColumnDefinition>,
    widths: ColumnWidths,
}

impl ColumnLayout {
    pub fn new(definitions: Vec<ColumnDefinition>) -> Self {
        Self {
            definitions,
            widths: ColumnWidths::new(),
        }
    }

    /// Apply stored widths. Widths for unknown columns are ignored.
    pub fn with_widths(mut self, widths: ColumnWidths) -> Self {
        self.widths = widths;
        self
    }

    pub fn widths(&self) -> &ColumnWidths {
        &self.widths
    }

    /// All definitions, with stored widths overriding the defaults
    pub fn definitions(&self) -> Vec<ColumnDefinition> {
        self.definitions
            .iter()
            .map(|d| self.resolve(d))
            .collect()
    }

    pub fn find(&self, id: &ColumnId) -> Option<ColumnDefinition> {
        self.definitions
            .iter()
            .find(|d| &d.id == id)
            .map(|d| self.resolve(d))
    }

    fn resolve(&self, def: &ColumnDefinition) -> ColumnDefinition {
        let mut d = def.clone();
        if let Some(w) = self.widths.get(&d.id).copied().filter(|w| *w > 0) {
            d.width = Some(w);
        }
        d
    }

    /// The columns to show, in preference order
    pub fn visible(&self, preferences: &Preferences) -> Vec<ColumnDefinition> {
        preferences
            .visible_columns
            .iter()
            .filter_map(|id| self.find(id))
            .collect()
    }

    /// Initial sorting: ascending on the first column
    pub fn default_sorting(&self) -> Option<Sorting> {
        self.definitions
            .first()
            .map(|d| Sorting::ascending(d.id.clone()))
    }

    /// Record a resize. `widths` are the new widths of the visible columns,
    /// in display order. Returns the full width map to persist.
    pub fn resize(
        &mut self,
        preferences: &Preferences,
        widths: &[u32],
    ) -> ColumnWidths {
        let visible = self.visible(preferences);

        if visible.len() != widths.len() {
            debug!(
                "Resize carries {} widths for {} visible columns",
                widths.len(),
                visible.len()
            );
        }

        for (column, width) in visible.iter().zip(widths) {
            self.widths.insert(column.id.clone(), *width);
        }

        self.widths.clone()
    }
}
