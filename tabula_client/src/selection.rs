//! Row selection that survives reloads

use indexmap::IndexSet;
use tabula_common::{fetch::Row, ids::RowId};

/// Identities of the selected rows, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: IndexSet<RowId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection as-is. Used for direct user selection.
    pub fn set<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = RowId>,
    {
        self.ids = ids.into_iter().collect();
    }

    /// Keep only the selected ids present in `present`.
    /// Returns how many were dropped.
    pub fn reconcile<I>(&mut self, present: I) -> usize
    where
        I: IntoIterator<Item = RowId>,
    {
        let present: IndexSet<RowId> = present.into_iter().collect();
        let before = self.ids.len();

        self.ids.retain(|id| present.contains(id));

        before - self.ids.len()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &RowId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RowId> {
        self.ids.iter()
    }

    /// The selected rows among `items`, in item order
    pub fn selected_items<R: Row>(&self, items: &[R]) -> Vec<R> {
        items
            .iter()
            .filter(|r| self.ids.contains(&r.id()))
            .cloned()
            .collect()
    }
}

impl FromIterator<RowId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = RowId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
