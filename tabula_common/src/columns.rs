//! Column definitions shared by data sources and table clients

use serde::{Deserialize, Serialize};

use crate::ids::ColumnId;

/// Definition of a single table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: ColumnId,
    pub header: String,
    pub sortable: bool,
    /// Width in pixels; `None` lets the renderer decide
    pub width: Option<u32>,
    pub min_width: Option<u32>,
}

impl ColumnDefinition {
    pub fn new(id: &str, header: &str) -> Self {
        Self {
            id: id.into(),
            header: header.to_string(),
            sortable: true,
            width: None,
            min_width: None,
        }
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_min_width(mut self, min_width: u32) -> Self {
        self.min_width = Some(min_width);
        self
    }
}
