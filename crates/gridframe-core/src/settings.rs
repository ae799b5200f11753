use crate::error::GridError;
use crate::filter::FilterCondition;
use crate::sort::SortColumn;
use crate::window::RowHeightTier;
use serde::Deserialize;
use serde::Serialize;

/// Per-column persisted state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnSettings {
    pub id: String,
    pub width: Option<u32>,
    pub visible: bool,
}

/// The opaque settings bundle a host may serialize to any storage and
/// feed back through `restore_settings`. The engine defines the shape
/// and round-trip contract; storage itself is a host concern.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub active_page: usize,
    pub page_size: usize,
    pub row_height: RowHeightTier,
    pub sort_order: Option<SortColumn>,
    #[serde(default)]
    pub filter: Vec<FilterCondition>,
    #[serde(default)]
    pub columns: Vec<ColumnSettings>,
}

impl GridSettings {
    pub fn to_json(&self) -> Result<String, GridError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, GridError> {
        Ok(serde_json::from_str(json)?)
    }
}
