use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage key for the checklist blob
pub const STORAGE_KEY: &str = "emergency-prep-data";

/// Storage key for the per-category item ordering
pub const ORDER_KEY: &str = "emergency-prep-data-order";

/// The blob written to the key-value store on every mutation.
///
/// Missing maps deserialize as empty; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub checklist_items: BTreeMap<String, bool>,
    #[serde(default)]
    pub form_data: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl PersistedState {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Item ordering per category: `{categoryId: [itemId, ...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecklistOrder(pub BTreeMap<String, Vec<String>>);

impl ChecklistOrder {
    pub fn items(&self, category: &str) -> Option<&[String]> {
        self.0.get(category).map(Vec::as_slice)
    }

    pub fn set_category(&mut self, category: impl Into<String>, items: Vec<String>) {
        self.0.insert(category.into(), items);
    }

    /// Drop `dragged` onto `target` within one category.
    ///
    /// Dragging down places the item after the target, dragging up places it
    /// before. Returns false when either id is not in the category.
    pub fn move_item(&mut self, category: &str, dragged: &str, target: &str) -> bool {
        let Some(items) = self.0.get_mut(category) else {
            return false;
        };
        let (Some(from), Some(to)) = (
            items.iter().position(|id| id == dragged),
            items.iter().position(|id| id == target),
        ) else {
            return false;
        };
        if from == to {
            return true;
        }

        // Removing first shifts a lower target up by one, so index `to` is
        // "after target" when dragging down and "before target" when dragging up.
        let item = items.remove(from);
        items.insert(to, item);
        true
    }
}
