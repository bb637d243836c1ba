//! Canonical in-memory checklist state with write-through persistence.
//!
//! Every mutation is applied in memory, written to the key-value store as a
//! full snapshot, and pushed to the view before the call returns. A failed
//! write is reported but the in-memory change stands.

use chrono::{DateTime, Utc};
use prepkit_core::StorageError;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::layout::{percent, ChecklistLayout};
use crate::state::{ChecklistOrder, PersistedState, ORDER_KEY, STORAGE_KEY};
use crate::storage::KeyValueStore;
use crate::view::{ChecklistView, Notification};

/// What `load` found in storage.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Nothing stored yet
    Fresh,
    /// Stored state was applied
    Restored,
    /// Stored state was unreadable; the store started empty
    Recovered(StorageError),
}

/// One exported item, grouped under its category title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedItem {
    pub text: String,
    pub checked: bool,
}

/// Owned point-in-time copy of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistExport {
    pub items: BTreeMap<String, bool>,
    pub form_data: BTreeMap<String, String>,
    pub progress: u8,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<String, Vec<ExportedItem>>>,
}

impl ChecklistExport {
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Suggested download name, e.g. `emergency-checklist-2024-06-01.json`
    pub fn file_name(&self) -> String {
        format!("emergency-checklist-{}.json", self.timestamp.format("%Y-%m-%d"))
    }
}

pub struct ChecklistStore<S: KeyValueStore, V: ChecklistView> {
    storage: S,
    view: V,
    total_items: usize,
    items: BTreeMap<String, bool>,
    form_data: BTreeMap<String, String>,
    last_updated: Option<DateTime<Utc>>,
    loaded: bool,
}

impl<S: KeyValueStore, V: ChecklistView> ChecklistStore<S, V> {
    /// Create an empty store. `total_items` is the number of items in the
    /// rendered checklist and is the denominator for progress.
    pub fn new(storage: S, view: V, total_items: usize) -> Self {
        Self {
            storage,
            view,
            total_items,
            items: BTreeMap::new(),
            form_data: BTreeMap::new(),
            last_updated: None,
            loaded: false,
        }
    }

    pub fn with_layout(storage: S, view: V, layout: &ChecklistLayout) -> Self {
        Self::new(storage, view, layout.total_items())
    }

    /// Replace in-memory state with whatever is stored.
    ///
    /// Absent or unreadable data leaves the store empty; this never fails.
    pub fn load(&mut self) -> LoadOutcome {
        self.items.clear();
        self.form_data.clear();
        self.last_updated = None;

        let outcome = match self.storage.get(STORAGE_KEY) {
            Ok(None) => LoadOutcome::Fresh,
            Ok(Some(raw)) => match PersistedState::from_json(&raw) {
                Ok(state) => {
                    self.items = state.checklist_items;
                    self.form_data = state.form_data;
                    self.last_updated = state.last_updated;
                    LoadOutcome::Restored
                }
                Err(e) => LoadOutcome::Recovered(StorageError::Corrupted(e.to_string())),
            },
            Err(e) => LoadOutcome::Recovered(e),
        };

        if let LoadOutcome::Recovered(e) = &outcome {
            tracing::warn!("Error loading stored data, starting empty: {}", e);
            self.view.notify(Notification::error(e.user_message()));
        } else {
            tracing::debug!(
                "Loaded checklist: {} items, {} fields",
                self.items.len(),
                self.form_data.len()
            );
        }

        self.loaded = true;
        self.render();
        outcome
    }

    /// Check or uncheck an item. Returns the new overall progress.
    pub fn set_item(&mut self, item_id: &str, checked: bool) -> Result<u8, StorageError> {
        self.items.insert(item_id.to_string(), checked);
        let saved = self.persist();

        let progress = self.progress();
        self.view.show_item(item_id, checked);
        self.view.show_progress(progress);

        match saved {
            Ok(()) => {
                let action = if checked { "completed" } else { "uncompleted" };
                self.view.notify(Notification::success(format!("Item {}", action)));
                Ok(progress)
            }
            Err(e) => Err(self.report_write_failure(e)),
        }
    }

    pub fn set_field(&mut self, field_id: &str, value: &str) -> Result<(), StorageError> {
        self.form_data.insert(field_id.to_string(), value.to_string());
        let saved = self.persist();

        self.view.show_field(field_id, value);

        saved.map_err(|e| self.report_write_failure(e))
    }

    /// Percentage of items checked, rounded, 0 for an empty checklist.
    pub fn progress(&self) -> u8 {
        let checked = self.items.values().filter(|&&checked| checked).count();
        percent(checked, self.total_items)
    }

    /// Uncheck everything. Form data is kept, in memory and in storage.
    pub fn reset(&mut self) -> Result<(), StorageError> {
        let cleared: Vec<String> = std::mem::take(&mut self.items)
            .into_iter()
            .filter_map(|(id, checked)| checked.then_some(id))
            .collect();
        for id in &cleared {
            self.view.show_item(id, false);
        }

        let saved = if self.form_data.is_empty() {
            self.last_updated = None;
            self.storage.remove(STORAGE_KEY)
        } else {
            self.persist()
        };

        self.render();

        match saved {
            Ok(()) => {
                self.view.notify(Notification::success("Checklist reset successfully"));
                Ok(())
            }
            Err(e) => Err(self.report_write_failure(e)),
        }
    }

    pub fn export_snapshot(&self) -> ChecklistExport {
        ChecklistExport {
            items: self.items.clone(),
            form_data: self.form_data.clone(),
            progress: self.progress(),
            timestamp: Utc::now(),
            categories: None,
        }
    }

    /// Export with items grouped under their category titles.
    pub fn export_with_layout(&self, layout: &ChecklistLayout) -> ChecklistExport {
        let categories = layout
            .categories
            .iter()
            .map(|category| {
                let items = category
                    .items
                    .iter()
                    .map(|item| ExportedItem {
                        text: item.label.clone(),
                        checked: self.is_checked(&item.id),
                    })
                    .collect();
                (category.title.clone(), items)
            })
            .collect();

        ChecklistExport {
            categories: Some(categories),
            ..self.export_snapshot()
        }
    }

    pub fn save_order(&mut self, order: &ChecklistOrder) -> Result<(), StorageError> {
        let raw = serde_json::to_string(order)
            .map_err(|e| StorageError::WriteFailure(e.to_string()))?;
        self.storage.set(ORDER_KEY, &raw)
    }

    /// Stored item ordering, or the layout's own order when nothing usable is
    /// stored.
    pub fn load_order(&self, layout: &ChecklistLayout) -> ChecklistOrder {
        match self.storage.get(ORDER_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed checklist order: {}", e);
                layout.default_order()
            }),
            Ok(None) => layout.default_order(),
            Err(e) => {
                tracing::warn!("Failed to read checklist order: {}", e);
                layout.default_order()
            }
        }
    }

    pub fn is_checked(&self, item_id: &str) -> bool {
        self.items.get(item_id).copied().unwrap_or(false)
    }

    pub fn items(&self) -> &BTreeMap<String, bool> {
        &self.items
    }

    pub fn form_data(&self) -> &BTreeMap<String, String> {
        &self.form_data
    }

    pub fn field(&self, field_id: &str) -> Option<&str> {
        self.form_data.get(field_id).map(String::as_str)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    fn persist(&mut self) -> Result<(), StorageError> {
        let now = Utc::now();
        let state = PersistedState {
            checklist_items: self.items.clone(),
            form_data: self.form_data.clone(),
            last_updated: Some(now),
        };
        let raw = state
            .to_json()
            .map_err(|e| StorageError::WriteFailure(e.to_string()))?;

        self.storage.set(STORAGE_KEY, &raw)?;
        self.last_updated = Some(now);
        Ok(())
    }

    fn report_write_failure(&mut self, e: StorageError) -> StorageError {
        tracing::error!("Error saving checklist: {}", e);
        self.view.notify(Notification::error(e.user_message()));
        e
    }

    fn render(&mut self) {
        for (id, checked) in &self.items {
            self.view.show_item(id, *checked);
        }
        for (id, value) in &self.form_data {
            self.view.show_field(id, value);
        }
        let progress = self.progress();
        self.view.show_progress(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Category, ItemSpec};
    use crate::storage::MemoryStore;
    use crate::view::NotificationKind;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingView {
        items: BTreeMap<String, bool>,
        fields: BTreeMap<String, String>,
        progress: Vec<u8>,
        notifications: Vec<Notification>,
    }

    impl ChecklistView for RecordingView {
        fn show_item(&mut self, item_id: &str, checked: bool) {
            self.items.insert(item_id.to_string(), checked);
        }

        fn show_field(&mut self, field_id: &str, value: &str) {
            self.fields.insert(field_id.to_string(), value.to_string());
        }

        fn show_progress(&mut self, percent: u8) {
            self.progress.push(percent);
        }

        fn notify(&mut self, notification: Notification) {
            self.notifications.push(notification);
        }
    }

    /// Memory store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::WriteFailure("quota exceeded".into()));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::WriteFailure("quota exceeded".into()));
            }
            self.inner.remove(key)
        }
    }

    fn store(total: usize) -> ChecklistStore<MemoryStore, RecordingView> {
        let mut store = ChecklistStore::new(MemoryStore::new(), RecordingView::default(), total);
        store.load();
        store
    }

    fn stored_state<S: KeyValueStore, V: ChecklistView>(store: &ChecklistStore<S, V>) -> Option<PersistedState> {
        store
            .storage()
            .get(STORAGE_KEY)
            .unwrap()
            .map(|raw| PersistedState::from_json(&raw).unwrap())
    }

    #[test]
    fn test_load_fresh() {
        let mut store = ChecklistStore::new(MemoryStore::new(), RecordingView::default(), 3);
        assert!(!store.is_loaded());

        assert!(matches!(store.load(), LoadOutcome::Fresh));
        assert!(store.is_loaded());
        assert_eq!(store.progress(), 0);
        assert_eq!(store.view().progress, vec![0]);
        assert!(store.view().notifications.is_empty());
    }

    #[test]
    fn test_progress_scenario() {
        let mut store = store(5);

        store.set_item("item-1", true).unwrap();
        assert_eq!(store.set_item("item-3", true).unwrap(), 40);
        assert_eq!(store.set_item("item-1", false).unwrap(), 20);
        assert_eq!(store.progress(), 20);
    }

    #[test]
    fn test_progress_empty_checklist_is_zero() {
        let mut store = store(0);
        assert_eq!(store.set_item("orphan", true).unwrap(), 0);
    }

    #[test]
    fn test_progress_all_checked_is_hundred() {
        let mut store = store(3);
        for id in ["a", "b", "c"] {
            store.set_item(id, true).unwrap();
        }
        assert_eq!(store.progress(), 100);

        // Unknown ids never push past 100
        store.set_item("extra", true).unwrap();
        assert_eq!(store.progress(), 100);
    }

    #[test]
    fn test_set_item_is_write_through() {
        let mut store = store(5);
        store.set_item("water", true).unwrap();

        let persisted = stored_state(&store).unwrap();
        assert_eq!(persisted.checklist_items, *store.items());
        assert!(persisted.last_updated.is_some());
        assert_eq!(store.last_updated(), persisted.last_updated);
    }

    #[test]
    fn test_set_item_updates_view_and_notifies() {
        let mut store = store(4);
        store.set_item("water", true).unwrap();
        store.set_item("water", false).unwrap();

        let view = store.view();
        assert_eq!(view.items.get("water"), Some(&false));
        assert_eq!(view.progress.last(), Some(&0));
        let messages: Vec<_> = view.notifications.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["Item completed", "Item uncompleted"]);
        assert!(view
            .notifications
            .iter()
            .all(|n| n.kind == NotificationKind::Success));
    }

    #[test]
    fn test_set_field_is_write_through() {
        let mut store = store(5);
        store.set_field("contact-name", "Ana").unwrap();

        assert_eq!(store.field("contact-name"), Some("Ana"));
        assert_eq!(store.view().fields.get("contact-name").map(String::as_str), Some("Ana"));
        let persisted = stored_state(&store).unwrap();
        assert_eq!(persisted.form_data.get("contact-name").map(String::as_str), Some("Ana"));
    }

    #[test]
    fn test_write_failure_keeps_memory_and_notifies() {
        let mut store = ChecklistStore::new(FlakyStore::default(), RecordingView::default(), 2);
        store.load();
        store.set_item("a", true).unwrap();

        store.storage().fail_writes.store(true, Ordering::SeqCst);
        let result = store.set_item("b", true);

        assert!(matches!(result, Err(StorageError::WriteFailure(_))));
        assert!(store.is_checked("b"));
        assert_eq!(store.progress(), 100);
        assert_eq!(store.view().progress.last(), Some(&100));

        let last = store.view().notifications.last().unwrap();
        assert_eq!(last.kind, NotificationKind::Error);
        assert_eq!(last.message, "Error saving progress");

        // Storage still holds the last good snapshot
        let persisted = stored_state(&store).unwrap();
        assert_eq!(persisted.checklist_items.get("b"), None);
    }

    #[test]
    fn test_set_field_failure_is_reported() {
        let mut store = ChecklistStore::new(FlakyStore::default(), RecordingView::default(), 2);
        store.load();
        store.storage().fail_writes.store(true, Ordering::SeqCst);

        assert!(store.set_field("name", "Ana").is_err());
        assert_eq!(store.field("name"), Some("Ana"));
        assert_eq!(store.view().notifications.len(), 1);
    }

    #[test]
    fn test_load_round_trips_mutations() {
        let storage = MemoryStore::new();
        storage.set(STORAGE_KEY, "{}").unwrap();

        let mut first = ChecklistStore::new(storage, RecordingView::default(), 4);
        first.load();
        first.set_item("a", true).unwrap();
        first.set_item("b", true).unwrap();
        first.set_item("a", false).unwrap();
        first.set_field("phone", "555-0100").unwrap();

        let items = first.items().clone();
        let form = first.form_data().clone();
        let raw = first.storage().get(STORAGE_KEY).unwrap().unwrap();

        let reopened = MemoryStore::new();
        reopened.set(STORAGE_KEY, &raw).unwrap();
        let mut second = ChecklistStore::new(reopened, RecordingView::default(), 4);

        assert!(matches!(second.load(), LoadOutcome::Restored));
        assert_eq!(second.items(), &items);
        assert_eq!(second.form_data(), &form);
        assert_eq!(second.progress(), 25);
        assert_eq!(second.view().items, items);
        assert_eq!(second.view().fields, form);
    }

    #[test]
    fn test_load_corrupt_blob_recovers_empty() {
        let storage = MemoryStore::new();
        storage.set(STORAGE_KEY, "{not json").unwrap();

        let mut store = ChecklistStore::new(storage, RecordingView::default(), 5);
        let outcome = store.load();

        assert!(matches!(outcome, LoadOutcome::Recovered(StorageError::Corrupted(_))));
        assert!(store.items().is_empty());
        assert!(store.form_data().is_empty());
        assert_eq!(store.progress(), 0);

        let notification = store.view().notifications.first().unwrap();
        assert_eq!(notification.kind, NotificationKind::Error);
        assert_eq!(notification.message, "Error loading saved data");

        // The store is usable afterwards and overwrites the bad blob
        store.set_item("a", true).unwrap();
        assert!(stored_state(&store).is_some());
    }

    #[test]
    fn test_load_discards_unsaved_memory() {
        let mut store = store(2);
        store.set_item("a", true).unwrap();
        store.storage().remove(STORAGE_KEY).unwrap();

        assert!(matches!(store.load(), LoadOutcome::Fresh));
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_reset_keeps_form_data() {
        let mut store = store(3);
        store.set_item("a", true).unwrap();
        store.set_field("name", "Ana").unwrap();

        store.reset().unwrap();

        assert!(store.items().is_empty());
        assert_eq!(store.field("name"), Some("Ana"));
        assert_eq!(store.view().items.get("a"), Some(&false));
        assert_eq!(store.view().fields.get("name").map(String::as_str), Some("Ana"));
        assert_eq!(store.view().progress.last(), Some(&0));
        let persisted = stored_state(&store).unwrap();
        assert!(persisted.checklist_items.is_empty());
        assert_eq!(persisted.form_data.get("name").map(String::as_str), Some("Ana"));
        assert_eq!(
            store.view().notifications.last().map(|n| n.message.as_str()),
            Some("Checklist reset successfully")
        );
    }

    #[test]
    fn test_reset_without_form_data_removes_blob() {
        let mut store = store(2);
        store.set_item("a", true).unwrap();
        store.set_item("b", true).unwrap();

        store.reset().unwrap();

        assert!(stored_state(&store).is_none());
        assert_eq!(store.progress(), 0);
        assert!(store.last_updated().is_none());

        // The view must not keep showing ticked boxes next to 0%
        let view = store.view();
        assert!(view.items.values().all(|checked| !checked));
        assert_eq!(view.items.len(), 2);
        assert_eq!(view.progress.last(), Some(&0));
    }

    #[test]
    fn test_progress_never_decreases_while_checking() {
        for total in [3, 7] {
            let mut store = store(total);
            let mut previous = 0;

            for i in 0..total {
                let progress = store.set_item(&format!("item-{}", i), true).unwrap();
                assert!(
                    progress >= previous,
                    "total {}: progress fell from {} to {}",
                    total,
                    previous,
                    progress
                );
                previous = progress;
            }

            assert_eq!(previous, 100);
        }
    }

    #[test]
    fn test_export_snapshot_is_detached() {
        let mut store = store(2);
        store.set_item("a", true).unwrap();

        let export = store.export_snapshot();
        store.set_item("b", true).unwrap();

        assert_eq!(export.progress, 50);
        assert_eq!(export.items.len(), 1);
        assert!(export.categories.is_none());
        assert!(export.file_name().starts_with("emergency-checklist-"));

        let json: serde_json::Value = serde_json::from_str(&export.to_pretty_json().unwrap()).unwrap();
        assert_eq!(json["items"]["a"], true);
        assert_eq!(json["progress"], 50);
        assert!(json.get("formData").is_some());
        assert!(json.get("categories").is_none());
    }

    fn layout() -> ChecklistLayout {
        ChecklistLayout::new(vec![Category {
            id: "water".into(),
            title: "Water".into(),
            items: vec![
                ItemSpec {
                    id: "w1".into(),
                    label: "Bottled water".into(),
                },
                ItemSpec {
                    id: "w2".into(),
                    label: "Filter".into(),
                },
            ],
        }])
    }

    #[test]
    fn test_export_with_layout_groups_by_title() {
        let layout = layout();
        let mut store = ChecklistStore::with_layout(MemoryStore::new(), RecordingView::default(), &layout);
        store.load();
        store.set_item("w2", true).unwrap();

        let export = store.export_with_layout(&layout);
        let categories = export.categories.unwrap();
        let water = &categories["Water"];
        assert_eq!(
            water,
            &vec![
                ExportedItem {
                    text: "Bottled water".into(),
                    checked: false
                },
                ExportedItem {
                    text: "Filter".into(),
                    checked: true
                },
            ]
        );
    }

    #[test]
    fn test_order_round_trip_and_fallback() {
        let layout = layout();
        let mut store = ChecklistStore::with_layout(MemoryStore::new(), RecordingView::default(), &layout);

        assert_eq!(store.load_order(&layout), layout.default_order());

        let mut order = layout.default_order();
        order.move_item("water", "w2", "w1");
        store.save_order(&order).unwrap();
        assert_eq!(store.load_order(&layout), order);

        store.storage().set(ORDER_KEY, "[oops").unwrap();
        assert_eq!(store.load_order(&layout), layout.default_order());
    }
}
