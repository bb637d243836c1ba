//! Static checklist structure and the derived views over it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::ChecklistOrder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub title: String,
    pub items: Vec<ItemSpec>,
}

/// Ordered categories of checklist items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistLayout {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Completed,
    Incomplete,
}

impl ChecklistLayout {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn total_items(&self) -> usize {
        self.categories.iter().map(|c| c.items.len()).sum()
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Ordering as currently laid out.
    pub fn default_order(&self) -> ChecklistOrder {
        ChecklistOrder(
            self.categories
                .iter()
                .map(|c| (c.id.clone(), c.items.iter().map(|i| i.id.clone()).collect()))
                .collect(),
        )
    }

    /// Reorder items within each category to follow `order`.
    ///
    /// Ids in `order` that the layout does not know are skipped; items the
    /// order does not mention keep their relative position at the end.
    pub fn apply_order(&mut self, order: &ChecklistOrder) {
        for category in &mut self.categories {
            let Some(ids) = order.items(&category.id) else {
                continue;
            };
            let mut remaining = std::mem::take(&mut category.items);
            let mut sorted = Vec::with_capacity(remaining.len());
            for id in ids {
                if let Some(pos) = remaining.iter().position(|item| &item.id == id) {
                    sorted.push(remaining.remove(pos));
                }
            }
            sorted.append(&mut remaining);
            category.items = sorted;
        }
    }
}

/// Rounded percentage, 0 when `total` is 0, never above 100.
pub fn percent(checked: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let checked = checked.min(total);
    // Integer round-half-up of checked * 100 / total
    ((checked * 200 + total) / (total * 2)) as u8
}

fn is_checked(items: &BTreeMap<String, bool>, id: &str) -> bool {
    items.get(id).copied().unwrap_or(false)
}

/// Per-category completion percentage, keyed by category id.
pub fn category_progress(
    layout: &ChecklistLayout,
    items: &BTreeMap<String, bool>,
) -> BTreeMap<String, u8> {
    layout
        .categories
        .iter()
        .map(|category| {
            let checked = category
                .items
                .iter()
                .filter(|item| is_checked(items, &item.id))
                .count();
            (category.id.clone(), percent(checked, category.items.len()))
        })
        .collect()
}

/// Items visible under `filter`, in layout order.
pub fn filter_items<'a>(
    layout: &'a ChecklistLayout,
    items: &BTreeMap<String, bool>,
    filter: Filter,
) -> Vec<&'a ItemSpec> {
    layout
        .categories
        .iter()
        .flat_map(|c| c.items.iter())
        .filter(|item| match filter {
            Filter::All => true,
            Filter::Completed => is_checked(items, &item.id),
            Filter::Incomplete => !is_checked(items, &item.id),
        })
        .collect()
}

/// Plain-text rendering for clipboard or share targets.
pub fn shareable_text(layout: &ChecklistLayout, items: &BTreeMap<String, bool>) -> String {
    let mut text = String::from("Emergency Preparedness Checklist\n\n");
    for category in &layout.categories {
        text.push_str(&category.title);
        text.push('\n');
        for item in &category.items {
            let mark = if is_checked(items, &item.id) { '✓' } else { '☐' };
            text.push(mark);
            text.push(' ');
            text.push_str(&item.label);
            text.push('\n');
        }
        text.push('\n');
    }
    text
}
