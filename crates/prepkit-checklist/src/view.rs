//! Rendering port.
//!
//! The store pushes state changes here; a UI layer renders them. Nothing in
//! this crate depends on how.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }
}

pub trait ChecklistView {
    fn show_item(&mut self, item_id: &str, checked: bool);
    fn show_field(&mut self, field_id: &str, value: &str);
    fn show_progress(&mut self, percent: u8);
    fn notify(&mut self, notification: Notification);
}

/// View that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullView;

impl ChecklistView for NullView {
    fn show_item(&mut self, _item_id: &str, _checked: bool) {}
    fn show_field(&mut self, _field_id: &str, _value: &str) {}
    fn show_progress(&mut self, _percent: u8) {}
    fn notify(&mut self, _notification: Notification) {}
}
