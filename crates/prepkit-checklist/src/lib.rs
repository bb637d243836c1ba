//! Client-side emergency checklist for PrepKit
//!
//! `ChecklistStore` owns checklist completion and contact-form values for one
//! session, writing every change through to a `KeyValueStore` and pushing it
//! to a `ChecklistView`.

pub mod contacts;
pub mod layout;
pub mod state;
pub mod storage;
pub mod store;
pub mod view;

pub use contacts::{
    contacts_to_vcard, sanitize_text, validate_contact_form, validate_email, validate_message,
    validate_name, ContactForm, EmergencyContact, FieldError,
};
pub use layout::{
    category_progress, filter_items, percent, shareable_text, Category, ChecklistLayout, Filter,
    ItemSpec,
};
pub use state::{ChecklistOrder, PersistedState, ORDER_KEY, STORAGE_KEY};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use store::{ChecklistExport, ChecklistStore, ExportedItem, LoadOutcome};
pub use view::{ChecklistView, Notification, NotificationKind, NullView};
