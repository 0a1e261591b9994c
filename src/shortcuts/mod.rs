//! Shortcut model and the persisted Local Store.
//!
//! - `types` - `Shortcut`, kinds, icons, create/edit payloads
//! - `store` - `ShortcutStore`, the locked read-modify-write collection

mod store;
mod types;


pub(crate) use store::find_mut;
pub use store::ShortcutStore;
pub use types::{
    MessagingApp, Shortcut, ShortcutDetails, ShortcutDraft, ShortcutIcon, ShortcutKind,
    ShortcutKindParseError, ShortcutPatch,
};
