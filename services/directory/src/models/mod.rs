//! Directory service models

pub mod bookmark;
pub mod category;
pub mod document;
pub mod user;

// Re-export for convenience
pub use bookmark::{Bookmark, NewBookmark, UpdateBookmark};
pub use category::{Category, NewCategory, UpdateCategory};
pub use document::Document;
pub use user::{ANONYMOUS_USERNAME, EffectivePermissions, Permissions, Role, SafeUser, User};
