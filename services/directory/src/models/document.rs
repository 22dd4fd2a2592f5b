//! The aggregate document

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Bookmark, Category, User};

/// The single unit of persistence
///
/// There is no per-entity storage: every mutation reads the whole
/// aggregate, edits it in memory, and writes the whole aggregate back.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

impl Document {
    /// Look up a category by id
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Look up a bookmark by id
    pub fn bookmark(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    /// Number of users currently holding the admin role
    pub fn admin_count(&self) -> usize {
        self.users.values().filter(|u| u.is_admin()).count()
    }
}
