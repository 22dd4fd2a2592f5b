//! User model and related functionality

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Reserved account used to render the public, unauthenticated view.
/// It can never hold the admin role and can never be deleted.
pub const ANONYMOUS_USERNAME: &str = "public";

/// Recognized user roles
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
    Viewer,
}

/// Persisted per-user permissions
///
/// Only the visibility set is a source of truth; the edit capabilities are
/// derived from the role set on every read and never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub visible_categories: BTreeSet<String>,
}

/// User entity as stored in the aggregate document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    /// Absent for the reserved anonymous account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn can_edit_bookmarks(&self) -> bool {
        self.roles.contains(&Role::Editor) || self.roles.contains(&Role::Admin)
    }

    pub fn can_edit_categories(&self) -> bool {
        self.can_edit_bookmarks()
    }

    pub fn can_edit_users(&self) -> bool {
        self.is_admin()
    }

    /// Whether this user may see the given category. Admins see everything.
    pub fn can_see(&self, category_id: &str) -> bool {
        self.is_admin() || self.permissions.visible_categories.contains(category_id)
    }
}

/// Effective permissions as returned over the wire
///
/// A fixed record: one explicit visibility set plus capability flags
/// recomputed from the role set on every read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectivePermissions {
    pub visible_categories: BTreeSet<String>,
    pub can_edit_bookmarks: bool,
    pub can_edit_categories: bool,
    pub can_edit_users: bool,
}

/// Wire representation of a user
///
/// Never carries `password_hash` or `salt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeUser {
    pub username: String,
    pub roles: BTreeSet<Role>,
    pub permissions: EffectivePermissions,
}

impl From<&User> for SafeUser {
    fn from(user: &User) -> Self {
        SafeUser {
            username: user.username.clone(),
            roles: user.roles.clone(),
            permissions: EffectivePermissions {
                visible_categories: user.permissions.visible_categories.clone(),
                can_edit_bookmarks: user.can_edit_bookmarks(),
                can_edit_categories: user.can_edit_categories(),
                can_edit_users: user.can_edit_users(),
            },
        }
    }
}
