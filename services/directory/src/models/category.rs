//! Category model and related functionality

use serde::{Deserialize, Serialize};

/// Category entity
///
/// Categories form a forest: `parent_id` refers to another category id,
/// with `None` meaning root-level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

/// Category creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

/// Category update payload
///
/// `parent_id` distinguishes "absent" (leave unchanged) from an explicit
/// `null` (move to root level).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCategory {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Option<String>>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}
