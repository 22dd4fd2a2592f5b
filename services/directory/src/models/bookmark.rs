//! Bookmark model and related functionality

use serde::{Deserialize, Serialize};

/// Bookmark entry
///
/// `category_id` references an existing category; a dangling reference is
/// tolerated at read time but excluded from every visibility-filtered view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub name: String,
    pub url: String,
    pub category_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i64>,
}

/// Bookmark creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct NewBookmark {
    pub name: String,
    pub url: String,
    pub category_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sort_order: Option<i64>,
}

/// Bookmark update payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookmark {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub sort_order: Option<i64>,
}
