//! Authorization resolver
//!
//! Given an authenticated or anonymous caller and the current document,
//! computes the caller's effective permissions and the subset of
//! categories and bookmarks visible to them.

use serde::Serialize;

use crate::error::AuthError;
use crate::models::{ANONYMOUS_USERNAME, Bookmark, Category, Document, User};
use crate::token::TokenService;

/// The subset of the aggregate a caller may see
#[derive(Debug, Clone, Serialize)]
pub struct View {
    pub categories: Vec<Category>,
    pub bookmarks: Vec<Bookmark>,
}

/// Resolve a bearer token to the stored user it names
///
/// Token role claims are advisory; the returned user record is the only
/// authorization source, so role changes take effect on the next lookup.
pub fn authenticate<'a>(
    bearer: Option<&str>,
    tokens: &TokenService,
    doc: &'a Document,
) -> Result<&'a User, AuthError> {
    let token = bearer.ok_or(AuthError::MissingCredentials)?;
    let claims = tokens.verify(token)?;
    doc.users.get(&claims.sub).ok_or(AuthError::UnknownSubject)
}

/// The reserved account backing the public, unauthenticated view
pub fn anonymous_user(doc: &Document) -> Result<&User, AuthError> {
    doc.users
        .get(ANONYMOUS_USERNAME)
        .ok_or(AuthError::MissingCredentials)
}

/// Compute the caller's view of the document
///
/// Admins see everything. Everyone else sees exactly the categories in
/// their visibility set and the bookmarks filed directly under one of
/// them; visibility is per-id, never ancestor-inclusive.
pub fn resolve_view(user: &User, doc: &Document) -> View {
    if user.is_admin() {
        return View {
            categories: doc.categories.clone(),
            bookmarks: doc.bookmarks.clone(),
        };
    }

    let visible = &user.permissions.visible_categories;
    View {
        categories: doc
            .categories
            .iter()
            .filter(|c| visible.contains(&c.id))
            .cloned()
            .collect(),
        bookmarks: doc
            .bookmarks
            .iter()
            .filter(|b| visible.contains(&b.category_id))
            .cloned()
            .collect(),
    }
}
