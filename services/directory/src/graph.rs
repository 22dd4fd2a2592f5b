//! Category graph operations
//!
//! Tree traversal over the category forest, used for cascading deletes and
//! for rejecting reparent operations that would create a cycle.

use std::collections::{BTreeSet, VecDeque};

use crate::models::{Category, Document};

/// Collect every descendant of the given roots by breadth-first traversal
///
/// The roots themselves are not included unless one is a descendant of
/// another. The visited set guarantees termination even on malformed data
/// containing a cycle.
pub fn descendants_of(root_ids: &BTreeSet<String>, categories: &[Category]) -> BTreeSet<String> {
    let mut found: BTreeSet<String> = BTreeSet::new();
    let mut frontier: VecDeque<String> = root_ids.iter().cloned().collect();

    while let Some(current) = frontier.pop_front() {
        for child in categories
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(current.as_str()))
        {
            if found.insert(child.id.clone()) {
                frontier.push_back(child.id.clone());
            }
        }
    }
    found
}

/// Remove the targets, all their descendants, every bookmark under any of
/// them, and every visibility reference to any of them
///
/// All three removals are applied to the in-memory document before any
/// save, so callers never observe a partial state. Returns the full set of
/// removed category ids.
pub fn cascade_delete(target_ids: &BTreeSet<String>, doc: &mut Document) -> BTreeSet<String> {
    let mut all_ids = descendants_of(target_ids, &doc.categories);
    all_ids.extend(target_ids.iter().cloned());

    doc.categories.retain(|c| !all_ids.contains(&c.id));
    doc.bookmarks.retain(|b| !all_ids.contains(&b.category_id));
    for user in doc.users.values_mut() {
        user.permissions
            .visible_categories
            .retain(|id| !all_ids.contains(id));
    }
    all_ids
}

/// Whether reparenting `category_id` under `new_parent_id` would make the
/// node its own ancestor
pub fn would_create_cycle(
    category_id: &str,
    new_parent_id: &str,
    categories: &[Category],
) -> bool {
    if category_id == new_parent_id {
        return true;
    }
    let roots: BTreeSet<String> = std::iter::once(category_id.to_string()).collect();
    descendants_of(&roots, categories).contains(new_parent_id)
}
