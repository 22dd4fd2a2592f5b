//! Document store
//!
//! The whole directory lives in one JSON aggregate under a single redis
//! key. Every save first snapshots the previous value into a timestamped
//! backup slot, then overwrites the canonical value and prunes the backup
//! slots down to the most recent [`BACKUP_RETENTION`]. Backup writes are
//! best-effort: backup loss is recoverable, data loss is not, so a failed
//! snapshot only logs a warning and never blocks the save.
//!
//! There is no locking or version token on the aggregate: concurrent
//! writers race and the last save wins.

use async_trait::async_trait;
use chrono::Utc;
use common::error::{StorageError, StorageResult};
use common::kv::RedisPool;
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

use crate::models::{ANONYMOUS_USERNAME, Category, Document, Permissions, Role, User};
use crate::password;

/// Redis key holding the canonical aggregate
pub const DOCUMENT_KEY: &str = "shelfmark:document";

/// Prefix of the timestamped backup slots
pub const BACKUP_KEY_PREFIX: &str = "shelfmark:backup:";

/// Number of backup slots kept after pruning
pub const BACKUP_RETENTION: usize = 30;

/// Username of the administrator created on first run
pub const INITIAL_ADMIN_USERNAME: &str = "admin";

/// Storage access seam for the aggregate document
///
/// `load` seeds a fresh document when the stored value is absent or
/// structurally incomplete; the seeded value is only persisted by an
/// explicit `save`.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn load(&self) -> StorageResult<Document>;
    async fn save(&self, doc: &Document) -> StorageResult<()>;
}

/// Build the first-run document: one administrator with a random one-time
/// password, the reserved anonymous account, and one category visible to
/// both.
pub fn seed_document() -> Document {
    let admin_password = password::generate_password(20);
    warn!(
        "Seeding empty store; one-time password for '{}': {}",
        INITIAL_ADMIN_USERNAME, admin_password
    );

    let salt = password::generate_salt();
    let hash = password::hash_password(&admin_password, &salt);

    let root_category = Category {
        id: Uuid::new_v4().to_string(),
        name: "General".to_string(),
        parent_id: None,
        sort_order: None,
    };
    let visible: std::collections::BTreeSet<String> =
        std::iter::once(root_category.id.clone()).collect();

    let admin = User {
        username: INITIAL_ADMIN_USERNAME.to_string(),
        password_hash: Some(hash),
        salt: Some(salt),
        roles: std::iter::once(Role::Admin).collect(),
        permissions: Permissions {
            visible_categories: visible.clone(),
        },
    };
    let public = User {
        username: ANONYMOUS_USERNAME.to_string(),
        password_hash: None,
        salt: None,
        roles: std::iter::once(Role::Viewer).collect(),
        permissions: Permissions {
            visible_categories: visible,
        },
    };

    let mut users = BTreeMap::new();
    users.insert(admin.username.clone(), admin);
    users.insert(public.username.clone(), public);

    Document {
        users,
        categories: vec![root_category],
        bookmarks: vec![],
    }
}

/// Decode a stored value, rejecting structurally incomplete documents
fn decode_document(raw: &str) -> Option<Document> {
    match serde_json::from_str::<Document>(raw) {
        Ok(doc) if !doc.users.is_empty() => Some(doc),
        _ => None,
    }
}

/// Production repository backed by redis
pub struct RedisRepository {
    pool: RedisPool,
}

impl RedisRepository {
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    async fn prune_backups(&self) -> StorageResult<()> {
        let mut keys = self.pool.keys(&format!("{BACKUP_KEY_PREFIX}*")).await?;
        // Millisecond timestamps are equal-width, so lexicographic order
        // is chronological.
        keys.sort();

        if keys.len() > BACKUP_RETENTION {
            let excess = keys.len() - BACKUP_RETENTION;
            for key in keys.iter().take(excess) {
                self.pool.delete(key).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for RedisRepository {
    async fn load(&self) -> StorageResult<Document> {
        match self.pool.get(DOCUMENT_KEY).await? {
            Some(raw) => match decode_document(&raw) {
                Some(doc) => Ok(doc),
                None => {
                    warn!("Stored document is structurally incomplete, reseeding");
                    Ok(seed_document())
                }
            },
            None => Ok(seed_document()),
        }
    }

    async fn save(&self, doc: &Document) -> StorageResult<()> {
        let encoded =
            serde_json::to_string(doc).map_err(|e| StorageError::Encoding(e.to_string()))?;

        match self.pool.get(DOCUMENT_KEY).await {
            Ok(Some(previous)) => {
                let backup_key =
                    format!("{BACKUP_KEY_PREFIX}{}", Utc::now().timestamp_millis());
                if let Err(e) = self.pool.set(&backup_key, &previous).await {
                    warn!("Backup snapshot failed, continuing with save: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read previous document for backup: {}", e),
        }

        self.pool.set(DOCUMENT_KEY, &encoded).await?;

        if let Err(e) = self.prune_backups().await {
            warn!("Backup pruning failed: {}", e);
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    document: Option<String>,
    backups: BTreeMap<u64, String>,
    clock: u64,
}

/// In-memory repository with the same seeding and backup semantics as the
/// redis one, used by tests
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw canonical value, if any has been persisted
    pub fn raw_document(&self) -> Option<String> {
        self.inner
            .lock()
            .expect("memory repository lock poisoned")
            .document
            .clone()
    }

    /// Number of backup slots currently held
    pub fn backup_count(&self) -> usize {
        self.inner
            .lock()
            .expect("memory repository lock poisoned")
            .backups
            .len()
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    async fn load(&self) -> StorageResult<Document> {
        let inner = self.inner.lock().expect("memory repository lock poisoned");
        match inner.document.as_deref().and_then(decode_document) {
            Some(doc) => Ok(doc),
            None => Ok(seed_document()),
        }
    }

    async fn save(&self, doc: &Document) -> StorageResult<()> {
        let encoded =
            serde_json::to_string(doc).map_err(|e| StorageError::Encoding(e.to_string()))?;

        let mut inner = self.inner.lock().expect("memory repository lock poisoned");
        if let Some(previous) = inner.document.take() {
            let stamp = inner.clock;
            inner.clock += 1;
            inner.backups.insert(stamp, previous);
        }
        inner.document = Some(encoded);

        while inner.backups.len() > BACKUP_RETENTION {
            let oldest = *inner
                .backups
                .keys()
                .next()
                .expect("non-empty backup map has a first key");
            inner.backups.remove(&oldest);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_document_satisfies_bootstrap_invariants() {
        let doc = seed_document();

        let admin = doc.users.get(INITIAL_ADMIN_USERNAME).unwrap();
        assert!(admin.is_admin());
        assert!(admin.password_hash.is_some());
        assert!(admin.salt.is_some());

        let public = doc.users.get(ANONYMOUS_USERNAME).unwrap();
        assert!(!public.is_admin());
        assert!(public.password_hash.is_none());
        assert!(public.salt.is_none());

        // The minimal category set is visible to the anonymous account
        assert_eq!(doc.categories.len(), 1);
        assert!(
            public
                .permissions
                .visible_categories
                .contains(&doc.categories[0].id)
        );
    }

    #[tokio::test]
    async fn load_seeds_without_persisting() {
        let repo = MemoryRepository::new();

        let doc = repo.load().await.unwrap();
        assert!(doc.users.contains_key(INITIAL_ADMIN_USERNAME));
        assert!(repo.raw_document().is_none());
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let repo = MemoryRepository::new();

        let mut doc = repo.load().await.unwrap();
        doc.categories[0].name = "Renamed".to_string();
        repo.save(&doc).await.unwrap();

        let reloaded = repo.load().await.unwrap();
        assert_eq!(reloaded.categories[0].name, "Renamed");
        assert!(
            reloaded.users.contains_key(INITIAL_ADMIN_USERNAME),
            "persisted users survive reload"
        );
    }

    #[tokio::test]
    async fn structurally_incomplete_value_is_reseeded() {
        let repo = MemoryRepository::new();
        repo.inner.lock().unwrap().document = Some(r#"{"categories":[]}"#.to_string());

        let doc = repo.load().await.unwrap();
        assert!(doc.users.contains_key(INITIAL_ADMIN_USERNAME));
    }

    #[tokio::test]
    async fn stored_value_missing_collection_keys_is_kept() {
        let repo = MemoryRepository::new();
        // A populated users map is what marks the value live; absent
        // collection keys decode as empty rather than triggering a reseed,
        // which would wipe the accounts.
        repo.inner.lock().unwrap().document = Some(
            r#"{"users":{"admin":{"username":"admin","roles":["admin"],"permissions":{"visible_categories":[]}}}}"#
                .to_string(),
        );

        let doc = repo.load().await.unwrap();
        assert!(doc.users.contains_key("admin"));
        assert!(!doc.users.contains_key(ANONYMOUS_USERNAME));
        assert!(doc.categories.is_empty());
        assert!(doc.bookmarks.is_empty());
    }

    #[tokio::test]
    async fn backups_are_pruned_to_retention() {
        let repo = MemoryRepository::new();
        let doc = repo.load().await.unwrap();

        for _ in 0..(BACKUP_RETENTION + 10) {
            repo.save(&doc).await.unwrap();
        }

        assert_eq!(repo.backup_count(), BACKUP_RETENTION);
    }

    #[tokio::test]
    async fn first_save_creates_no_backup() {
        let repo = MemoryRepository::new();
        let doc = repo.load().await.unwrap();

        repo.save(&doc).await.unwrap();
        assert_eq!(repo.backup_count(), 0);

        repo.save(&doc).await.unwrap();
        assert_eq!(repo.backup_count(), 1);
    }
}
