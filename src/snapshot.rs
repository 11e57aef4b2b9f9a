//! JSON site snapshots: bulk-load users, posts and meta into a store.
//!
//! ```json
//! {
//!   "users": [{"id": 1, "first_name": "Ada", "last_name": "Lovelace"}],
//!   "posts": [{"id": 10, "kind": "post", "status": "publish", ...}],
//!   "post_meta": [{"post_id": 20, "key": "entity_url", "value": "http://..."},
//!                 {"post_id": 10, "key": "wordlift_related_entities", "value": [20]}],
//!   "user_meta": [{"user_id": 1, "key": "wl_uri", "value": "http://..."}]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{ContentStore, MetaValue, Post, PostId, StoreResult, User, UserId};

/// Meta value as written in a snapshot: a string or an array of post ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotValue {
    Text(String),
    Ids(Vec<PostId>),
}

impl From<SnapshotValue> for MetaValue {
    fn from(value: SnapshotValue) -> Self {
        match value {
            SnapshotValue::Text(s) => MetaValue::Text(s),
            SnapshotValue::Ids(ids) => MetaValue::Ids(ids),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetaEntry {
    pub post_id: PostId,
    pub key: String,
    pub value: SnapshotValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetaEntry {
    pub user_id: UserId,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub post_meta: Vec<PostMetaEntry>,
    #[serde(default)]
    pub user_meta: Vec<UserMetaEntry>,
}

/// Record counts written by [`SiteSnapshot::apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub users: usize,
    pub posts: usize,
    pub meta: usize,
}

impl std::fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} users, {} posts, {} meta values",
            self.users, self.posts, self.meta
        )
    }
}

impl SiteSnapshot {
    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization {
            message: format!("invalid snapshot: {e}"),
        })
    }

    /// Write every record into `store`, replacing records with the same id.
    pub fn apply(self, store: &dyn ContentStore) -> StoreResult<ImportSummary> {
        let mut summary = ImportSummary::default();
        for user in self.users {
            store.put_user(user)?;
            summary.users += 1;
        }
        for post in self.posts {
            store.put_post(post)?;
            summary.posts += 1;
        }
        for entry in self.post_meta {
            store.set_post_meta(entry.post_id, &entry.key, entry.value.into())?;
            summary.meta += 1;
        }
        for entry in self.user_meta {
            store.set_user_meta(entry.user_id, &entry.key, &entry.value)?;
            summary.meta += 1;
        }
        tracing::info!(
            users = summary.users,
            posts = summary.posts,
            meta = summary.meta,
            "snapshot imported"
        );
        Ok(summary)
    }
}
