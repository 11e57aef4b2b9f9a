//! ACID-durable content store backed by redb.
//!
//! Records are bincode-encoded. Every call runs in its own transaction, so
//! single writes are atomic but multi-record updates (the relationship
//! index) are not.

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;

use super::{ContentStore, MetaValue, NewPost, Post, PostId, PostKind, StoreResult, User, UserId};

const POSTS: TableDefinition<u64, &[u8]> = TableDefinition::new("posts");
const POST_META: TableDefinition<(u64, &str), &[u8]> = TableDefinition::new("post_meta");
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");
const USER_META: TableDefinition<(u64, &str), &str> = TableDefinition::new("user_meta");
const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");

const NEXT_POST_ID: &str = "next_post_id";

fn redb_err(context: &str, e: impl Display) -> StoreError {
    StoreError::Redb {
        message: format!("{context} failed: {e}"),
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: format!("encode failed: {e}"),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: format!("decode failed: {e}"),
    })
}

/// Content store persisted in a single redb file.
pub struct DurableStore {
    db: Arc<Database>,
}

impl DurableStore {
    /// Open or create a store in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join("content.redb");
        let db = Database::create(&db_path).map_err(|e| StoreError::Redb {
            message: format!("failed to open redb at {}: {e}", db_path.display()),
        })?;

        // Create every table up front so read transactions never miss one.
        let txn = db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            txn.open_table(POSTS).map_err(|e| redb_err("open_table", e))?;
            txn.open_table(POST_META).map_err(|e| redb_err("open_table", e))?;
            txn.open_table(USERS).map_err(|e| redb_err("open_table", e))?;
            txn.open_table(USER_META).map_err(|e| redb_err("open_table", e))?;
            txn.open_table(COUNTERS).map_err(|e| redb_err("open_table", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn all_posts(&self) -> StoreResult<Vec<Post>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn.open_table(POSTS).map_err(|e| redb_err("open_table", e))?;
        let mut posts = Vec::new();
        for row in table.iter().map_err(|e| redb_err("iter", e))? {
            let (_, value) = row.map_err(|e| redb_err("iter", e))?;
            posts.push(decode::<Post>(value.value())?);
        }
        Ok(posts)
    }

    /// Store `post` under its id and move the allocator past it.
    fn write_post(&self, post: &Post) -> StoreResult<()> {
        let bytes = encode(post)?;
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn.open_table(POSTS).map_err(|e| redb_err("open_table", e))?;
            table
                .insert(post.id, bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
            let mut counters = txn.open_table(COUNTERS).map_err(|e| redb_err("open_table", e))?;
            let next = counters
                .get(NEXT_POST_ID)
                .map_err(|e| redb_err("get", e))?
                .map(|g| g.value())
                .unwrap_or(1);
            let after = post.id.saturating_add(1);
            if after > next {
                counters
                    .insert(NEXT_POST_ID, after)
                    .map_err(|e| redb_err("insert", e))?;
            }
        }
        txn.commit().map_err(|e| redb_err("commit", e))
    }
}

impl ContentStore for DurableStore {
    fn post(&self, id: PostId) -> StoreResult<Option<Post>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn.open_table(POSTS).map_err(|e| redb_err("open_table", e))?;
        let value = table
            .get(id)
            .map_err(|e| redb_err("get", e))?
            .map(|guard| decode(guard.value()))
            .transpose()?;
        Ok(value)
    }

    fn put_post(&self, post: Post) -> StoreResult<()> {
        self.write_post(&post)
    }

    fn insert_post(&self, new: NewPost) -> StoreResult<PostId> {
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        let id = {
            let mut counters = txn.open_table(COUNTERS).map_err(|e| redb_err("open_table", e))?;
            let id = counters
                .get(NEXT_POST_ID)
                .map_err(|e| redb_err("get", e))?
                .map(|g| g.value())
                .unwrap_or(1);
            if id == PostId::MAX {
                return Err(StoreError::IdsExhausted);
            }
            counters
                .insert(NEXT_POST_ID, id + 1)
                .map_err(|e| redb_err("insert", e))?;

            let bytes = encode(&new.into_post(id))?;
            let mut posts = txn.open_table(POSTS).map_err(|e| redb_err("open_table", e))?;
            posts
                .insert(id, bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
            id
        };
        txn.commit().map_err(|e| redb_err("commit", e))?;
        Ok(id)
    }

    fn children(&self, parent: PostId, kind: PostKind) -> StoreResult<Vec<Post>> {
        Ok(self
            .all_posts()?
            .into_iter()
            .filter(|p| p.kind == kind && p.parent == Some(parent))
            .collect())
    }

    fn post_meta(&self, id: PostId, key: &str) -> StoreResult<Option<MetaValue>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn.open_table(POST_META).map_err(|e| redb_err("open_table", e))?;
        let value = table
            .get((id, key))
            .map_err(|e| redb_err("get", e))?
            .map(|guard| decode(guard.value()))
            .transpose()?;
        Ok(value)
    }

    fn set_post_meta(&self, id: PostId, key: &str, value: MetaValue) -> StoreResult<()> {
        let bytes = encode(&value)?;
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn.open_table(POST_META).map_err(|e| redb_err("open_table", e))?;
            table
                .insert((id, key), bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))
    }

    fn delete_post_meta(&self, id: PostId, key: &str) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn.open_table(POST_META).map_err(|e| redb_err("open_table", e))?;
            table.remove((id, key)).map_err(|e| redb_err("remove", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))
    }

    fn find_posts_by_meta(
        &self,
        kind: PostKind,
        key: &str,
        value: &str,
    ) -> StoreResult<Vec<Post>> {
        let ids = {
            let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
            let table = txn.open_table(POST_META).map_err(|e| redb_err("open_table", e))?;
            let mut ids = Vec::new();
            for row in table.iter().map_err(|e| redb_err("iter", e))? {
                let (k, v) = row.map_err(|e| redb_err("iter", e))?;
                let (post_id, meta_key) = k.value();
                if meta_key != key {
                    continue;
                }
                if decode::<MetaValue>(v.value())?.as_text() == Some(value) {
                    ids.push(post_id);
                }
            }
            ids
        };

        let mut posts = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(post) = self.post(id)?.filter(|p| p.kind == kind) {
                posts.push(post);
            }
        }
        Ok(posts)
    }

    fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn.open_table(USERS).map_err(|e| redb_err("open_table", e))?;
        let value = table
            .get(id)
            .map_err(|e| redb_err("get", e))?
            .map(|guard| decode(guard.value()))
            .transpose()?;
        Ok(value)
    }

    fn put_user(&self, user: User) -> StoreResult<()> {
        let bytes = encode(&user)?;
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn.open_table(USERS).map_err(|e| redb_err("open_table", e))?;
            table
                .insert(user.id, bytes.as_slice())
                .map_err(|e| redb_err("insert", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))
    }

    fn user_meta(&self, id: UserId, key: &str) -> StoreResult<Option<String>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn.open_table(USER_META).map_err(|e| redb_err("open_table", e))?;
        let value = table
            .get((id, key))
            .map_err(|e| redb_err("get", e))?
            .map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn set_user_meta(&self, id: UserId, key: &str, value: &str) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(|e| redb_err("begin_write", e))?;
        {
            let mut table = txn.open_table(USER_META).map_err(|e| redb_err("open_table", e))?;
            table.insert((id, key), value).map_err(|e| redb_err("insert", e))?;
        }
        txn.commit().map_err(|e| redb_err("commit", e))
    }

    fn find_users_by_meta(&self, key: &str, value: &str) -> StoreResult<Vec<UserId>> {
        let txn = self.db.begin_read().map_err(|e| redb_err("begin_read", e))?;
        let table = txn.open_table(USER_META).map_err(|e| redb_err("open_table", e))?;
        let mut ids = Vec::new();
        for row in table.iter().map_err(|e| redb_err("iter", e))? {
            let (k, v) = row.map_err(|e| redb_err("iter", e))?;
            let (user_id, meta_key) = k.value();
            if meta_key == key && v.value() == value {
                ids.push(user_id);
            }
        }
        Ok(ids)
    }
}

impl std::fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore").finish()
    }
}
