//! In-memory content store backed by DashMap.
//!
//! All data is lost on process exit. Used by tests and by embedders that
//! mirror host records on demand.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::error::StoreError;

use super::{ContentStore, MetaValue, NewPost, Post, PostId, PostKind, StoreResult, User, UserId};

/// Concurrent in-memory store using sharded hashmaps.
#[derive(Debug)]
pub struct MemStore {
    posts: DashMap<PostId, Post>,
    post_meta: DashMap<(PostId, String), MetaValue>,
    users: DashMap<UserId, User>,
    user_meta: DashMap<(UserId, String), String>,
    next_id: AtomicU64,
}

impl MemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            posts: DashMap::new(),
            post_meta: DashMap::new(),
            users: DashMap::new(),
            user_meta: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of posts of any kind.
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Snapshot of all posts of `kind`, ordered by id.
    pub fn posts_of_kind(&self, kind: PostKind) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.value().clone())
            .collect();
        posts.sort_by_key(|p| p.id);
        posts
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for MemStore {
    fn post(&self, id: PostId) -> StoreResult<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.value().clone()))
    }

    fn put_post(&self, post: Post) -> StoreResult<()> {
        self.next_id.fetch_max(post.id.saturating_add(1), Ordering::SeqCst);
        self.posts.insert(post.id, post);
        Ok(())
    }

    fn insert_post(&self, new: NewPost) -> StoreResult<PostId> {
        let id = self
            .next_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |next| {
                (next < PostId::MAX).then(|| next + 1)
            })
            .map_err(|_| StoreError::IdsExhausted)?;
        self.posts.insert(id, new.into_post(id));
        Ok(id)
    }

    fn children(&self, parent: PostId, kind: PostKind) -> StoreResult<Vec<Post>> {
        let mut children: Vec<Post> = self
            .posts
            .iter()
            .filter(|entry| entry.kind == kind && entry.parent == Some(parent))
            .map(|entry| entry.value().clone())
            .collect();
        children.sort_by_key(|p| p.id);
        Ok(children)
    }

    fn post_meta(&self, id: PostId, key: &str) -> StoreResult<Option<MetaValue>> {
        Ok(self
            .post_meta
            .get(&(id, key.to_string()))
            .map(|v| v.value().clone()))
    }

    fn set_post_meta(&self, id: PostId, key: &str, value: MetaValue) -> StoreResult<()> {
        self.post_meta.insert((id, key.to_string()), value);
        Ok(())
    }

    fn delete_post_meta(&self, id: PostId, key: &str) -> StoreResult<()> {
        self.post_meta.remove(&(id, key.to_string()));
        Ok(())
    }

    fn find_posts_by_meta(
        &self,
        kind: PostKind,
        key: &str,
        value: &str,
    ) -> StoreResult<Vec<Post>> {
        let mut ids: Vec<PostId> = self
            .post_meta
            .iter()
            .filter(|entry| entry.key().1 == key && entry.value().as_text() == Some(value))
            .map(|entry| entry.key().0)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.posts.get(&id).map(|p| p.value().clone()))
            .filter(|p| p.kind == kind)
            .collect())
    }

    fn user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    fn put_user(&self, user: User) -> StoreResult<()> {
        self.users.insert(user.id, user);
        Ok(())
    }

    fn user_meta(&self, id: UserId, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .user_meta
            .get(&(id, key.to_string()))
            .map(|v| v.value().clone()))
    }

    fn set_user_meta(&self, id: UserId, key: &str, value: &str) -> StoreResult<()> {
        self.user_meta.insert((id, key.to_string()), value.to_string());
        Ok(())
    }

    fn find_users_by_meta(&self, key: &str, value: &str) -> StoreResult<Vec<UserId>> {
        let mut ids: Vec<UserId> = self
            .user_meta
            .iter()
            .filter(|entry| entry.key().1 == key && entry.value() == value)
            .map(|entry| entry.key().0)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
