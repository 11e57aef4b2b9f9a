//! Local content storage: the host CMS surface the sync reads and writes.
//!
//! [`ContentStore`] is the seam to the host. Two implementations ship:
//!
//! - [`MemStore`] — concurrent hashmaps (DashMap), for tests and one-shot runs
//! - [`DurableStore`] — ACID tables in redb, for the CLI
//!
//! Neither gives multi-key transactions: the relationship index does
//! read-modify-write across records, and concurrent writers can race.

pub mod durable;
pub mod mem;
pub mod model;

pub use durable::DurableStore;
pub use mem::MemStore;
pub use model::{MetaValue, NewPost, Post, PostId, PostKind, PostStatus, User, UserId, meta};

use crate::error::StoreError;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Post, user and meta storage.
pub trait ContentStore: Send + Sync {
    fn post(&self, id: PostId) -> StoreResult<Option<Post>>;

    /// Insert or replace a post under its own id.
    fn put_post(&self, post: Post) -> StoreResult<()>;

    /// Create a post, allocating a fresh id.
    fn insert_post(&self, new: NewPost) -> StoreResult<PostId>;

    /// Posts of `kind` whose parent is `parent`, ordered by id.
    fn children(&self, parent: PostId, kind: PostKind) -> StoreResult<Vec<Post>>;

    fn post_meta(&self, id: PostId, key: &str) -> StoreResult<Option<MetaValue>>;

    fn set_post_meta(&self, id: PostId, key: &str, value: MetaValue) -> StoreResult<()>;

    fn delete_post_meta(&self, id: PostId, key: &str) -> StoreResult<()>;

    /// Posts of `kind` having text meta `key` equal to `value`, ordered by id.
    fn find_posts_by_meta(&self, kind: PostKind, key: &str, value: &str)
    -> StoreResult<Vec<Post>>;

    fn user(&self, id: UserId) -> StoreResult<Option<User>>;

    fn put_user(&self, user: User) -> StoreResult<()>;

    fn user_meta(&self, id: UserId, key: &str) -> StoreResult<Option<String>>;

    fn set_user_meta(&self, id: UserId, key: &str, value: &str) -> StoreResult<()>;

    /// Users having meta `key` equal to `value`, ordered by id.
    fn find_users_by_meta(&self, key: &str, value: &str) -> StoreResult<Vec<UserId>>;

    /// Like [`post`](Self::post) but a missing record is an error.
    fn require_post(&self, id: PostId) -> StoreResult<Post> {
        self.post(id)?
            .ok_or(StoreError::NotFound { kind: "post", id })
    }

    /// Text meta, or `None` when unset, empty, or holding an id list.
    fn meta_text(&self, id: PostId, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .post_meta(id, key)?
            .and_then(|v| v.as_text().map(str::to_string))
            .filter(|s| !s.is_empty()))
    }

    /// Id-list meta; unset or non-list values read as empty.
    fn meta_ids(&self, id: PostId, key: &str) -> StoreResult<Vec<PostId>> {
        Ok(self
            .post_meta(id, key)?
            .and_then(MetaValue::into_ids)
            .unwrap_or_default())
    }
}

/// Permalinks in the host's plain (query-string) format.
#[derive(Debug, Clone)]
pub struct SiteLinks {
    site_url: String,
}

impl SiteLinks {
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Public URL of a post or entity.
    pub fn permalink(&self, id: PostId) -> String {
        format!("{}/?p={id}", self.site_url)
    }

    /// Archive of a user's posts.
    pub fn author_posts_url(&self, id: UserId) -> String {
        format!("{}/?author={id}", self.site_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn site_links_strip_trailing_slash() {
        let links = SiteLinks::new("https://blog.example.org/");
        assert_eq!(links.permalink(12), "https://blog.example.org/?p=12");
        assert_eq!(links.author_posts_url(3), "https://blog.example.org/?author=3");
    }

    #[test]
    fn meta_helpers_normalize_missing_values() {
        let store = MemStore::new();
        assert_eq!(store.meta_text(1, meta::ENTITY_URL).unwrap(), None);
        assert!(store.meta_ids(1, meta::RELATED_POSTS).unwrap().is_empty());

        store
            .set_post_meta(1, meta::ENTITY_URL, MetaValue::Text(String::new()))
            .unwrap();
        assert_eq!(store.meta_text(1, meta::ENTITY_URL).unwrap(), None);

        store
            .set_post_meta(1, meta::RELATED_POSTS, MetaValue::Text("oops".into()))
            .unwrap();
        assert!(store.meta_ids(1, meta::RELATED_POSTS).unwrap().is_empty());
    }

    #[test]
    fn require_post_reports_not_found() {
        let store = MemStore::new();
        assert!(matches!(
            store.require_post(9),
            Err(StoreError::NotFound { kind: "post", id: 9 })
        ));
    }
}
