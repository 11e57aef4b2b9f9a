//! Content records mirrored from the host CMS.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

pub type PostId = u64;
pub type UserId = u64;

/// Record type. Entities live in the same record space as posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Post,
    Page,
    Entity,
    Attachment,
    Revision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Pending,
    Publish,
    Private,
    Inherit,
    Trash,
}

/// A post, page, entity or attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub kind: PostKind,
    pub status: PostStatus,
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub author: UserId,
    /// Publication time in the site's local offset.
    pub published: DateTime<FixedOffset>,
    pub modified: DateTime<FixedOffset>,
    #[serde(default)]
    pub comment_count: u64,
    /// Owning post, for attachments and revisions.
    #[serde(default)]
    pub parent: Option<PostId>,
    #[serde(default)]
    pub mime_type: Option<String>,
    /// File URL, for attachments.
    #[serde(default)]
    pub source_url: Option<String>,
    /// Featured image attachment.
    #[serde(default)]
    pub thumbnail: Option<PostId>,
    /// Terms of the `entity_type` taxonomy, e.g. `Person`.
    #[serde(default)]
    pub entity_types: Vec<String>,
}

impl Post {
    pub fn is_entity(&self) -> bool {
        self.kind == PostKind::Entity
    }

    pub fn is_image(&self) -> bool {
        self.kind == PostKind::Attachment
            && self
                .mime_type
                .as_deref()
                .is_some_and(|m| m.starts_with("image/"))
    }
}

/// A post to be created; the store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub kind: PostKind,
    pub status: PostStatus,
    pub title: String,
    pub content: String,
    pub author: UserId,
    pub entity_types: Vec<String>,
}

impl NewPost {
    pub fn into_post(self, id: PostId) -> Post {
        let now = Utc::now().fixed_offset();
        Post {
            id,
            kind: self.kind,
            status: self.status,
            title: self.title,
            content: self.content,
            author: self.author,
            published: now,
            modified: now,
            comment_count: 0,
            parent: None,
            mime_type: None,
            source_url: None,
            thumbnail: None,
            entity_types: self.entity_types,
        }
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub description: String,
}

/// A post meta value: free text, or a list of post ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetaValue {
    Text(String),
    Ids(Vec<PostId>),
}

impl MetaValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetaValue::Text(s) => Some(s),
            MetaValue::Ids(_) => None,
        }
    }

    pub fn into_ids(self) -> Option<Vec<PostId>> {
        match self {
            MetaValue::Ids(ids) => Some(ids),
            MetaValue::Text(_) => None,
        }
    }
}

/// Post meta keys written by the sync.
pub mod meta {
    /// Canonical URI of an entity.
    pub const ENTITY_URL: &str = "entity_url";
    /// Same-as alias of an entity.
    pub const ENTITY_SAME_AS: &str = "entity_same_as";
    /// Forward list: entities referenced by a post.
    pub const RELATED_ENTITIES: &str = "wordlift_related_entities";
    /// Reverse list: posts referencing an entity.
    pub const RELATED_POSTS: &str = "wordlift_related_posts";
    pub const CAL_DATE_START: &str = "wl_cal_date_start";
    pub const CAL_DATE_END: &str = "wl_cal_date_end";
    /// User meta: memoized user URI.
    pub const USER_URI: &str = "wl_uri";
}
