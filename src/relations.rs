//! Post ↔ entity relationship index.
//!
//! Stored redundantly in post meta: the forward list
//! (`wordlift_related_entities`) on the referencing post and the reverse
//! list (`wordlift_related_posts`) on each referenced entity. Every save
//! recomputes the post's side wholesale.
//!
//! There is no lock around the read-modify-write of reverse lists; two
//! posts saved concurrently can lose each other's entry on a shared entity.

use crate::error::StoreError;
use crate::store::{ContentStore, MetaValue, PostId, meta};

pub struct RelationshipIndex<'a> {
    store: &'a dyn ContentStore,
}

impl<'a> RelationshipIndex<'a> {
    pub fn new(store: &'a dyn ContentStore) -> Self {
        Self { store }
    }

    /// Entities referenced by `post_id`.
    pub fn related_entities(&self, post_id: PostId) -> Result<Vec<PostId>, StoreError> {
        self.store.meta_ids(post_id, meta::RELATED_ENTITIES)
    }

    /// Posts referencing `entity_id`.
    pub fn related_posts(&self, entity_id: PostId) -> Result<Vec<PostId>, StoreError> {
        self.store.meta_ids(entity_id, meta::RELATED_POSTS)
    }

    /// Make `entities` the complete reference set of `post_id`.
    ///
    /// Detaches the post from every previously referenced entity, stores
    /// the new forward list, then attaches the post to each entity in it.
    /// A failure part-way leaves the index partially updated.
    pub fn replace(&self, post_id: PostId, entities: &[PostId]) -> Result<(), StoreError> {
        let mut new_set: Vec<PostId> = Vec::with_capacity(entities.len());
        for id in entities {
            if !new_set.contains(id) {
                new_set.push(*id);
            }
        }

        let previous = self.related_entities(post_id)?;
        for entity_id in &previous {
            let mut posts = self.related_posts(*entity_id)?;
            posts.retain(|p| *p != post_id);
            self.store
                .set_post_meta(*entity_id, meta::RELATED_POSTS, MetaValue::Ids(posts))?;
        }

        self.store
            .set_post_meta(post_id, meta::RELATED_ENTITIES, MetaValue::Ids(new_set.clone()))?;

        for entity_id in &new_set {
            let mut posts = self.related_posts(*entity_id)?;
            if !posts.contains(&post_id) {
                posts.push(post_id);
            }
            self.store
                .set_post_meta(*entity_id, meta::RELATED_POSTS, MetaValue::Ids(posts))?;
        }

        tracing::debug!(
            post_id,
            previous = previous.len(),
            current = new_set.len(),
            "relationship index updated"
        );
        Ok(())
    }
}
