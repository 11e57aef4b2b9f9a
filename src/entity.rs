//! Entity resolution and upsert.
//!
//! An annotation submitted with a post names an entity by URI. Resolution
//! finds the local entity records already known under that URI (as
//! canonical URL or as same-as alias) or creates a new draft entity.

use serde::{Deserialize, Serialize};

use crate::error::EntityError;
use crate::store::{ContentStore, MetaValue, NewPost, Post, PostKind, PostStatus, UserId, meta};
use crate::uri::UriResolver;

/// An entity annotation as submitted by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Source URI, e.g. `http://dbpedia.org/resource/Berlin`.
    #[serde(rename = "id")]
    pub uri: String,
    pub label: String,
    /// Type URI, e.g. `http://schema.org/Place`.
    #[serde(rename = "type", default)]
    pub type_uri: String,
    #[serde(default)]
    pub description: String,
}

/// What [`EntityResolver::resolve`] found.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub entities: Vec<Post>,
    /// Whether `entities` is a single record created by this call.
    pub created: bool,
}

impl Resolution {
    fn empty() -> Self {
        Self {
            entities: Vec::new(),
            created: false,
        }
    }
}

/// Last path segment of a type URI, used as the `entity_type` term.
pub fn type_term(type_uri: &str) -> Option<&str> {
    type_uri.rsplit('/').next().filter(|t| !t.is_empty())
}

pub struct EntityResolver<'a> {
    store: &'a dyn ContentStore,
    uris: UriResolver<'a>,
}

impl<'a> EntityResolver<'a> {
    pub fn new(store: &'a dyn ContentStore, uris: UriResolver<'a>) -> Self {
        Self { store, uris }
    }

    /// Entities whose canonical URI or same-as alias equals `uri`, ordered
    /// by id, without duplicates.
    pub fn find_by_uri(&self, uri: &str) -> Result<Vec<Post>, EntityError> {
        let mut found = self
            .store
            .find_posts_by_meta(PostKind::Entity, meta::ENTITY_URL, uri)?;
        for alias in self
            .store
            .find_posts_by_meta(PostKind::Entity, meta::ENTITY_SAME_AS, uri)?
        {
            if !found.iter().any(|p| p.id == alias.id) {
                found.push(alias);
            }
        }
        found.sort_by_key(|p| p.id);
        Ok(found)
    }

    /// Find the entities for `descriptor`, creating one if none exist.
    ///
    /// Every match is returned; callers decide how to treat ambiguity.
    /// Creation failures are logged and yield an empty resolution.
    pub fn resolve(&self, descriptor: &EntityDescriptor, author: UserId) -> Resolution {
        match self.find_by_uri(&descriptor.uri) {
            Ok(found) if !found.is_empty() => {
                if found.len() > 1 {
                    tracing::warn!(
                        uri = %descriptor.uri,
                        count = found.len(),
                        "URI matches several entities"
                    );
                }
                return Resolution {
                    entities: found,
                    created: false,
                };
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(uri = %descriptor.uri, error = %e, "entity lookup failed");
                return Resolution::empty();
            }
        }

        match self.create(descriptor, author) {
            Ok(entity) => Resolution {
                entities: vec![entity],
                created: true,
            },
            Err(e) => {
                tracing::error!(
                    uri = %descriptor.uri,
                    label = %descriptor.label,
                    error = %e,
                    "entity creation failed"
                );
                Resolution::empty()
            }
        }
    }

    /// Create a draft entity for `descriptor` with a local URI.
    pub fn create(&self, descriptor: &EntityDescriptor, author: UserId) -> Result<Post, EntityError> {
        let local_uri = self.uris.local_entity_uri(&descriptor.uri)?;

        let entity_types = type_term(&descriptor.type_uri)
            .map(|t| vec![t.to_string()])
            .unwrap_or_default();
        let id = self.store.insert_post(NewPost {
            kind: PostKind::Entity,
            status: PostStatus::Draft,
            title: descriptor.label.clone(),
            content: descriptor.description.clone(),
            author,
            entity_types,
        })?;

        self.store
            .set_post_meta(id, meta::ENTITY_URL, MetaValue::Text(local_uri.clone()))?;
        if local_uri != descriptor.uri {
            self.store.set_post_meta(
                id,
                meta::ENTITY_SAME_AS,
                MetaValue::Text(descriptor.uri.clone()),
            )?;
        }
        tracing::info!(entity_id = id, %local_uri, same_as = %descriptor.uri, "entity created");

        Ok(self.store.require_post(id)?)
    }
}
