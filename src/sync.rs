//! Lifecycle sync: turn host CMS events into triple-store updates.
//!
//! [`SyncEngine::handle`] is the only entry point. It never returns an error
//! to the host; every outcome is a [`SyncReport`] and every failure is
//! logged. Local state is committed before the remote push, so a rejected
//! push leaves the two sides diverged until the next save.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};

use crate::client::SparqlEndpoint;
use crate::config::SyncConfig;
use crate::entity::{EntityDescriptor, EntityResolver};
use crate::error::{EntityError, UriError, WlResult};
use crate::relations::RelationshipIndex;
use crate::sparql::vocab::{
    DCT_RELATION, DCTERMS_REFERENCES, OWL_SAME_AS, RDF_TYPE, RDFS_LABEL, SCHEMA_AUTHOR,
    SCHEMA_DATE_MODIFIED, SCHEMA_DATE_PUBLISHED, SCHEMA_DESCRIPTION, SCHEMA_EMAIL,
    SCHEMA_FAMILY_NAME, SCHEMA_GIVEN_NAME, SCHEMA_IMAGE, SCHEMA_INTERACTION_COUNT, SCHEMA_NAME,
    SCHEMA_URL, schema_class,
};
use crate::sparql::{Object, ReplaceQuery, Triple, delete_resource};
use crate::store::{ContentStore, Post, PostId, PostKind, SiteLinks, UserId, meta};
use crate::uri::{UriResolver, author_uri, post_uri};

/// Predicates a post save owns on the post's URI.
const POST_PREDICATES: &[&str] = &[
    DCTERMS_REFERENCES,
    SCHEMA_URL,
    SCHEMA_DATE_PUBLISHED,
    SCHEMA_DATE_MODIFIED,
    RDF_TYPE,
    RDFS_LABEL,
    SCHEMA_IMAGE,
    SCHEMA_INTERACTION_COUNT,
    SCHEMA_AUTHOR,
];

const AUTHOR_PREDICATES: &[&str] = &[
    RDF_TYPE,
    SCHEMA_NAME,
    SCHEMA_GIVEN_NAME,
    SCHEMA_FAMILY_NAME,
    SCHEMA_EMAIL,
    SCHEMA_DESCRIPTION,
    SCHEMA_URL,
];

const ENTITY_PREDICATES: &[&str] = &[
    RDFS_LABEL,
    OWL_SAME_AS,
    SCHEMA_DESCRIPTION,
    SCHEMA_URL,
    RDF_TYPE,
];

const USER_PREDICATES: &[&str] = &[SCHEMA_GIVEN_NAME, SCHEMA_FAMILY_NAME, SCHEMA_URL];

/// A host CMS event that may change the remote graph.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    PostSaved {
        post_id: PostId,
        /// Entities the editor attached to the post.
        annotations: Vec<EntityDescriptor>,
        autosave: bool,
    },
    EntitySaved(PostId),
    UserRegistered(UserId),
    ProfileUpdated(UserId),
    UserDeleted(UserId),
}

/// Outcome of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// Nothing was sent.
    Skipped(String),
    /// The endpoint confirmed the update.
    Pushed,
    /// The endpoint refused the update or could not be reached.
    Rejected,
    /// A local step failed before anything could be sent.
    Failed(String),
}

impl SyncReport {
    pub fn is_pushed(&self) -> bool {
        matches!(self, SyncReport::Pushed)
    }

    /// The less successful of two outcomes, preferring `self` on ties.
    pub fn worse(self, other: SyncReport) -> SyncReport {
        if other.rank() > self.rank() { other } else { self }
    }

    fn rank(&self) -> u8 {
        match self {
            SyncReport::Skipped(_) => 0,
            SyncReport::Pushed => 1,
            SyncReport::Rejected => 2,
            SyncReport::Failed(_) => 3,
        }
    }
}

/// Dispatches lifecycle events against one store and one endpoint.
pub struct SyncEngine {
    config: SyncConfig,
    store: Arc<dyn ContentStore>,
    endpoint: Arc<dyn SparqlEndpoint>,
    links: SiteLinks,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn ContentStore>,
        endpoint: Arc<dyn SparqlEndpoint>,
    ) -> Self {
        let links = SiteLinks::new(&config.site_url);
        Self {
            config,
            store,
            endpoint,
            links,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &dyn ContentStore {
        self.store.as_ref()
    }

    pub fn links(&self) -> &SiteLinks {
        &self.links
    }

    /// Process one event.
    pub fn handle(&self, event: LifecycleEvent) -> SyncReport {
        let (name, result) = match &event {
            LifecycleEvent::PostSaved {
                post_id,
                annotations,
                autosave,
            } => ("post_saved", self.post_saved(*post_id, annotations, *autosave)),
            LifecycleEvent::EntitySaved(id) => ("entity_saved", self.entity_saved(*id)),
            LifecycleEvent::UserRegistered(id) => ("user_registered", self.user_saved(*id)),
            LifecycleEvent::ProfileUpdated(id) => ("profile_updated", self.user_saved(*id)),
            LifecycleEvent::UserDeleted(id) => ("user_deleted", self.user_deleted(*id)),
        };

        match result {
            Ok(report) => {
                tracing::info!(event = name, report = ?report, "sync finished");
                report
            }
            Err(e) => {
                tracing::error!(event = name, error = %e, "sync failed");
                SyncReport::Failed(e.to_string())
            }
        }
    }

    fn post_saved(
        &self,
        post_id: PostId,
        annotations: &[EntityDescriptor],
        autosave: bool,
    ) -> WlResult<SyncReport> {
        if autosave {
            tracing::debug!(post_id, "autosave, not syncing");
            return Ok(SyncReport::Skipped("autosave".into()));
        }
        let post = self.store.require_post(post_id)?;
        if post.kind == PostKind::Revision {
            tracing::debug!(post_id, "revision, not syncing");
            return Ok(SyncReport::Skipped("revision".into()));
        }

        match self.author_saved(post.author) {
            Ok(SyncReport::Pushed) => {}
            Ok(report) => tracing::warn!(author = post.author, ?report, "author not synced"),
            Err(e) => tracing::warn!(author = post.author, error = %e, "author sync failed"),
        }

        let entity_ids = self.resolve_annotations(&post, annotations);
        RelationshipIndex::new(self.store()).replace(post.id, &entity_ids)?;

        let report = self.push_post(&post, &entity_ids)?;
        if !post.is_entity() {
            return Ok(report);
        }
        let entity_report = self.entity_saved(post.id)?;
        Ok(report.worse(entity_report))
    }

    /// Resolve every annotation to local entities, pushing the ones created
    /// along the way. Returns the resolved ids without duplicates.
    fn resolve_annotations(&self, post: &Post, annotations: &[EntityDescriptor]) -> Vec<PostId> {
        let uris = UriResolver::new(&self.config, self.store());
        let resolver = EntityResolver::new(self.store(), uris);

        let mut ids: Vec<PostId> = Vec::new();
        for descriptor in annotations {
            let resolution = resolver.resolve(descriptor, post.author);
            if resolution.entities.is_empty() {
                tracing::warn!(post_id = post.id, uri = %descriptor.uri, "annotation dropped");
            }
            for entity in resolution.entities {
                if resolution.created {
                    let report = self.handle(LifecycleEvent::EntitySaved(entity.id));
                    tracing::debug!(entity_id = entity.id, ?report, "new entity pushed");
                }
                if !ids.contains(&entity.id) {
                    ids.push(entity.id);
                }
            }
        }
        ids
    }

    fn push_post(&self, post: &Post, entity_ids: &[PostId]) -> WlResult<SyncReport> {
        let uri = post_uri(&self.config, post.id);
        let mut query = ReplaceQuery::new(&uri).clear_all(POST_PREDICATES);

        query
            .assert(RDFS_LABEL, Object::literal(&post.title))
            .assert(RDF_TYPE, Object::uri(schema_class("BlogPosting")))
            .assert(SCHEMA_URL, Object::uri(self.links.permalink(post.id)))
            .assert(
                SCHEMA_DATE_PUBLISHED,
                Object::literal(post.published.to_rfc3339_opts(SecondsFormat::Secs, false)),
            )
            .assert(
                SCHEMA_DATE_MODIFIED,
                Object::literal(
                    post.modified
                        .with_timezone(&Utc)
                        .to_rfc3339_opts(SecondsFormat::Secs, false),
                ),
            )
            .assert(SCHEMA_AUTHOR, Object::uri(author_uri(&self.config, post.author)))
            .assert(
                SCHEMA_INTERACTION_COUNT,
                Object::literal(format!("UserComments:{}", post.comment_count)),
            );

        for image in self.store.children(post.id, PostKind::Attachment)? {
            if !image.is_image() {
                continue;
            }
            if let Some(src) = image.source_url.filter(|s| !s.is_empty()) {
                query.assert(SCHEMA_IMAGE, Object::uri(src));
            }
        }

        for entity_id in entity_ids {
            match self.store.meta_text(*entity_id, meta::ENTITY_URL)? {
                Some(entity_uri) => {
                    query.assert(DCTERMS_REFERENCES, Object::uri(entity_uri));
                }
                None => tracing::warn!(post_id = post.id, entity_id, "referenced entity has no URI"),
            }
        }

        Ok(self.push(&uri, &query.to_sparql()))
    }

    fn author_saved(&self, author_id: UserId) -> WlResult<SyncReport> {
        let Some(user) = self.store.user(author_id)? else {
            return Ok(SyncReport::Skipped(format!("author {author_id} not found")));
        };

        let uri = author_uri(&self.config, author_id);
        let mut query = ReplaceQuery::new(&uri).clear_all(AUTHOR_PREDICATES);
        query.assert(RDF_TYPE, Object::uri(schema_class("Person")));
        let fields = [
            (SCHEMA_NAME, &user.display_name),
            (SCHEMA_GIVEN_NAME, &user.first_name),
            (SCHEMA_FAMILY_NAME, &user.last_name),
            (SCHEMA_EMAIL, &user.email),
            (SCHEMA_DESCRIPTION, &user.description),
        ];
        for (predicate, value) in fields {
            if !value.is_empty() {
                query.assert(predicate, Object::literal(value.as_str()));
            }
        }
        query.assert(SCHEMA_URL, Object::uri(self.links.author_posts_url(author_id)));

        Ok(self.push(&uri, &query.to_sparql()))
    }

    fn entity_saved(&self, entity_id: PostId) -> WlResult<SyncReport> {
        let entity = self.store.require_post(entity_id)?;
        if !entity.is_entity() {
            return Err(EntityError::NotAnEntity { post_id: entity_id }.into());
        }
        let Some(uri) = self.store.meta_text(entity_id, meta::ENTITY_URL)? else {
            let missing = EntityError::MissingUri { entity_id };
            tracing::warn!(error = %missing, "entity not synced");
            return Ok(SyncReport::Skipped(missing.to_string()));
        };

        let mut query = ReplaceQuery::new(&uri).clear_all(ENTITY_PREDICATES);
        if let Some(same_as) = self.store.meta_text(entity_id, meta::ENTITY_SAME_AS)? {
            for alias in same_as.split("\r\n").map(str::trim).filter(|a| !a.is_empty()) {
                query.assert(OWL_SAME_AS, Object::uri(alias));
            }
        }
        query
            .assert(RDFS_LABEL, Object::literal(&entity.title))
            .assert(SCHEMA_URL, Object::uri(self.links.permalink(entity_id)));
        if !entity.content.is_empty() {
            query.assert(SCHEMA_DESCRIPTION, Object::literal(&entity.content));
        }
        for term in &entity.entity_types {
            query.assert(RDF_TYPE, Object::uri(schema_class(term)));
        }

        for related_id in RelationshipIndex::new(self.store()).related_entities(entity_id)? {
            let Some(related_uri) = self.store.meta_text(related_id, meta::ENTITY_URL)? else {
                tracing::warn!(entity_id, related_id, "related entity has no URI");
                continue;
            };
            query
                .insert(Triple::new(&uri, DCT_RELATION, Object::uri(&related_uri)))
                .insert(Triple::new(related_uri, DCT_RELATION, Object::uri(&uri)));
        }

        Ok(self.push(&uri, &query.to_sparql()))
    }

    fn user_saved(&self, user_id: UserId) -> WlResult<SyncReport> {
        let user = self
            .store
            .user(user_id)?
            .ok_or(UriError::UserNotFound { user_id })?;
        let uri = UriResolver::new(&self.config, self.store()).user_uri(user_id)?;
        let lang = &self.config.site_language;

        let mut query = ReplaceQuery::new(&uri).clear_all(USER_PREDICATES);
        if !user.first_name.is_empty() {
            query.assert(SCHEMA_GIVEN_NAME, Object::lang(&user.first_name, lang));
        }
        if !user.last_name.is_empty() {
            query.assert(SCHEMA_FAMILY_NAME, Object::lang(&user.last_name, lang));
        }
        query.assert(SCHEMA_URL, Object::uri(self.links.author_posts_url(user_id)));

        Ok(self.push(&uri, &query.to_sparql()))
    }

    fn user_deleted(&self, user_id: UserId) -> WlResult<SyncReport> {
        let uri = self
            .store
            .user_meta(user_id, meta::USER_URI)?
            .filter(|u| !u.is_empty());
        let Some(uri) = uri else {
            tracing::debug!(user_id, "deleted user never had a URI");
            return Ok(SyncReport::Skipped(format!("user {user_id} has no URI")));
        };
        Ok(self.push(&uri, &delete_resource(&uri)))
    }

    fn push(&self, subject: &str, query: &str) -> SyncReport {
        if self.endpoint.update(query) {
            tracing::debug!(%subject, "triples pushed");
            SyncReport::Pushed
        } else {
            tracing::warn!(%subject, "triple-store did not accept update");
            SyncReport::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    use chrono::DateTime;

    use crate::client::{DryRunEndpoint, LocalEndpoint};
    use crate::store::{MemStore, MetaValue, NewPost, PostStatus, User};

    const BASE: &str = "http://data.redlink.io/acme/blog";

    struct Fixture {
        store: Arc<MemStore>,
        endpoint: Arc<LocalEndpoint>,
        engine: SyncEngine,
    }

    fn fixture() -> Fixture {
        let config = SyncConfig {
            site_url: "https://blog.example.org".into(),
            ..SyncConfig::new("acme", "blog")
        };
        let store = Arc::new(MemStore::new());
        let endpoint = Arc::new(LocalEndpoint::in_memory().unwrap());
        let engine = SyncEngine::new(config, store.clone(), endpoint.clone());
        Fixture {
            store,
            endpoint,
            engine,
        }
    }

    fn ada() -> User {
        User {
            id: 1,
            login: "ada".into(),
            display_name: "Ada Lovelace".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.org".into(),
            description: String::new(),
        }
    }

    fn post(store: &MemStore, id: PostId, kind: PostKind, title: &str) -> Post {
        let mut post = NewPost {
            kind,
            status: PostStatus::Publish,
            title: title.into(),
            content: String::new(),
            author: 1,
            entity_types: vec![],
        }
        .into_post(id);
        post.published = DateTime::parse_from_rfc3339("2024-05-01T10:00:00+02:00").unwrap();
        post.modified = DateTime::parse_from_rfc3339("2024-05-02T10:30:00+02:00").unwrap();
        post.comment_count = 3;
        store.put_post(post.clone()).unwrap();
        post
    }

    fn berlin() -> EntityDescriptor {
        EntityDescriptor {
            uri: "http://dbpedia.org/resource/Berlin".into(),
            label: "Berlin".into(),
            type_uri: "http://schema.org/Place".into(),
            description: "Capital of Germany".into(),
        }
    }

    fn save(engine: &SyncEngine, post_id: PostId, annotations: Vec<EntityDescriptor>) -> SyncReport {
        engine.handle(LifecycleEvent::PostSaved {
            post_id,
            annotations,
            autosave: false,
        })
    }

    fn lit(s: &str) -> Object {
        Object::literal(s)
    }

    #[test]
    fn post_save_pushes_post_author_and_entity() {
        let f = fixture();
        f.store.put_user(ada()).unwrap();
        post(&f.store, 10, PostKind::Post, "Visiting Berlin");

        assert_eq!(save(&f.engine, 10, vec![berlin()]), SyncReport::Pushed);

        let post_uri = format!("{BASE}/post/10");
        let entity_uri = format!("{BASE}/resource/Berlin");
        let objects = |s: &str, p: &str| f.endpoint.objects(s, p).unwrap();

        assert_eq!(objects(&post_uri, RDFS_LABEL), vec![lit("Visiting Berlin")]);
        assert_eq!(
            objects(&post_uri, RDF_TYPE),
            vec![Object::uri("http://schema.org/BlogPosting")]
        );
        assert_eq!(
            objects(&post_uri, SCHEMA_URL),
            vec![Object::uri("https://blog.example.org/?p=10")]
        );
        assert_eq!(
            objects(&post_uri, SCHEMA_DATE_PUBLISHED),
            vec![lit("2024-05-01T10:00:00+02:00")]
        );
        assert_eq!(
            objects(&post_uri, SCHEMA_DATE_MODIFIED),
            vec![lit("2024-05-02T08:30:00+00:00")]
        );
        assert_eq!(
            objects(&post_uri, SCHEMA_INTERACTION_COUNT),
            vec![lit("UserComments:3")]
        );
        assert_eq!(
            objects(&post_uri, SCHEMA_AUTHOR),
            vec![Object::uri(format!("{BASE}/author/1"))]
        );
        assert_eq!(
            objects(&post_uri, DCTERMS_REFERENCES),
            vec![Object::uri(&entity_uri)]
        );

        let author = format!("{BASE}/author/1");
        assert_eq!(objects(&author, SCHEMA_NAME), vec![lit("Ada Lovelace")]);
        assert!(objects(&author, SCHEMA_DESCRIPTION).is_empty());
        assert_eq!(
            objects(&author, SCHEMA_URL),
            vec![Object::uri("https://blog.example.org/?author=1")]
        );

        assert_eq!(objects(&entity_uri, RDFS_LABEL), vec![lit("Berlin")]);
        assert_eq!(
            objects(&entity_uri, OWL_SAME_AS),
            vec![Object::uri("http://dbpedia.org/resource/Berlin")]
        );
        assert_eq!(
            objects(&entity_uri, RDF_TYPE),
            vec![Object::uri("http://schema.org/Place")]
        );
    }

    #[test]
    fn resave_replaces_owned_predicates() {
        let f = fixture();
        f.store.put_user(ada()).unwrap();
        let mut p = post(&f.store, 10, PostKind::Post, "First title");
        save(&f.engine, 10, vec![berlin()]);

        p.title = "Second title".into();
        f.store.put_post(p).unwrap();
        assert_eq!(save(&f.engine, 10, vec![]), SyncReport::Pushed);

        let post_uri = format!("{BASE}/post/10");
        assert_eq!(
            f.endpoint.objects(&post_uri, RDFS_LABEL).unwrap(),
            vec![lit("Second title")]
        );
        assert!(f
            .endpoint
            .objects(&post_uri, DCTERMS_REFERENCES)
            .unwrap()
            .is_empty());
        let entity = f
            .store
            .find_posts_by_meta(PostKind::Entity, meta::ENTITY_URL, &format!("{BASE}/resource/Berlin"))
            .unwrap()[0]
            .id;
        assert!(RelationshipIndex::new(&*f.store)
            .related_posts(entity)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn image_attachments_become_schema_images() {
        let f = fixture();
        post(&f.store, 10, PostKind::Post, "Gallery");
        for (id, mime, src) in [
            (11, "image/jpeg", "https://blog.example.org/a.jpg"),
            (12, "application/pdf", "https://blog.example.org/b.pdf"),
        ] {
            let mut attachment = post(&f.store, id, PostKind::Attachment, "file");
            attachment.parent = Some(10);
            attachment.mime_type = Some(mime.into());
            attachment.source_url = Some(src.into());
            f.store.put_post(attachment).unwrap();
        }

        save(&f.engine, 10, vec![]);
        assert_eq!(
            f.endpoint
                .objects(&format!("{BASE}/post/10"), SCHEMA_IMAGE)
                .unwrap(),
            vec![Object::uri("https://blog.example.org/a.jpg")]
        );
    }

    #[test]
    fn autosaves_and_revisions_are_skipped() {
        let f = fixture();
        post(&f.store, 10, PostKind::Post, "Draft");
        post(&f.store, 11, PostKind::Revision, "Draft (rev)");

        let autosave = f.engine.handle(LifecycleEvent::PostSaved {
            post_id: 10,
            annotations: vec![berlin()],
            autosave: true,
        });
        assert_eq!(autosave, SyncReport::Skipped("autosave".into()));
        assert_eq!(save(&f.engine, 11, vec![]), SyncReport::Skipped("revision".into()));
        assert!(f.endpoint.is_empty().unwrap());
        assert!(f.store.posts_of_kind(PostKind::Entity).is_empty());
    }

    #[test]
    fn missing_post_fails_without_panicking() {
        let f = fixture();
        assert!(matches!(save(&f.engine, 99, vec![]), SyncReport::Failed(_)));
    }

    #[test]
    fn entity_relations_are_written_both_ways() {
        let f = fixture();
        let mut rome = post(&f.store, 20, PostKind::Entity, "Rome");
        rome.content = "Capital of Italy".into();
        rome.entity_types = vec!["Place".into()];
        f.store.put_post(rome).unwrap();
        f.store
            .set_post_meta(20, meta::ENTITY_URL, MetaValue::Text(format!("{BASE}/resource/Rome")))
            .unwrap();
        f.store
            .set_post_meta(
                20,
                meta::ENTITY_SAME_AS,
                MetaValue::Text("http://dbpedia.org/resource/Rome\r\n\r\nhttp://www.wikidata.org/entity/Q220".into()),
            )
            .unwrap();
        post(&f.store, 21, PostKind::Entity, "Italy");
        f.store
            .set_post_meta(21, meta::ENTITY_URL, MetaValue::Text(format!("{BASE}/resource/Italy")))
            .unwrap();
        RelationshipIndex::new(&*f.store).replace(20, &[21]).unwrap();

        assert_eq!(f.engine.handle(LifecycleEvent::EntitySaved(20)), SyncReport::Pushed);

        let rome_uri = format!("{BASE}/resource/Rome");
        let italy_uri = format!("{BASE}/resource/Italy");
        assert_eq!(f.endpoint.objects(&rome_uri, OWL_SAME_AS).unwrap().len(), 2);
        assert_eq!(
            f.endpoint.objects(&rome_uri, SCHEMA_DESCRIPTION).unwrap(),
            vec![lit("Capital of Italy")]
        );
        assert_eq!(
            f.endpoint.objects(&rome_uri, DCT_RELATION).unwrap(),
            vec![Object::uri(&italy_uri)]
        );
        assert_eq!(
            f.endpoint.objects(&italy_uri, DCT_RELATION).unwrap(),
            vec![Object::uri(&rome_uri)]
        );
    }

    #[test]
    fn entity_without_uri_is_skipped() {
        let f = fixture();
        post(&f.store, 20, PostKind::Entity, "Nameless");
        let report = f.engine.handle(LifecycleEvent::EntitySaved(20));
        assert!(matches!(report, SyncReport::Skipped(reason) if reason.contains("entity_url")));
        assert!(f.endpoint.is_empty().unwrap());
    }

    #[test]
    fn saving_an_entity_as_a_post_also_pushes_entity_triples() {
        let f = fixture();
        post(&f.store, 20, PostKind::Entity, "Vienna");
        f.store
            .set_post_meta(20, meta::ENTITY_URL, MetaValue::Text(format!("{BASE}/resource/Vienna")))
            .unwrap();

        assert_eq!(save(&f.engine, 20, vec![]), SyncReport::Pushed);
        assert_eq!(
            f.endpoint
                .objects(&format!("{BASE}/resource/Vienna"), RDFS_LABEL)
                .unwrap(),
            vec![lit("Vienna")]
        );
    }

    #[test]
    fn user_profile_uses_site_language() {
        let f = fixture();
        f.store.put_user(ada()).unwrap();
        assert_eq!(f.engine.handle(LifecycleEvent::UserRegistered(1)), SyncReport::Pushed);

        let uri = format!("{BASE}/user/Ada_Lovelace");
        assert_eq!(
            f.endpoint.objects(&uri, SCHEMA_GIVEN_NAME).unwrap(),
            vec![Object::lang("Ada", "en")]
        );

        let mut renamed = ada();
        renamed.last_name = "King".into();
        f.store.put_user(renamed).unwrap();
        assert_eq!(f.engine.handle(LifecycleEvent::ProfileUpdated(1)), SyncReport::Pushed);
        assert_eq!(
            f.endpoint.objects(&uri, SCHEMA_FAMILY_NAME).unwrap(),
            vec![Object::lang("King", "en")]
        );
    }

    #[test]
    fn deleted_user_disappears_from_graph() {
        let f = fixture();
        f.store.put_user(ada()).unwrap();
        f.engine.handle(LifecycleEvent::UserRegistered(1));
        let uri = format!("{BASE}/user/Ada_Lovelace");
        assert!(f.endpoint.mentions(&uri).unwrap() > 0);

        assert_eq!(f.engine.handle(LifecycleEvent::UserDeleted(1)), SyncReport::Pushed);
        assert_eq!(f.endpoint.mentions(&uri).unwrap(), 0);
        assert!(matches!(
            f.engine.handle(LifecycleEvent::UserDeleted(2)),
            SyncReport::Skipped(_)
        ));
    }

    struct Refusing;

    impl SparqlEndpoint for Refusing {
        fn update(&self, _query: &str) -> bool {
            false
        }
    }

    #[test]
    fn refused_push_keeps_local_state() {
        let store = Arc::new(MemStore::new());
        let engine = SyncEngine::new(SyncConfig::new("acme", "blog"), store.clone(), Arc::new(Refusing));
        post(&store, 10, PostKind::Post, "Offline");

        assert_eq!(save(&engine, 10, vec![berlin()]), SyncReport::Rejected);
        let entities = store.posts_of_kind(PostKind::Entity);
        assert_eq!(entities.len(), 1);
        assert_eq!(
            RelationshipIndex::new(&*store).related_entities(10).unwrap(),
            vec![entities[0].id]
        );
    }

    /// Refuses post queries and forwards everything else to oxigraph.
    struct RefusesPosts(LocalEndpoint);

    impl SparqlEndpoint for RefusesPosts {
        fn update(&self, query: &str) -> bool {
            !query.contains("http://schema.org/BlogPosting") && self.0.update(query)
        }
    }

    #[test]
    fn entity_triples_are_pushed_when_post_push_is_refused() {
        let store = Arc::new(MemStore::new());
        let endpoint = Arc::new(RefusesPosts(LocalEndpoint::in_memory().unwrap()));
        let engine = SyncEngine::new(SyncConfig::new("acme", "blog"), store.clone(), endpoint.clone());
        post(&store, 20, PostKind::Entity, "Vienna");
        store
            .set_post_meta(20, meta::ENTITY_URL, MetaValue::Text(format!("{BASE}/resource/Vienna")))
            .unwrap();

        assert_eq!(save(&engine, 20, vec![]), SyncReport::Rejected);
        assert_eq!(
            endpoint
                .0
                .objects(&format!("{BASE}/resource/Vienna"), RDFS_LABEL)
                .unwrap(),
            vec![lit("Vienna")]
        );
        assert_eq!(endpoint.0.mentions(&format!("{BASE}/post/20")).unwrap(), 0);
    }

    #[test]
    fn worse_report_wins() {
        assert_eq!(SyncReport::Pushed.worse(SyncReport::Rejected), SyncReport::Rejected);
        assert_eq!(SyncReport::Rejected.worse(SyncReport::Pushed), SyncReport::Rejected);
        assert_eq!(
            SyncReport::Pushed.worse(SyncReport::Skipped("no uri".into())),
            SyncReport::Pushed
        );
        assert!(matches!(
            SyncReport::Rejected.worse(SyncReport::Failed("io".into())),
            SyncReport::Failed(_)
        ));
    }

    #[test]
    fn dry_run_records_post_query() {
        let store = Arc::new(MemStore::new());
        let endpoint = Arc::new(DryRunEndpoint::new());
        let engine = SyncEngine::new(SyncConfig::new("acme", "blog"), store.clone(), endpoint.clone());
        post(&store, 10, PostKind::Post, "It's here");

        assert!(save(&engine, 10, vec![]).is_pushed());
        let queries = endpoint.accepted();
        let last = queries.last().unwrap();
        assert!(last.contains("DELETE { <http://data.redlink.io/acme/blog/post/10> schema:author ?o . }"));
        assert!(last.contains("'It\\'s here'"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rejected_push_is_logged() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let store = Arc::new(MemStore::new());
        let engine = SyncEngine::new(SyncConfig::new("acme", "blog"), store.clone(), Arc::new(Refusing));
        post(&store, 10, PostKind::Post, "Offline");

        tracing::subscriber::with_default(subscriber, || {
            save(&engine, 10, vec![]);
        });

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("triple-store did not accept update"));
        assert!(logs.contains("http://data.redlink.io/acme/blog/post/10"));
    }
}
