//! URI minting for posts, authors, entities and users.
//!
//! All URIs live under the dataset base `{data_uri}/{user_id}/{dataset_id}`.
//! Post and author URIs are pure functions of their id. Entity and user URIs
//! depend on what is already stored, so they go through [`UriResolver`].

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::config::SyncConfig;
use crate::error::{EntityError, UriError, WlResult};
use crate::store::{ContentStore, PostId, PostKind, UserId, meta};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// `{base}/post/{id}`.
pub fn post_uri(config: &SyncConfig, post_id: PostId) -> String {
    format!("{}/post/{post_id}", config.dataset_base_uri())
}

/// `{base}/author/{id}`.
pub fn author_uri(config: &SyncConfig, author_id: UserId) -> String {
    format!("{}/author/{author_id}", config.dataset_base_uri())
}

/// `{base}/resource/{last segment of source_uri}`.
///
/// Only the last `/`-separated segment survives, so distinct sources can
/// map to the same local URI; [`UriResolver::local_entity_uri`] checks for that.
pub fn entity_uri(config: &SyncConfig, source_uri: &str) -> Result<String, UriError> {
    let segment = source_uri.rsplit('/').next().unwrap_or_default();
    if segment.is_empty() {
        return Err(UriError::InvalidSourceUri {
            uri: source_uri.to_string(),
        });
    }
    Ok(format!("{}/resource/{segment}", config.dataset_base_uri()))
}

/// Turn a person's name into a URI path segment.
///
/// Accents are folded (`Émile` → `Emile`), whitespace runs become `_`, and
/// anything outside `[A-Za-z0-9_.~-]` is dropped. Case is kept.
pub fn sanitize_uri_path(name: &str) -> String {
    let folded: String = name
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    WHITESPACE
        .replace_all(&folded, "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '~' | '-'))
        .collect()
}

/// URI lookups that consult the content store.
pub struct UriResolver<'a> {
    config: &'a SyncConfig,
    store: &'a dyn ContentStore,
}

impl<'a> UriResolver<'a> {
    pub fn new(config: &'a SyncConfig, store: &'a dyn ContentStore) -> Self {
        Self { config, store }
    }

    /// The user's URI, minted and stored on first use.
    pub fn user_uri(&self, user_id: UserId) -> WlResult<String> {
        if let Some(uri) = self
            .store
            .user_meta(user_id, meta::USER_URI)?
            .filter(|u| !u.is_empty())
        {
            tracing::debug!(user_id, %uri, "user URI found");
            return Ok(uri);
        }

        let uri = self.build_user_uri(user_id)?;
        self.store.set_user_meta(user_id, meta::USER_URI, &uri)?;
        tracing::info!(user_id, %uri, "user URI assigned");
        Ok(uri)
    }

    /// Mint a fresh, unused user URI from the user's name.
    ///
    /// Probes `name`, `name_1`, `name_2`, ... up to `max_uri_attempts`
    /// candidates, then falls back to a random hex suffix.
    pub fn build_user_uri(&self, user_id: UserId) -> WlResult<String> {
        let user = self
            .store
            .user(user_id)?
            .ok_or(UriError::UserNotFound { user_id })?;

        let full_name = format!("{} {}", user.first_name, user.last_name);
        let segment = match sanitize_uri_path(&full_name) {
            s if s.trim_matches('_').is_empty() => user_id.to_string(),
            s => s,
        };
        let base = format!("{}/user/{segment}", self.config.dataset_base_uri());

        // The base name is always probed, even with `max_uri_attempts` at 0.
        let attempts = self.config.max_uri_attempts.max(1);
        let mut candidate = base.clone();
        for attempt in 1..=attempts {
            if self
                .store
                .find_users_by_meta(meta::USER_URI, &candidate)?
                .is_empty()
            {
                return Ok(candidate);
            }
            candidate = format!("{base}_{attempt}");
        }

        let fallback = format!("{base}_{:016x}", rand::random::<u64>());
        tracing::warn!(
            user_id,
            attempts,
            uri = %fallback,
            "user URI candidates exhausted, using random suffix"
        );
        Ok(fallback)
    }

    /// Local URI for an entity imported from `source_uri`.
    ///
    /// Fails with [`UriError::Collision`] when another entity already owns
    /// the derived URI.
    pub fn local_entity_uri(&self, source_uri: &str) -> Result<String, EntityError> {
        let uri = entity_uri(self.config, source_uri)?;
        let owners = self
            .store
            .find_posts_by_meta(PostKind::Entity, meta::ENTITY_URL, &uri)?;
        if let Some(owner) = owners.first() {
            return Err(UriError::Collision {
                uri,
                source_uri: source_uri.to_string(),
                owner: owner.id,
            }
            .into());
        }
        Ok(uri)
    }
}
