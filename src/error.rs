//! Rich diagnostic error types for wordlift-sync.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Lifecycle handlers in [`crate::sync`]
//! catch these at the boundary: a failed sync is logged and never surfaces to
//! the host as an error.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::paths::PathError;

/// Top-level error type for wordlift-sync.
#[derive(Debug, Error, Diagnostic)]
pub enum WlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Uri(#[from] UriError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(wl::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(wl::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             Try running with a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(wl::store::serde),
        help(
            "Failed to serialize or deserialize a stored record. \
             The stored data format may have changed between versions; re-import your site data."
        )
    )]
    Serialization { message: String },

    #[error("{kind} {id} not found")]
    #[diagnostic(
        code(wl::store::not_found),
        help("The record does not exist in the content store. Verify the identifier.")
    )]
    NotFound { kind: &'static str, id: u64 },

    #[error("post id space exhausted")]
    #[diagnostic(
        code(wl::store::ids_exhausted),
        help("An imported post carries the largest possible id. Re-import with smaller ids.")
    )]
    IdsExhausted,
}

// ---------------------------------------------------------------------------
// Client errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    #[error("transport error posting to {url}: {message}")]
    #[diagnostic(
        code(wl::client::transport),
        help(
            "The triple-store could not be reached. Check network connectivity \
             and the `api_url` setting."
        )
    )]
    Transport { url: String, message: String },

    #[error("triple-store answered HTTP {status}")]
    #[diagnostic(
        code(wl::client::status),
        help(
            "Only HTTP 200 counts as success. A 401/403 usually means the \
             application key is wrong; a 400 means the update was rejected."
        )
    )]
    Status { status: u16, body: String },

    #[error("local SPARQL update failed: {message}")]
    #[diagnostic(
        code(wl::client::local),
        help("The in-process store rejected the update. The query text is logged at debug level.")
    )]
    Local { message: String },
}

// ---------------------------------------------------------------------------
// URI errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum UriError {
    #[error("user {user_id} not found")]
    #[diagnostic(
        code(wl::uri::user_not_found),
        help("A URI can only be built for an existing user account.")
    )]
    UserNotFound { user_id: u64 },

    #[error("cannot derive a local URI from \"{uri}\": no trailing path segment")]
    #[diagnostic(
        code(wl::uri::invalid_source),
        help("Entity source URIs must end with a non-empty path segment, e.g. http://dbpedia.org/resource/Berlin.")
    )]
    InvalidSourceUri { uri: String },

    #[error("local URI {uri} (from {source_uri}) is already owned by entity {owner}")]
    #[diagnostic(
        code(wl::uri::collision),
        help(
            "Two distinct source URIs end with the same path segment. \
             Link the existing entity by adding the source URI as its same-as alias."
        )
    )]
    Collision {
        uri: String,
        source_uri: String,
        owner: u64,
    },
}

// ---------------------------------------------------------------------------
// Entity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EntityError {
    #[error("entity {entity_id} has no entity_url")]
    #[diagnostic(
        code(wl::entity::missing_uri),
        help("Set the entity URL on the entity before syncing it.")
    )]
    MissingUri { entity_id: u64 },

    #[error("post {post_id} is not an entity")]
    #[diagnostic(code(wl::entity::not_an_entity))]
    NotAnEntity { post_id: u64 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Uri(#[from] UriError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for functions returning wordlift-sync results.
pub type WlResult<T> = std::result::Result<T, WlError>;
