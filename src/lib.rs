// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # wordlift-sync
//!
//! Keeps a remote RDF triple-store in step with a CMS's posts, entities and
//! users, publishing them as linked data.
//!
//! ## Architecture
//!
//! - **Query builder** (`sparql`): full-replace SPARQL Update text with literal escaping
//! - **Endpoints** (`client`): hosted SPARQL Update API over HTTP, in-process oxigraph, dry run
//! - **URIs** (`uri`): post, author, entity and user URIs under one dataset base
//! - **Entities** (`entity`): annotation lookup by canonical URI or alias, draft creation
//! - **Relationships** (`relations`): post → entity forward lists with reverse lists
//! - **Sync** (`sync`): lifecycle events in, one replace query per resource out
//! - **Timeline** (`timeline`): dated entities of a post as widget JSON
//! - **Storage** (`store`): the host surface, in memory (DashMap) or durable (redb)
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use wordlift_sync::client::RedlinkClient;
//! use wordlift_sync::config::SyncConfig;
//! use wordlift_sync::store::MemStore;
//! use wordlift_sync::sync::{LifecycleEvent, SyncEngine};
//!
//! let config = SyncConfig::new("acme", "blog");
//! let client = Arc::new(RedlinkClient::new(&config));
//! let engine = SyncEngine::new(config, Arc::new(MemStore::new()), client);
//! let report = engine.handle(LifecycleEvent::UserRegistered(1));
//! println!("{report:?}");
//! ```

pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod paths;
pub mod relations;
pub mod snapshot;
pub mod sparql;
pub mod store;
pub mod sync;
pub mod timeline;
pub mod uri;
