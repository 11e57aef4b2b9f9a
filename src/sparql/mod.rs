//! SPARQL Update construction.
//!
//! The remote store is a write-only projection of local state. Every sync
//! builds a [`ReplaceQuery`]: for a fixed set of predicates, delete whatever
//! the subject currently has, then insert the desired triples. Nothing ever
//! reads back from the remote side to compute a diff.

pub mod escape;
pub mod update;
pub mod vocab;

pub use escape::escape_literal;
pub use update::{Object, ReplaceQuery, Triple, delete_resource};
