//! Namespaces and the predicates the sync writes.

/// Prefix block prepended to every update. `dct` duplicates `dcterms`;
/// entity relations are written with the short form.
pub const PREFIXES: &str = "PREFIX dcterms: <http://purl.org/dc/terms/>
PREFIX rdfs: <http://www.w3.org/2000/01/rdf-schema#>
PREFIX owl: <http://www.w3.org/2002/07/owl#>
PREFIX schema: <http://schema.org/>
PREFIX dct: <http://purl.org/dc/terms/>
";

pub const SCHEMA_NS: &str = "http://schema.org/";

pub const RDF_TYPE: &str = "a";
pub const RDFS_LABEL: &str = "rdfs:label";
pub const OWL_SAME_AS: &str = "owl:sameAs";
pub const DCTERMS_REFERENCES: &str = "dcterms:references";
pub const DCT_RELATION: &str = "dct:relation";

pub const SCHEMA_URL: &str = "schema:url";
pub const SCHEMA_NAME: &str = "schema:name";
pub const SCHEMA_GIVEN_NAME: &str = "schema:givenName";
pub const SCHEMA_FAMILY_NAME: &str = "schema:familyName";
pub const SCHEMA_EMAIL: &str = "schema:email";
pub const SCHEMA_DESCRIPTION: &str = "schema:description";
pub const SCHEMA_AUTHOR: &str = "schema:author";
pub const SCHEMA_IMAGE: &str = "schema:image";
pub const SCHEMA_DATE_PUBLISHED: &str = "schema:datePublished";
pub const SCHEMA_DATE_MODIFIED: &str = "schema:dateModified";
pub const SCHEMA_INTERACTION_COUNT: &str = "schema:interactionCount";

/// Full IRI of a schema.org class, e.g. `schema_class("Person")`.
pub fn schema_class(name: &str) -> String {
    format!("{SCHEMA_NS}{name}")
}
