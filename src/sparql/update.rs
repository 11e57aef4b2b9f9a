//! The full-replace update primitive.

use std::fmt;

use super::escape::escape_literal;
use super::vocab::PREFIXES;

/// Object position of a triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    /// An IRI, embedded between angle brackets without escaping.
    Uri(String),
    /// A plain string literal.
    Literal(String),
    /// A string literal tagged with a language, e.g. `'Ada'@en`.
    LangLiteral { value: String, lang: String },
}

impl Object {
    pub fn uri(uri: impl Into<String>) -> Self {
        Object::Uri(uri.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Object::Literal(value.into())
    }

    pub fn lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Object::LangLiteral {
            value: value.into(),
            lang: lang.into(),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Uri(uri) => write!(f, "<{uri}>"),
            Object::Literal(value) => write!(f, "'{}'", escape_literal(value)),
            Object::LangLiteral { value, lang } => {
                write!(f, "'{}'@{lang}", escape_literal(value))
            }
        }
    }
}

/// One statement to insert. The predicate is written verbatim: `a`, a
/// prefixed name from [`super::vocab`], or a bracketed IRI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    pub subject: String,
    pub predicate: String,
    pub object: Object,
}

impl Triple {
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Object) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Delete-then-insert reconciliation of one subject.
///
/// Every predicate registered with [`clear`](Self::clear) is wiped for the
/// subject before the inserts run, so the remote values end up exactly as
/// asserted. Inserted triples may use other subjects (e.g. inverse
/// relations); those are not cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceQuery {
    subject: String,
    cleared: Vec<String>,
    inserts: Vec<Triple>,
}

impl ReplaceQuery {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            cleared: Vec::new(),
            inserts: Vec::new(),
        }
    }

    /// Wipe existing values of `predicate` on the subject.
    pub fn clear(mut self, predicate: &str) -> Self {
        if !self.cleared.iter().any(|p| p == predicate) {
            self.cleared.push(predicate.to_string());
        }
        self
    }

    /// Wipe several predicates, in order.
    pub fn clear_all(self, predicates: &[&str]) -> Self {
        predicates.iter().fold(self, |q, p| q.clear(p))
    }

    /// Insert `(subject, predicate, object)`.
    pub fn assert(&mut self, predicate: &str, object: Object) -> &mut Self {
        let subject = self.subject.clone();
        self.inserts.push(Triple::new(subject, predicate, object));
        self
    }

    /// Insert an arbitrary triple.
    pub fn insert(&mut self, triple: Triple) -> &mut Self {
        self.inserts.push(triple);
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn cleared(&self) -> &[String] {
        &self.cleared
    }

    pub fn triples(&self) -> &[Triple] {
        &self.inserts
    }

    /// Render the complete update, prefixes included.
    pub fn to_sparql(&self) -> String {
        let mut query = String::from(PREFIXES);
        query.push('\n');
        let s = &self.subject;
        for predicate in &self.cleared {
            query.push_str(&format!(
                "DELETE {{ <{s}> {predicate} ?o . }}\nWHERE  {{ <{s}> {predicate} ?o . }};\n"
            ));
        }
        query.push_str("INSERT DATA {\n");
        for triple in &self.inserts {
            query.push_str("  ");
            query.push_str(&triple.to_string());
            query.push('\n');
        }
        query.push_str("}\n");
        query
    }
}

impl fmt::Display for ReplaceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sparql())
    }
}

/// Remove every triple in which `uri` is the subject or the object.
pub fn delete_resource(uri: &str) -> String {
    format!(
        "{PREFIXES}\nDELETE {{ <{uri}> ?p ?o . }} WHERE {{ <{uri}> ?p ?o . }};\n\
         DELETE {{ ?s ?p <{uri}> . }} WHERE {{ ?s ?p <{uri}> . }}\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::vocab::{RDF_TYPE, RDFS_LABEL, SCHEMA_URL, schema_class};

    const S: &str = "http://data.redlink.io/u/d/post/1";

    #[test]
    fn object_rendering() {
        assert_eq!(Object::uri("http://x/y").to_string(), "<http://x/y>");
        assert_eq!(Object::literal("it's").to_string(), r"'it\'s'");
        assert_eq!(Object::lang("Ada", "en").to_string(), "'Ada'@en");
    }

    #[test]
    fn renders_delete_per_cleared_predicate_then_insert() {
        let mut q = ReplaceQuery::new(S).clear_all(&[RDFS_LABEL, RDF_TYPE]);
        q.assert(RDFS_LABEL, Object::literal("Hello"))
            .assert(RDF_TYPE, Object::uri(schema_class("BlogPosting")));
        let text = q.to_sparql();

        assert!(text.starts_with("PREFIX dcterms:"));
        assert!(text.contains(&format!("DELETE {{ <{S}> rdfs:label ?o . }}")));
        assert!(text.contains(&format!("WHERE  {{ <{S}> a ?o . }};")));
        assert!(text.contains(&format!("<{S}> rdfs:label 'Hello' .")));
        assert!(text.contains(&format!("<{S}> a <http://schema.org/BlogPosting> .")));
        let delete_at = text.find("DELETE").unwrap();
        let insert_at = text.find("INSERT DATA").unwrap();
        assert!(delete_at < insert_at);
    }

    #[test]
    fn duplicate_clear_is_ignored() {
        let q = ReplaceQuery::new(S).clear(SCHEMA_URL).clear(SCHEMA_URL);
        assert_eq!(q.cleared().len(), 1);
    }

    #[test]
    fn empty_replace_still_has_insert_block() {
        let q = ReplaceQuery::new(S).clear(SCHEMA_URL);
        let text = q.to_sparql();
        assert!(text.contains("INSERT DATA {\n}"));
    }

    #[test]
    fn inserts_keep_their_order() {
        let mut q = ReplaceQuery::new(S);
        q.assert(SCHEMA_URL, Object::uri("http://a"))
            .insert(Triple::new("http://other", SCHEMA_URL, Object::uri("http://b")));
        let text = q.to_sparql();
        assert!(text.find("http://a").unwrap() < text.find("http://b").unwrap());
        assert_eq!(q.triples()[1].subject, "http://other");
    }

    #[test]
    fn delete_resource_covers_both_positions() {
        let text = delete_resource("http://x/user/ada");
        assert!(text.contains("DELETE { <http://x/user/ada> ?p ?o . }"));
        assert!(text.contains("DELETE { ?s ?p <http://x/user/ada> . }"));
    }
}
