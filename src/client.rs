//! Triple-store endpoints.
//!
//! [`SparqlEndpoint`] is the seam between the sync and the remote store. The
//! contract is deliberately narrow: an update either succeeded (`true`) or
//! it did not (`false`). Failures are logged here and never retried.
//!
//! - [`RedlinkClient`] — blocking HTTP POST to the hosted SPARQL Update API
//! - [`LocalEndpoint`] — applies updates to an in-process oxigraph store
//! - [`DryRunEndpoint`] — accepts and records updates without sending them

use std::sync::Mutex;
use std::time::Duration;

use oxigraph::model::Term;
use oxigraph::sparql::QueryResults;
use oxigraph::store::Store;

use crate::config::SyncConfig;
use crate::error::ClientError;
use crate::sparql::Object;
use crate::sparql::vocab::PREFIXES;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Content type of every update request.
pub const SPARQL_UPDATE_CONTENT_TYPE: &str = "application/sparql-update; charset=utf-8";

/// Something that accepts SPARQL Update text.
pub trait SparqlEndpoint: Send + Sync {
    /// Apply `query`. `true` only on confirmed success.
    fn update(&self, query: &str) -> bool;
}

// ---------------------------------------------------------------------------
// RedlinkClient
// ---------------------------------------------------------------------------

/// HTTP client for the hosted SPARQL Update API.
///
/// One request per update: 45 s timeout, up to 5 redirects (both from
/// config), certificate verification left on.
pub struct RedlinkClient {
    endpoint: String,
    redacted: String,
    http: ureq::Agent,
}

impl RedlinkClient {
    pub fn new(config: &SyncConfig) -> Self {
        let http = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirects(config.max_redirects)
            .build();
        let redacted = SyncConfig {
            application_key: "***".into(),
            ..config.clone()
        }
        .update_endpoint();
        Self {
            endpoint: config.update_endpoint(),
            redacted,
            http,
        }
    }

    /// Endpoint URL with the application key masked, for logs.
    pub fn endpoint_redacted(&self) -> &str {
        &self.redacted
    }

    /// POST the update and report the precise failure, if any.
    pub fn execute(&self, query: &str) -> ClientResult<()> {
        let result = self
            .http
            .post(&self.endpoint)
            .set("Content-Type", SPARQL_UPDATE_CONTENT_TYPE)
            .send_string(query);

        match result {
            Ok(resp) if resp.status() == 200 => Ok(()),
            Ok(resp) => Err(ClientError::Status {
                status: resp.status(),
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Status(status, resp)) => Err(ClientError::Status {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(ClientError::Transport {
                url: self.redacted.clone(),
                message: transport.to_string(),
            }),
        }
    }
}

impl SparqlEndpoint for RedlinkClient {
    fn update(&self, query: &str) -> bool {
        tracing::debug!(endpoint = %self.redacted, %query, "posting SPARQL update");
        match self.execute(query) {
            Ok(()) => {
                tracing::debug!(endpoint = %self.redacted, "SPARQL update accepted");
                true
            }
            Err(ClientError::Status { status, body }) => {
                tracing::warn!(endpoint = %self.redacted, status, %body, "SPARQL update rejected");
                false
            }
            Err(e) => {
                tracing::warn!(endpoint = %self.redacted, error = %e, "SPARQL update failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for RedlinkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedlinkClient")
            .field("endpoint", &self.redacted)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// LocalEndpoint
// ---------------------------------------------------------------------------

/// In-process triple-store. Updates that fail to parse or evaluate are
/// reported as failures, which makes this a syntax check for generated
/// queries as well.
pub struct LocalEndpoint {
    store: Store,
}

impl LocalEndpoint {
    pub fn in_memory() -> ClientResult<Self> {
        let store = Store::new().map_err(|e| ClientError::Local {
            message: format!("failed to create oxigraph store: {e}"),
        })?;
        Ok(Self { store })
    }

    /// Apply an update, keeping the error.
    #[allow(deprecated)]
    pub fn execute(&self, query: &str) -> ClientResult<()> {
        self.store.update(query).map_err(|e| ClientError::Local {
            message: e.to_string(),
        })
    }

    /// Objects of `(subject, predicate, ?o)`, sorted by their rendering.
    /// `predicate` may be a prefixed name or `a`.
    #[allow(deprecated)]
    pub fn objects(&self, subject: &str, predicate: &str) -> ClientResult<Vec<Object>> {
        let sparql = format!("{PREFIXES}SELECT ?o WHERE {{ <{subject}> {predicate} ?o }}");
        let results = self.store.query(sparql.as_str()).map_err(|e| ClientError::Local {
            message: format!("SPARQL query failed: {e}"),
        })?;

        let mut objects = Vec::new();
        match results {
            QueryResults::Solutions(solutions) => {
                for solution in solutions {
                    let solution = solution.map_err(|e| ClientError::Local {
                        message: format!("solution error: {e}"),
                    })?;
                    if let Some(term) = solution.get("o") {
                        objects.push(term_to_object(term));
                    }
                }
            }
            _ => {
                return Err(ClientError::Local {
                    message: "unexpected result type from SELECT".into(),
                });
            }
        }
        objects.sort_by_key(|o| o.to_string());
        Ok(objects)
    }

    /// Number of triples mentioning `uri` as subject or object.
    pub fn mentions(&self, uri: &str) -> ClientResult<usize> {
        let as_subject = self.objects(uri, "?p")?.len();
        let sparql = format!("SELECT ?s WHERE {{ ?s ?p <{uri}> }}");
        #[allow(deprecated)]
        let results = self.store.query(sparql.as_str()).map_err(|e| ClientError::Local {
            message: format!("SPARQL query failed: {e}"),
        })?;
        let as_object = match results {
            QueryResults::Solutions(solutions) => solutions.filter(|s| s.is_ok()).count(),
            _ => 0,
        };
        Ok(as_subject + as_object)
    }

    /// Total number of triples.
    pub fn len(&self) -> ClientResult<usize> {
        self.store.len().map_err(|e| ClientError::Local {
            message: e.to_string(),
        })
    }

    pub fn is_empty(&self) -> ClientResult<bool> {
        self.len().map(|n| n == 0)
    }

    /// Underlying oxigraph store.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

fn term_to_object(term: &Term) -> Object {
    match term {
        Term::NamedNode(node) => Object::Uri(node.as_str().to_string()),
        Term::Literal(literal) => match literal.language() {
            Some(lang) => Object::lang(literal.value(), lang),
            None => Object::literal(literal.value()),
        },
        other => Object::Literal(other.to_string()),
    }
}

impl SparqlEndpoint for LocalEndpoint {
    fn update(&self, query: &str) -> bool {
        match self.execute(query) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, %query, "local SPARQL update failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for LocalEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEndpoint").finish()
    }
}

// ---------------------------------------------------------------------------
// DryRunEndpoint
// ---------------------------------------------------------------------------

/// Logs every update at info level and reports success.
#[derive(Debug, Default)]
pub struct DryRunEndpoint {
    accepted: Mutex<Vec<String>>,
}

impl DryRunEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of every accepted update, in order.
    pub fn accepted(&self) -> Vec<String> {
        match self.accepted.lock() {
            Ok(queries) => queries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SparqlEndpoint for DryRunEndpoint {
    fn update(&self, query: &str) -> bool {
        tracing::info!(%query, "dry run: SPARQL update not sent");
        match self.accepted.lock() {
            Ok(mut queries) => queries.push(query.to_string()),
            Err(poisoned) => poisoned.into_inner().push(query.to_string()),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::sparql::vocab::{RDFS_LABEL, SCHEMA_GIVEN_NAME};
    use crate::sparql::{ReplaceQuery, delete_resource};

    /// Answer every connection with `status`. Returns the base URL, a hit
    /// counter and the captured requests (head plus body).
    fn mock_server(status: u16) -> (String, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (hits_t, seen_t) = (Arc::clone(&hits), Arc::clone(&seen));
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { break };
                hits_t.fetch_add(1, Ordering::SeqCst);
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut head = String::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some(v) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                        content_length = v.trim().parse().unwrap();
                    }
                    head.push_str(&line);
                }
                let mut body = vec![0u8; content_length];
                reader.read_exact(&mut body).unwrap();
                head.push_str(&String::from_utf8_lossy(&body));
                seen_t.lock().unwrap().push(head);
                let reason = if status == 200 { "OK" } else { "Error" };
                write!(
                    stream,
                    "HTTP/1.1 {status} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                )
                .unwrap();
            }
        });
        (format!("http://{addr}"), hits, seen)
    }

    fn config_for(api_url: &str) -> SyncConfig {
        SyncConfig {
            api_url: api_url.into(),
            application_key: "appkey".into(),
            timeout_secs: 5,
            ..SyncConfig::new("acme", "blog")
        }
    }

    #[test]
    fn status_200_is_success() {
        let (url, hits, seen) = mock_server(200);
        let client = RedlinkClient::new(&config_for(&url));
        assert!(client.update("INSERT DATA { }"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let request = seen.lock().unwrap()[0].clone();
        assert!(request.starts_with("POST /1.0-ALPHA/data/blog/sparql/update?key=appkey "));
        assert!(request
            .to_ascii_lowercase()
            .contains("content-type: application/sparql-update; charset=utf-8"));
        assert!(request.ends_with("INSERT DATA { }"));
    }

    #[test]
    fn status_500_is_failure_without_retry() {
        let (url, hits, _) = mock_server(500);
        let client = RedlinkClient::new(&config_for(&url));
        assert!(!client.update("INSERT DATA { }"));
        assert!(matches!(
            client.execute("INSERT DATA { }"),
            Err(ClientError::Status { status: 500, .. })
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn connection_refused_is_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = RedlinkClient::new(&config_for(&format!("http://127.0.0.1:{port}")));
        assert!(!client.update("INSERT DATA { }"));
        assert!(matches!(
            client.execute("INSERT DATA { }"),
            Err(ClientError::Transport { .. })
        ));
    }

    #[test]
    fn redacted_endpoint_hides_key() {
        let client = RedlinkClient::new(&config_for("https://api.example.org"));
        assert!(client.endpoint_redacted().ends_with("?key=***"));
        assert!(!format!("{client:?}").contains("appkey"));
    }

    #[test]
    fn local_endpoint_applies_replace_queries() {
        let local = LocalEndpoint::in_memory().unwrap();
        let s = "http://data.example.org/u/d/post/1";

        let mut first = ReplaceQuery::new(s).clear(RDFS_LABEL);
        first.assert(RDFS_LABEL, Object::literal("Old"));
        assert!(local.update(&first.to_sparql()));

        let mut second = ReplaceQuery::new(s).clear(RDFS_LABEL);
        second.assert(RDFS_LABEL, Object::literal("New"));
        assert!(local.update(&second.to_sparql()));

        assert_eq!(
            local.objects(s, RDFS_LABEL).unwrap(),
            vec![Object::literal("New")]
        );
    }

    #[test]
    fn local_endpoint_keeps_language_tags() {
        let local = LocalEndpoint::in_memory().unwrap();
        let s = "http://data.example.org/u/d/user/ada";
        let mut q = ReplaceQuery::new(s);
        q.assert(SCHEMA_GIVEN_NAME, Object::lang("Ada", "en"));
        assert!(local.update(&q.to_sparql()));
        assert_eq!(
            local.objects(s, SCHEMA_GIVEN_NAME).unwrap(),
            vec![Object::lang("Ada", "en")]
        );
    }

    #[test]
    fn local_endpoint_rejects_malformed_update() {
        let local = LocalEndpoint::in_memory().unwrap();
        assert!(!local.update("INSERT DATA { <broken"));
    }

    #[test]
    fn delete_resource_clears_both_directions() {
        let local = LocalEndpoint::in_memory().unwrap();
        let user = "http://data.example.org/u/d/user/ada";
        let post = "http://data.example.org/u/d/post/1";
        let mut q = ReplaceQuery::new(user);
        q.assert(SCHEMA_GIVEN_NAME, Object::literal("Ada"));
        q.insert(crate::sparql::Triple::new(post, "schema:author", Object::uri(user)));
        assert!(local.update(&q.to_sparql()));
        assert_eq!(local.mentions(user).unwrap(), 2);

        assert!(local.update(&delete_resource(user)));
        assert_eq!(local.mentions(user).unwrap(), 0);
        assert!(local.is_empty().unwrap());
    }

    #[test]
    fn dry_run_records_queries() {
        let dry = DryRunEndpoint::new();
        assert!(dry.update("INSERT DATA { }"));
        assert!(dry.update("DELETE WHERE { ?s ?p ?o }"));
        assert_eq!(dry.accepted().len(), 2);
    }
}
