//! Integration tests for KvGate server.
//!
//! Each test starts its own in-process server on an ephemeral loopback port,
//! backed by in-memory buckets, and talks to it over real HTTP.
//!
//! Run them with:
//! ```text
//! cargo test -p kvgate-integration
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use kvgate_core::config::{BucketSpec, StoreBackend, StoreConfig};
use kvgate_core::handler::KvGateHandler;
use kvgate_core::provider::KvGateProvider;
use kvgate_core::registry::BucketRegistry;
use kvgate_http::service::KvGateHttpService;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// A running gateway. The accept loop is aborted on drop.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
    task: JoinHandle<()>,
}

/// Status, selected headers and body of a gateway response.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code.
    pub status: u16,
    /// `content-type` header.
    pub content_type: Option<String>,
    /// `x-request-id` header.
    pub request_id: Option<String>,
    /// `server` header.
    pub server: Option<String>,
    /// Raw body text.
    pub body: String,
}

impl TestResponse {
    /// Parse the body as JSON.
    #[must_use]
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("response body is not JSON ({e}): {}", self.body))
    }

    /// Error code from an `{"err": {..}}` body.
    #[must_use]
    pub fn err_code(&self) -> u64 {
        self.json()["err"]["code"]
            .as_u64()
            .unwrap_or_else(|| panic!("not an error envelope: {}", self.body))
    }
}

impl TestServer {
    /// Start a server exposing the single bucket `default`.
    pub async fn start() -> Self {
        Self::with_buckets(&["default"]).await
    }

    /// Start a server exposing the given in-memory buckets.
    pub async fn with_buckets(buckets: &[&str]) -> Self {
        init_tracing();

        let config = StoreConfig::builder()
            .backend(StoreBackend::Memory)
            .buckets(
                buckets
                    .iter()
                    .map(|b| BucketSpec::Name((*b).to_owned()))
                    .collect(),
            )
            .build();
        let registry = BucketRegistry::from_config(&config)
            .await
            .expect("memory buckets always open");
        let provider = KvGateProvider::new(Arc::new(registry));
        let service = KvGateHttpService::new(Arc::new(KvGateHandler::new(Arc::new(provider))));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");
        tracing::debug!(%addr, "test server listening");

        let task = tokio::spawn(async move {
            let http = HttpConnBuilder::new(TokioExecutor::new());
            while let Ok((stream, _)) = listener.accept().await {
                let conn = http
                    .serve_connection(TokioIo::new(stream), service.clone())
                    .into_owned();
                tokio::spawn(async move {
                    let _ = conn.await;
                });
            }
        });

        Self {
            addr,
            client: reqwest::Client::new(),
            task,
        }
    }

    /// Absolute URL for a path and query.
    #[must_use]
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{path_and_query}", self.addr)
    }

    /// Send a request with an optional content type and body.
    pub async fn send(
        &self,
        method: &str,
        path_and_query: &str,
        content_type: Option<&str>,
        body: &str,
    ) -> TestResponse {
        let method = reqwest::Method::from_bytes(method.as_bytes()).expect("valid method");
        let mut req = self
            .client
            .request(method, self.url(path_and_query))
            .body(body.to_owned());
        if let Some(ct) = content_type {
            req = req.header("content-type", ct);
        }
        let resp = req.send().await.expect("request failed");

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned)
        };
        let status = resp.status().as_u16();
        let content_type = header("content-type");
        let request_id = header("x-request-id");
        let server = header("server");
        let body = resp.text().await.expect("failed to read body");

        TestResponse {
            status,
            content_type,
            request_id,
            server,
            body,
        }
    }

    /// `GET` a path.
    pub async fn get(&self, path_and_query: &str) -> TestResponse {
        self.send("GET", path_and_query, None, "").await
    }

    /// `POST` a JSON document.
    pub async fn post_json(&self, path_and_query: &str, body: &str) -> TestResponse {
        self.send("POST", path_and_query, Some("application/json"), body)
            .await
    }

    /// Store `body` under `key` in bucket `default` and return its CAS token.
    pub async fn put_and_read_cas(&self, key: &str, body: &str) -> u64 {
        let saved = self.post_json(&format!("/default/{key}"), body).await;
        assert_eq!(saved.body, "{}", "save failed: {}", saved.body);
        self.read_cas(key).await
    }

    /// Current CAS token of `key` in bucket `default`.
    pub async fn read_cas(&self, key: &str) -> u64 {
        let read = self.get(&format!("/default/{key}")).await;
        read.json()[0]["cas"]
            .as_u64()
            .unwrap_or_else(|| panic!("no cas in response: {}", read.body))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Generate a unique document key for a test.
#[must_use]
pub fn unique_key(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("{prefix}-{id}")
}

#[cfg(test)]
mod test_cas;
#[cfg(test)]
mod test_document;
#[cfg(test)]
mod test_validation;
