//! Integration tests for Recall request signing over HTTP.
//!
//! Each test starts the authenticating service in-process on an ephemeral
//! port and talks to it with `reqwest`, signing requests with the client-side
//! [`Signer`].
//!
//! ```text
//! cargo test -p recall-integration
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use bytes::Bytes;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use recall_auth::{AuthResult, SignedEnvelope, Signer};
use recall_auth_http::handler::HandlerFuture;
use recall_auth_http::response::json_response;
use recall_auth_http::{AuthHttpConfig, AuthHttpService, AuthenticatedHandler};
use recall_core::{ClientConfig, Credential};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

static INIT: Once = Once::new();

/// Api key accepted by test servers.
pub const TEST_API_KEY: &str = "dev-key";

/// Secret shared with test servers.
pub const TEST_API_SECRET: &str = "dev-secret";

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

/// The credential test clients sign with.
#[must_use]
pub fn test_credential() -> Credential {
    Credential::new(TEST_API_KEY, TEST_API_SECRET)
}

/// Answers `/healthz` and echoes the authenticated api key everywhere else.
#[derive(Debug, Default)]
pub struct EchoHandler;

impl AuthenticatedHandler for EchoHandler {
    fn handle(
        &self,
        auth: Option<AuthResult>,
        parts: http::request::Parts,
        body: Bytes,
    ) -> HandlerFuture {
        Box::pin(async move {
            let value = if parts.uri.path() == "/healthz" {
                serde_json::json!({ "status": "ok" })
            } else {
                serde_json::json!({
                    "apiKey": auth.map(|a| a.api_key),
                    "method": parts.method.as_str(),
                    "path": parts.uri.path(),
                    "bodyBytes": body.len(),
                })
            };
            Ok(json_response(http::StatusCode::OK, &value, ""))
        })
    }
}

/// A service running on an ephemeral local port. Stops when dropped.
#[derive(Debug)]
pub struct TestServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Start serving `config` in the background.
    pub async fn start(config: AuthHttpConfig) -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");
        let service = AuthHttpService::new(Arc::new(EchoHandler), config);

        let task = tokio::spawn(async move {
            let http = HttpConnBuilder::new(TokioExecutor::new());
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    continue;
                };
                let conn = http
                    .serve_connection(TokioIo::new(stream), service.clone())
                    .into_owned();
                tokio::spawn(async move {
                    let _ = conn.await;
                });
            }
        });

        Self { addr, task }
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(format!("http://{}/", self.addr), test_credential())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Attach the signing headers to a request.
#[must_use]
pub fn with_envelope(
    builder: reqwest::RequestBuilder,
    envelope: &SignedEnvelope,
) -> reqwest::RequestBuilder {
    envelope
        .headers()
        .into_iter()
        .fold(builder, |builder, (name, value)| builder.header(name, value))
}

/// Sign and send a request with a JSON body, exactly as a client would.
pub async fn send_signed(
    client: &reqwest::Client,
    config: &ClientConfig,
    signer: &Signer,
    method: &str,
    path: &str,
    body: Option<&serde_json::Value>,
) -> reqwest::Response {
    let signed = signer
        .sign(method, path, body)
        .expect("signing test request");
    let method: reqwest::Method = method.parse().expect("valid method");
    with_envelope(client.request(method, config.url_for(path)), &signed.envelope)
        .body(signed.body)
        .send()
        .await
        .expect("request reached the test server")
}

mod test_auth;
mod test_client;
mod test_rate_limit;
