//! Signing HTTP client.

use recall_auth::Signer;
use recall_core::ClientConfig;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClientError;

/// Calls the Recall API, signing every request with the configured credential.
#[derive(Clone)]
pub struct RecallClient {
    http: reqwest::Client,
    config: ClientConfig,
    signer: Signer,
}

impl std::fmt::Debug for RecallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecallClient")
            .field("base_url", &self.config.base_url())
            .field("api_key", &self.config.credential().api_key())
            .finish_non_exhaustive()
    }
}

impl RecallClient {
    /// Create a client that signs with the credential in `config`.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let signer = Signer::new(config.credential().clone());
        Self {
            http: reqwest::Client::new(),
            config,
            signer,
        }
    }

    /// Replace the signer, e.g. to pin its clock or nonce source.
    #[must_use]
    pub fn with_signer(mut self, signer: Signer) -> Self {
        self.signer = signer;
        self
    }

    /// Replace the underlying HTTP client.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sign and `POST` a JSON body to `path`.
    pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.call_endpoint(Method::POST, path, Some(body)).await
    }

    /// Sign and send a request, decoding the JSON response.
    ///
    /// The bytes sent are exactly the bytes that were hashed. An empty
    /// response body decodes as `{}`. A non-success status becomes
    /// [`ClientError::Api`] carrying the server's `error.message`.
    pub async fn call_endpoint<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, ClientError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let signed = self.signer.sign(method.as_str(), path, body)?;
        let url = self.config.url_for(path);
        debug!(%method, %url, nonce = signed.envelope.nonce.as_str(), "sending signed request");

        let request = signed
            .envelope
            .headers()
            .into_iter()
            .fold(self.http.request(method, url), |builder, (name, value)| {
                builder.header(name, value)
            })
            .body(signed.body);

        let transport = |source| ClientError::Transport {
            path: path.to_owned(),
            source,
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        decode_response(path, status, &text)
    }
}

/// Turn a response status and body into the caller's type or a typed error.
fn decode_response<R: DeserializeOwned>(
    path: &str,
    status: StatusCode,
    text: &str,
) -> Result<R, ClientError> {
    let invalid = |source| ClientError::InvalidJson {
        path: path.to_owned(),
        source,
    };

    let payload: serde_json::Value = if text.is_empty() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(text).map_err(invalid)?
    };

    if !status.is_success() {
        debug!(path, status = status.as_u16(), "request failed");
        return Err(ClientError::from_envelope(status, &payload));
    }

    serde_json::from_value(payload).map_err(invalid)
}
