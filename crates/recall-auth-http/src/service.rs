//! Authenticating HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::Incoming;
use recall_auth::{AuthResult, RateLimiter, Verifier};
use tracing::warn;

use crate::body::AuthResponseBody;
use crate::error::ServiceError;
use crate::handler::{AuthenticatedHandler, dispatch_request};
use crate::response::{CONTENT_TYPE, REQUEST_ID_HEADER, error_to_response};

/// Default cap on a request body, in bytes (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for the authenticating HTTP service.
#[derive(Clone)]
pub struct AuthHttpConfig {
    /// Whether to skip signature validation entirely. Development only.
    pub skip_signature_validation: bool,
    /// Exact paths served without authentication (health checks).
    pub public_paths: Vec<String>,
    /// Verifier for signed requests. Without one, every non-public request
    /// is rejected unless validation is skipped.
    pub verifier: Option<Arc<Verifier>>,
    /// Optional per-key request budget, applied after authentication.
    pub rate_limiter: Option<Arc<RateLimiter>>,
    /// Largest request body the service buffers before answering 400.
    pub max_body_bytes: usize,
}

impl Default for AuthHttpConfig {
    fn default() -> Self {
        Self {
            skip_signature_validation: false,
            public_paths: Vec::new(),
            verifier: None,
            rate_limiter: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl AuthHttpConfig {
    fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| p == path)
    }
}

impl std::fmt::Debug for AuthHttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHttpConfig")
            .field("skip_signature_validation", &self.skip_signature_validation)
            .field("public_paths", &self.public_paths)
            .field("verifier", &self.verifier)
            .field(
                "rate_limit_per_minute",
                &self.rate_limiter.as_ref().map(|l| l.limit_per_minute()),
            )
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

/// Hyper `Service` that authenticates requests before handing them to an
/// [`AuthenticatedHandler`].
#[derive(Debug)]
pub struct AuthHttpService<H: AuthenticatedHandler> {
    handler: Arc<H>,
    config: Arc<AuthHttpConfig>,
}

impl<H: AuthenticatedHandler> AuthHttpService<H> {
    /// Create a new `AuthHttpService`.
    pub fn new(handler: Arc<H>, config: AuthHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }

    /// Run one request through the full pipeline: collect the body,
    /// authenticate, rate limit, dispatch.
    pub async fn handle<B>(&self, req: http::Request<B>) -> http::Response<AuthResponseBody>
    where
        B: http_body::Body<Data = Bytes> + Send,
        B::Error: Into<BoxError>,
    {
        let request_id = uuid::Uuid::new_v4().to_string();
        let response = process_request(req, self.handler.as_ref(), &self.config, &request_id).await;
        add_common_headers(response, &request_id)
    }
}

impl<H: AuthenticatedHandler> Clone for AuthHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: AuthenticatedHandler> hyper::service::Service<http::Request<Incoming>>
    for AuthHttpService<H>
{
    type Response = http::Response<AuthResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let service = self.clone();
        Box::pin(async move { Ok(service.handle(req).await) })
    }
}

/// Process a single request through the full pipeline.
async fn process_request<H, B>(
    req: http::Request<B>,
    handler: &H,
    config: &AuthHttpConfig,
    request_id: &str,
) -> http::Response<AuthResponseBody>
where
    H: AuthenticatedHandler,
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let (parts, incoming) = req.into_parts();

    // 1. Collect body. The verifier hashes exactly these bytes.
    let body = match collect_body(incoming, config.max_body_bytes).await {
        Ok(body) => body,
        Err(err) => {
            warn!(request_id, error = %err.message, "Failed to read request body");
            return error_to_response(&err, request_id);
        }
    };

    // 2. Authenticate and rate limit, unless public or disabled.
    let auth = if config.skip_signature_validation || config.is_public(parts.uri.path()) {
        None
    } else {
        match authenticate(&parts, &body, config, request_id) {
            Ok(auth) => Some(auth),
            Err(err) => return error_to_response(&err, request_id),
        }
    };

    // 3. Dispatch to handler.
    match dispatch_request(handler, auth, parts, body).await {
        Ok(response) => response,
        Err(err) => error_to_response(&err, request_id),
    }
}

/// Verify the request and charge it against the caller's rate limit.
///
/// The specific reason for a rejection is logged here and nowhere else; the
/// client only ever sees [`ServiceError::unauthorized`].
fn authenticate(
    parts: &http::request::Parts,
    body: &[u8],
    config: &AuthHttpConfig,
    request_id: &str,
) -> Result<AuthResult, ServiceError> {
    let Some(verifier) = config.verifier.as_ref() else {
        warn!(request_id, "No verifier configured, rejecting request");
        return Err(ServiceError::unauthorized());
    };

    let auth = verifier.verify(parts, body).map_err(|err| {
        warn!(
            request_id,
            reason = err.reason(),
            error = %err,
            method = %parts.method,
            path = parts.uri.path(),
            "Rejected unauthenticated request",
        );
        ServiceError::unauthorized()
    })?;

    if let Some(limiter) = config.rate_limiter.as_ref() {
        limiter
            .check(&auth.api_key, verifier.now())
            .map_err(|err| {
                warn!(
                    request_id,
                    api_key = auth.api_key.as_str(),
                    retry_after = err.retry_after,
                    "Rate limit exceeded",
                );
                ServiceError::from(err)
            })?;
    }

    Ok(auth)
}

/// Collect the incoming body into a single `Bytes` buffer, refusing anything
/// longer than `limit` bytes.
async fn collect_body<B>(incoming: B, limit: usize) -> Result<Bytes, ServiceError>
where
    B: http_body::Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    Limited::new(incoming, limit)
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| {
            if e.is::<LengthLimitError>() {
                ServiceError::bad_request(format!("Request body exceeds {limit} bytes"))
            } else {
                ServiceError::bad_request(format!("Failed to read request body: {e}"))
            }
        })
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<AuthResponseBody>,
    request_id: &str,
) -> http::Response<AuthResponseBody> {
    let headers = response.headers_mut();

    // The service owns request ids; handlers may leave theirs blank.
    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.insert(REQUEST_ID_HEADER, hv);
    }

    headers
        .entry(http::header::CONTENT_TYPE)
        .or_insert(http::HeaderValue::from_static(CONTENT_TYPE));

    response
}
