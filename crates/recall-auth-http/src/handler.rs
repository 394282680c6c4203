//! Handler trait for authenticated requests and dispatch.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use recall_auth::AuthResult;

use crate::body::AuthResponseBody;
use crate::error::ServiceError;

/// Boxed future returned by [`AuthenticatedHandler::handle`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<AuthResponseBody>, ServiceError>> + Send>>;

/// Business logic behind the authentication layer.
///
/// The handler only sees requests that passed verification and rate limiting.
/// `auth` is `None` for public paths and when signature validation is
/// disabled; otherwise it names the authenticated api key.
pub trait AuthenticatedHandler: Send + Sync + 'static {
    /// Handle a request and produce an HTTP response.
    fn handle(
        &self,
        auth: Option<AuthResult>,
        parts: http::request::Parts,
        body: Bytes,
    ) -> HandlerFuture;
}

/// Dispatch a request to the handler.
pub async fn dispatch_request<H: AuthenticatedHandler>(
    handler: &H,
    auth: Option<AuthResult>,
    parts: http::request::Parts,
    body: Bytes,
) -> Result<http::Response<AuthResponseBody>, ServiceError> {
    tracing::debug!(
        method = %parts.method,
        path = parts.uri.path(),
        api_key = auth.as_ref().map(|a| a.api_key.as_str()),
        "dispatching request",
    );
    handler.handle(auth, parts, body).await
}
