//! Request handler for the reference server.
//!
//! Serves the unauthenticated health checks, echoes the caller's identity back on
//! authenticated requests under `/ai/` and answers 404 elsewhere.

use bytes::Bytes;
use recall_auth::AuthResult;
use recall_auth_http::handler::HandlerFuture;
use recall_auth_http::response::json_response;
use recall_auth_http::{AuthResponseBody, AuthenticatedHandler, ServiceError};
use serde::Serialize;

/// Liveness check path.
pub const HEALTH_PATH: &str = "/healthz";

/// Readiness check path.
pub const READY_PATH: &str = "/readyz";

/// Paths served without authentication.
pub const PUBLIC_PATHS: [&str; 2] = [HEALTH_PATH, READY_PATH];

/// Prefix of the echoed API routes.
pub const API_PREFIX: &str = "/ai/";

#[derive(Debug, Serialize)]
struct Status {
    status: &'static str,
}

/// What an authenticated caller gets back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Echo {
    api_key: Option<String>,
    method: String,
    path: String,
    body_bytes: usize,
}

/// Echo handler: reports who was authenticated and what they called.
#[derive(Debug, Clone, Default)]
pub struct EchoHandler;

impl AuthenticatedHandler for EchoHandler {
    fn handle(
        &self,
        auth: Option<AuthResult>,
        parts: http::request::Parts,
        body: Bytes,
    ) -> HandlerFuture {
        Box::pin(async move {
            let path = parts.uri.path();
            let method = &parts.method;
            match path {
                HEALTH_PATH | READY_PATH => health_status(method, path),
                _ if path.starts_with(API_PREFIX) => {
                    let echo = Echo {
                        api_key: auth.map(|a| a.api_key),
                        method: method.to_string(),
                        path: path.to_owned(),
                        body_bytes: body.len(),
                    };
                    Ok(json_response(http::StatusCode::OK, &echo, ""))
                }
                _ => Err(ServiceError::not_found(path)),
            }
        })
    }
}

/// Answer a liveness or readiness check. `HEAD` gets the status line only.
fn health_status(
    method: &http::Method,
    path: &str,
) -> Result<http::Response<AuthResponseBody>, ServiceError> {
    let status = if path == HEALTH_PATH { "ok" } else { "ready" };
    match *method {
        http::Method::GET => Ok(json_response(http::StatusCode::OK, &Status { status }, "")),
        http::Method::HEAD => Ok(http::Response::builder()
            .status(http::StatusCode::OK)
            .body(AuthResponseBody::empty())
            .expect("valid health response")),
        _ => Err(ServiceError::new(
            http::StatusCode::METHOD_NOT_ALLOWED,
            "method-not-allowed",
            format!("{method} is not allowed on {path}"),
        )),
    }
}
