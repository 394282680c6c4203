//! HTTP service layer that authenticates signed Recall API requests.
//!
//! This crate wraps the verifier from `recall-auth` in a hyper service:
//!
//! - **Service**: collects the body up to a size cap, verifies the signature, applies the
//!   per-key rate limit and dispatches to the handler
//! - **Handler trait**: the boundary between HTTP transport and business logic
//! - **Response helpers**: JSON success/error response formatting
//!
//! Every authentication failure produces the same response:
//!
//! ```json
//! { "error": { "code": "unauthorized", "message": "Authentication failed." } }
//! ```

pub mod body;
pub mod error;
pub mod handler;
pub mod response;
pub mod service;

pub use body::AuthResponseBody;
pub use error::ServiceError;
pub use handler::{AuthenticatedHandler, HandlerFuture};
pub use service::{AuthHttpConfig, AuthHttpService, DEFAULT_MAX_BODY_BYTES};
