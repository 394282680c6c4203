//! Signing HTTP client for the Recall API.
//!
//! [`RecallClient`] signs each request with the credential from a
//! [`ClientConfig`](recall_core::ClientConfig), sends exactly the hashed body
//! bytes, and maps the server's error envelope onto [`ClientError::Api`].
//!
//! ```no_run
//! # async fn run() -> Result<(), recall_client::ClientError> {
//! use recall_client::RecallClient;
//! use recall_core::{ClientConfig, Credential};
//!
//! let client = RecallClient::new(ClientConfig::new(
//!     "http://localhost:8080",
//!     Credential::new("dev-key", "dev-secret"),
//! ));
//! let reply: serde_json::Value = client
//!     .post("/ai/test", &serde_json::json!({"hello": "world"}))
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::RecallClient;
pub use error::ClientError;
