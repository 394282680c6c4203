//! Core types and configuration for Recall request signing.
//!
//! This crate holds the pieces shared by the signing client, the verifying
//! server and the binaries: the [`Credential`] pair, environment-driven
//! configuration, and the infrastructure error type.

mod config;
mod error;
mod types;

pub use config::{ClientConfig, RecallConfig};
pub use error::{RecallError, RecallResult};
pub use types::Credential;
