//! Configuration management for the Recall signing stack.
//!
//! All configuration is driven by environment variables. Parsing goes through a
//! lookup closure so callers (and tests) can supply values from anywhere.

use std::fmt;

use crate::error::{RecallError, RecallResult};
use crate::types::Credential;

/// Default timestamp tolerance in seconds.
const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// Default nonce retention in seconds.
const DEFAULT_NONCE_TTL_SECS: u64 = 600;

/// Default request body cap in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server-side configuration for request verification.
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallConfig {
    /// Bind address for the server.
    pub gateway_listen: String,
    /// Log level.
    pub log_level: String,
    /// The accepted api key.
    pub api_key: Option<String>,
    /// Shared secret for `api_key`.
    #[serde(skip_serializing)]
    pub api_secret: Option<String>,
    /// Maximum permitted distance between `X-Timestamp` and the server clock.
    pub tolerance_secs: u64,
    /// How long a verified nonce is remembered.
    pub nonce_ttl_secs: u64,
    /// Authenticated requests allowed per api key per minute.
    pub rate_limit_per_minute: Option<u32>,
    /// Whether to bypass signature verification entirely.
    pub skip_signature_validation: bool,
    /// Period of the background replay-cache sweep.
    pub nonce_sweep_interval_secs: u64,
    /// Largest request body the server will buffer.
    pub max_body_bytes: usize,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:8080".to_owned(),
            log_level: "info".to_owned(),
            api_key: None,
            api_secret: None,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            nonce_ttl_secs: DEFAULT_NONCE_TTL_SECS,
            rate_limit_per_minute: None,
            skip_signature_validation: false,
            nonce_sweep_interval_secs: 60,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl fmt::Debug for RecallConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecallConfig")
            .field("gateway_listen", &self.gateway_listen)
            .field("log_level", &self.log_level)
            .field("api_key", &self.api_key)
            .field("api_secret", &self.api_secret.as_ref().map(|_| "<redacted>"))
            .field("tolerance_secs", &self.tolerance_secs)
            .field("nonce_ttl_secs", &self.nonce_ttl_secs)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("skip_signature_validation", &self.skip_signature_validation)
            .field("nonce_sweep_interval_secs", &self.nonce_sweep_interval_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl RecallConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `GATEWAY_LISTEN` | `0.0.0.0:8080` |
    /// | `LOG_LEVEL` | `info` |
    /// | `AI_API_KEY` | *(unset)* |
    /// | `AI_API_SECRET` | *(unset)* |
    /// | `AI_REQUEST_TOLERANCE_SEC` | `300` |
    /// | `AI_NONCE_TTL_SEC` | `600` |
    /// | `AI_RATE_LIMIT_PER_MIN` | *(unset)* |
    /// | `SKIP_SIGNATURE_VALIDATION` | `false` |
    /// | `NONCE_SWEEP_INTERVAL_SEC` | `60` |
    /// | `AI_MAX_BODY_BYTES` | `1048576` |
    pub fn from_env() -> RecallResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> RecallResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            config.log_level = v;
        }
        config.api_key = lookup("AI_API_KEY").filter(|v| !v.is_empty());
        config.api_secret = lookup("AI_API_SECRET").filter(|v| !v.is_empty());
        if let Some(v) = lookup("AI_REQUEST_TOLERANCE_SEC") {
            config.tolerance_secs = parse_number("AI_REQUEST_TOLERANCE_SEC", &v)?;
        }
        if let Some(v) = lookup("AI_NONCE_TTL_SEC") {
            config.nonce_ttl_secs = parse_number("AI_NONCE_TTL_SEC", &v)?;
        }
        if let Some(v) = lookup("AI_RATE_LIMIT_PER_MIN") {
            let limit: u32 = parse_number("AI_RATE_LIMIT_PER_MIN", &v)?;
            config.rate_limit_per_minute = (limit > 0).then_some(limit);
        }
        if let Some(v) = lookup("SKIP_SIGNATURE_VALIDATION") {
            config.skip_signature_validation = parse_bool(&v);
        }
        if let Some(v) = lookup("NONCE_SWEEP_INTERVAL_SEC") {
            config.nonce_sweep_interval_secs = parse_number("NONCE_SWEEP_INTERVAL_SEC", &v)?;
        }
        if let Some(v) = lookup("AI_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_number("AI_MAX_BODY_BYTES", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can actually protect the server.
    pub fn validate(&self) -> RecallResult<()> {
        if !self.verification_enabled() && !self.skip_signature_validation {
            return Err(RecallError::Config(
                "AI_API_KEY and AI_API_SECRET must be set unless SKIP_SIGNATURE_VALIDATION is enabled"
                    .to_owned(),
            ));
        }
        if self.nonce_sweep_interval_secs == 0 {
            return Err(RecallError::Config(
                "NONCE_SWEEP_INTERVAL_SEC must be greater than zero".to_owned(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(RecallError::Config(
                "AI_MAX_BODY_BYTES must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Whether key and secret are both configured.
    #[must_use]
    pub fn verification_enabled(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some()
    }

    /// The configured credential, if both halves are present.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        match (&self.api_key, &self.api_secret) {
            (Some(key), Some(secret)) => Some(Credential::new(key.clone(), secret.clone())),
            _ => None,
        }
    }

    /// How long a nonce must be remembered.
    ///
    /// Never shorter than the timestamp tolerance: a nonce forgotten while its
    /// timestamp is still acceptable could be replayed.
    #[must_use]
    pub fn nonce_retention_secs(&self) -> u64 {
        self.nonce_ttl_secs.max(self.tolerance_secs)
    }
}

/// Client-side configuration: where to send requests and what to sign them with.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    base_url: String,
    credential: Credential,
}

impl ClientConfig {
    /// Create a client configuration. Trailing slashes on `base_url` are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use recall_core::{ClientConfig, Credential};
    ///
    /// let config = ClientConfig::new("https://api.example.com//", Credential::new("k", "s"));
    /// assert_eq!(config.base_url(), "https://api.example.com");
    /// assert_eq!(config.url_for("/ai/test"), "https://api.example.com/ai/test");
    /// ```
    pub fn new(base_url: impl Into<String>, credential: Credential) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            credential,
        }
    }

    /// Load from `AI_BASE_URL`, `AI_API_KEY` and `AI_API_SECRET`.
    pub fn from_env() -> RecallResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> RecallResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| RecallError::Config(format!("{name} must be set")))
        };
        Ok(Self::new(
            require("AI_BASE_URL")?,
            Credential::new(require("AI_API_KEY")?, require("AI_API_SECRET")?),
        ))
    }

    /// The normalised base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The signing credential.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Join `path` onto the base URL.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> RecallResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RecallError::InvalidEnvValue {
            name: name.to_owned(),
            value: value.to_owned(),
        })
}

fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
