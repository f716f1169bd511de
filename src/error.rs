//! Error types for the daily-log job.

use std::time::Duration;

/// Top-level error type for a job run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Ensure error: {0}")]
    Ensure(#[from] EnsureError),

    #[error("Upsert error: {0}")]
    Upsert(#[from] UpsertError),

    #[error("Daily log read failed: {0}")]
    Read(#[source] HttpError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from a single call against the remote data service.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Request to {url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Malformed JSON from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// A source connector could not fetch its upstream data.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("Connector {connector} fetch failed: {source}")]
    Fetch {
        connector: String,
        #[source]
        source: HttpError,
    },
}

impl ConnectorError {
    pub fn fetch(connector: &str, source: HttpError) -> Self {
        Self::Fetch {
            connector: connector.to_string(),
            source,
        }
    }
}

/// The daily-log record could not be ensured.
#[derive(Debug, thiserror::Error)]
pub enum EnsureError {
    #[error("Ensure request for {target_date} failed: {source}")]
    Request {
        target_date: String,
        #[source]
        source: HttpError,
    },

    #[error("Ensure response for {target_date} is missing page_id")]
    MissingPageId { target_date: String },
}

/// The merged summary could not be written to the store.
#[derive(Debug, thiserror::Error)]
pub enum UpsertError {
    #[error("Upsert request for {target_date} failed: {source}")]
    Request {
        target_date: String,
        #[source]
        source: HttpError,
    },

    #[error("Failed to serialize structured payload: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Mail delivery errors. Never propagated past the mailer.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Invalid address {address}: {reason}")]
    Address { address: String, reason: String },

    #[error("No recipients configured")]
    NoRecipients,

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP delivery failed: {0}")]
    Transport(String),
}

/// Result type alias for the job.
pub type Result<T> = std::result::Result<T, Error>;
