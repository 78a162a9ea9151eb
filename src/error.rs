//! Error types for acme-dns01.
//!
//! Provider adapters translate transport failures into [`ProviderError`] at
//! the API boundary, so the challenge orchestrator only ever observes typed
//! errors. The retry policy is carried by the error kind itself.

use std::time::Duration;
use thiserror::Error;

use crate::types::RecordType;

/// Errors raised at the DNS provider boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The record or zone does not exist (HTTP 404). Tolerated as a
    /// non-fatal outcome during cleanup.
    #[error("resource not found")]
    ResourceNotFound,

    /// The provider rejected the credentials (HTTP 401/403).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The provider's rate limit was hit (HTTP 429). Safe to retry once
    /// `retry_after` has elapsed.
    #[error("rate limit exceeded, retry in {}s", retry_after.as_secs())]
    RateLimitExceeded { retry_after: Duration },

    /// The provider failed internally (HTTP 500). Safe to retry with backoff.
    #[error("provider server error: {0}")]
    ServerError(String),

    /// The provider rejected the request payload (HTTP 400/422).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A record with the same name and type exists with a different value.
    #[error("a {record_type} record for {fqdn} already exists with a different value")]
    RecordAlreadyExists {
        fqdn: String,
        record_type: RecordType,
    },

    /// Any other non-2xx response.
    #[error("unexpected provider response ({status}): {message}")]
    Api { status: u16, message: String },

    /// The request never reached the provider.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    /// Whether the failed request may be retried at all.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::ServerError(_) | ProviderError::RateLimitExceeded { .. }
        )
    }

    /// Earliest point at which a retry may succeed. `None` for retryable
    /// errors means "retry with backoff at the caller's discretion".
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ProviderError::RateLimitExceeded { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors surfaced by the challenge flow.
#[derive(Debug, Error)]
pub enum Error {
    /// The record type cannot be managed through a provider (SOA).
    #[error("cannot manage {0} records through a DNS provider")]
    InvalidRecordType(RecordType),

    /// The domain name is empty or has no extension.
    #[error("invalid domain name: {0}")]
    InvalidDomainName(String),

    /// Caller-supplied options are inconsistent.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// A typed provider failure, see [`ProviderError`].
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A published TXT record was not observable in live DNS before the
    /// deadline. Cleanup still runs.
    #[error("TXT record for {fqdn} did not propagate before the deadline")]
    PropagationTimeout { fqdn: String },

    /// The CA offered no DNS-01 challenge for the requested domains.
    #[error("ACME server at '{directory}' does not support the DNS-01 challenge")]
    Dns01Unsupported { directory: String },

    /// The ACME order was rejected or became invalid.
    #[error("ACME order failed: {0}")]
    OrderFailed(String),

    /// The ACME order did not reach a terminal state before the deadline.
    #[error("ACME order did not complete before the deadline")]
    OrderTimeout,

    /// Protocol-level ACME client failure.
    #[error("ACME client error: {0}")]
    Acme(#[from] instant_acme::Error),

    /// Key or CSR generation failure.
    #[error("key generation error: {0}")]
    Key(#[from] rcgen::Error),

    /// Account file I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Account file (de)serialization failure.
    #[error("invalid account file: {0}")]
    AccountFile(#[from] serde_json::Error),
}
