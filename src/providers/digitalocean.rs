//! DigitalOcean DNS provider adapter.
//!
//! Wraps the DigitalOcean v2 domains API and translates its status codes
//! into the provider error taxonomy.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{Error, ProviderError};
use crate::provider::Provider;
use crate::types::{root_domain, Record, RecordOptions, RecordType};

const DO_API_BASE: &str = "https://api.digitalocean.com/v2/domains";
const PROVIDER_NAME: &str = "digitalocean";

/// Environment variable holding the API token value.
pub const TOKEN_ENV_VAR: &str = "DO_AUTH_TOKEN";
/// Environment variable naming a file whose content is the API token.
pub const TOKEN_FILE_ENV_VAR: &str = "DO_AUTH_TOKEN_FILE";
const DEFAULT_TOKEN_FILE: &str = ".dotoken";

// ============================================================
// API Wire Types
// ============================================================

#[derive(Debug, Deserialize)]
struct DomainRecordsResponse {
    #[serde(default)]
    domain_records: Vec<DomainRecord>,
}

#[derive(Debug, Deserialize)]
struct DomainRecordResponse {
    domain_record: DomainRecord,
}

#[derive(Debug, Deserialize)]
struct DomainRecord {
    id: u64,
    #[serde(rename = "type")]
    record_type: RecordType,
    name: String,
    data: String,
    ttl: Option<u32>,
}

impl DomainRecord {
    fn into_record(self, fqdn: &str, domain: &str) -> Record {
        Record {
            domain: domain.to_string(),
            record_type: self.record_type,
            fqdn: fqdn.to_string(),
            name: self.name,
            data: self.data,
            ttl: self.ttl,
            resource_id: self.id.to_string(),
            provider: PROVIDER_NAME,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateRecordRequest<'a> {
    #[serde(rename = "type")]
    record_type: RecordType,
    name: &'a str,
    data: &'a str,
    ttl: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

// ============================================================
// Error Mapping
// ============================================================

/// Map a non-success status to the provider error taxonomy.
///
/// `ratelimit_reset` is the epoch second at which the provider's rate-limit
/// window resets, taken from the `ratelimit-reset` response header.
fn map_error(status: StatusCode, ratelimit_reset: Option<i64>, message: String) -> ProviderError {
    match status {
        StatusCode::NOT_FOUND => ProviderError::ResourceNotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => {
            let now = chrono::Utc::now().timestamp();
            let seconds = ratelimit_reset.map(|reset| (reset - now).max(0)).unwrap_or(0);
            ProviderError::RateLimitExceeded {
                retry_after: Duration::from_secs(seconds as u64),
            }
        }
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ProviderError::InvalidRequest(message)
        }
        StatusCode::INTERNAL_SERVER_ERROR => ProviderError::ServerError(message),
        status => ProviderError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Consume a response, raising a typed error for non-2xx statuses.
async fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let ratelimit_reset = response
        .headers()
        .get("ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i64>().ok());
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|parsed| parsed.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or(body);
    Err(map_error(status, ratelimit_reset, message))
}

// ============================================================
// Record Semantics
// ============================================================

/// Provider-side record name for an FQDN: the apex marker for the root
/// domain itself, otherwise the FQDN with the root-domain suffix stripped.
fn record_name(fqdn: &str, domain: &str) -> String {
    if fqdn == domain {
        "@".to_string()
    } else {
        fqdn.strip_suffix(&format!(".{domain}"))
            .unwrap_or(fqdn)
            .to_string()
    }
}

/// Decide whether an existing record satisfies the creation request.
///
/// Returns the first record matching `(value, ttl)` exactly, `None` when no
/// record of this `(fqdn, type)` exists at all, and `RecordAlreadyExists`
/// when records exist but none matches exactly.
fn find_existing(records: &[Record], options: &RecordOptions) -> Result<Option<Record>, ProviderError> {
    if let Some(exact) = records
        .iter()
        .find(|record| record.data == options.record_value && record.ttl == Some(options.record_ttl))
    {
        return Ok(Some(exact.clone()));
    }
    if records.is_empty() {
        return Ok(None);
    }
    Err(ProviderError::RecordAlreadyExists {
        fqdn: options.fqdn.clone(),
        record_type: options.record_type,
    })
}

// ============================================================
// Provider Implementation
// ============================================================

/// DNS provider backed by the DigitalOcean v2 API.
pub struct DigitalOceanProvider {
    client: Client,
    token: String,
}

impl DigitalOceanProvider {
    /// Create a provider with an explicit API token.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ProviderError::from)?;
        Ok(Self {
            client,
            token: token.into(),
        })
    }

    /// Create a provider reading the token from a plain-text file.
    pub fn from_token_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let token = std::fs::read_to_string(path).map_err(|err| {
            Error::InvalidOptions(format!(
                "failed to read token file '{}': {err}",
                path.display()
            ))
        })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::InvalidOptions(format!(
                "token file '{}' is empty",
                path.display()
            )));
        }
        Self::new(token)
    }

    /// Create a provider sourcing the token from the environment:
    /// `DO_AUTH_TOKEN` as a value, or the file named by `DO_AUTH_TOKEN_FILE`
    /// (default `~/.dotoken`).
    pub fn from_env() -> Result<Self, Error> {
        if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
            let token = token.trim().to_string();
            if !token.is_empty() {
                return Self::new(token);
            }
        }
        let token_file = std::env::var(TOKEN_FILE_ENV_VAR).map(PathBuf::from).or_else(|_| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(DEFAULT_TOKEN_FILE))
                .map_err(|_| {
                    Error::InvalidOptions(format!(
                        "either {TOKEN_ENV_VAR} or {TOKEN_FILE_ENV_VAR} must be set"
                    ))
                })
        })?;
        Self::from_token_file(token_file)
    }

    fn check_record_type(record_type: RecordType) -> Result<RecordType, Error> {
        if record_type == RecordType::SOA {
            return Err(Error::InvalidRecordType(RecordType::SOA));
        }
        Ok(record_type)
    }

    /// List managed records for an FQDN and record type.
    async fn records(&self, fqdn: &str, record_type: RecordType) -> Result<Vec<Record>, Error> {
        let record_type = Self::check_record_type(record_type)?;
        let domain = root_domain(fqdn)?;
        let url = format!("{DO_API_BASE}/{domain}/records");
        let type_param = record_type.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("name", fqdn), ("type", type_param.as_str())])
            .send()
            .await
            .map_err(ProviderError::from)?;
        let response = check_status(response).await?;
        let body: DomainRecordsResponse = response.json().await.map_err(ProviderError::from)?;

        Ok(body
            .domain_records
            .into_iter()
            .map(|item| item.into_record(fqdn, &domain))
            .collect())
    }
}

#[async_trait]
impl Provider for DigitalOceanProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn create_record(&self, options: &RecordOptions) -> Result<Record, Error> {
        let record_type = Self::check_record_type(options.record_type)?;
        let existing = self.records(&options.fqdn, record_type).await?;

        match find_existing(&existing, options) {
            Ok(Some(record)) => {
                debug!(fqdn = %options.fqdn, id = %record.resource_id, "record already exists, reusing");
                return Ok(record);
            }
            Ok(None) => {}
            Err(err) if options.append => {
                debug!(fqdn = %options.fqdn, "appending alongside existing record: {err}");
            }
            Err(err) => return Err(err.into()),
        }

        let domain = root_domain(&options.fqdn)?;
        let name = record_name(&options.fqdn, &domain);
        let url = format!("{DO_API_BASE}/{domain}/records");

        info!(fqdn = %options.fqdn, %record_type, "creating DNS record");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&CreateRecordRequest {
                record_type,
                name: &name,
                data: &options.record_value,
                ttl: options.record_ttl,
            })
            .send()
            .await
            .map_err(ProviderError::from)?;
        let response = check_status(response).await?;
        let body: DomainRecordResponse = response.json().await.map_err(ProviderError::from)?;

        Ok(body.domain_record.into_record(&options.fqdn, &domain))
    }

    async fn delete_record(&self, record: &Record) -> Result<(), Error> {
        if record.provider != PROVIDER_NAME {
            return Err(Error::InvalidOptions(format!(
                "record {} was not created by the {PROVIDER_NAME} provider",
                record.fqdn
            )));
        }

        let url = format!("{DO_API_BASE}/{}/records/{}", record.domain, record.resource_id);

        info!(fqdn = %record.fqdn, id = %record.resource_id, "deleting DNS record");
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(ProviderError::from)?;
        check_status(response).await?;
        Ok(())
    }
}
