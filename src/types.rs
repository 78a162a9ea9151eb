//! Core DNS record types shared by providers, resolvers and the challenge flow.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Error;

/// DNS label prepended to a domain to form its challenge record name.
pub const DNS_LABEL: &str = "_acme-challenge";

/// Record types supported for queries.
///
/// Only `TXT` is used by the challenge flow; the other types are resolver
/// query types reused by provider adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    CNAME,
    NS,
    TXT,
    SOA,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::NS => write!(f, "NS"),
            RecordType::TXT => write!(f, "TXT"),
            RecordType::SOA => write!(f, "SOA"),
        }
    }
}

/// A DNS record as known to a provider.
///
/// Immutable once created: `data` is exactly the value that was published,
/// and `resource_id` is the provider-internal identifier used for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Root domain of the zone the record lives in.
    pub domain: String,
    /// Type of the record (A, CNAME, TXT, ...).
    pub record_type: RecordType,
    /// Fully qualified domain name defined by the record.
    pub fqdn: String,
    /// Provider-side record name (`@` for the apex).
    pub name: String,
    /// Record value, e.g. an IPv4 address for A or a string for TXT.
    pub data: String,
    /// Time to live in seconds, if the provider reported one.
    pub ttl: Option<u32>,
    /// Provider-internal identifier captured at creation time.
    pub resource_id: String,
    /// Name of the provider implementation that created the record.
    /// Providers refuse to delete records carrying another provider's tag.
    pub provider: &'static str,
}

/// Options for creating a DNS record.
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub fqdn: String,
    pub record_type: RecordType,
    pub record_value: String,
    /// TTL in seconds. Providers reject values below 30.
    pub record_ttl: u32,
    /// When true, a pre-existing record with a different value is tolerated
    /// and a new record is created alongside it.
    pub append: bool,
    /// How long to wait for the record to become visible in live DNS.
    pub propagation_timeout: Duration,
    /// Interval between resolver queries while waiting for propagation.
    pub query_interval: Duration,
}

impl RecordOptions {
    /// Options for a short-lived challenge TXT record.
    pub fn txt(fqdn: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            fqdn: fqdn.into(),
            record_type: RecordType::TXT,
            record_value: value.into(),
            record_ttl: 30,
            append: true,
            propagation_timeout: Duration::from_secs(120),
            query_interval: Duration::from_secs(2),
        }
    }
}

/// A DNS-01 verification token: the challenge record name paired with the
/// TXT value the CA expects to observe there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationToken {
    /// `_acme-challenge.<base domain>`.
    pub dns_name: String,
    /// Expected TXT value, compared by exact string membership.
    pub txt_value: String,
}

impl VerificationToken {
    /// Derive the verification token for a domain. Wildcard domains validate
    /// their base domain, so a leading `*.` is stripped before prefixing.
    pub fn for_domain(domain: &str, txt_value: impl Into<String>) -> Self {
        let base = domain.strip_prefix("*.").unwrap_or(domain);
        Self {
            dns_name: format!("{DNS_LABEL}.{base}"),
            txt_value: txt_value.into(),
        }
    }
}

/// Root domain of an FQDN, i.e. its last two labels.
pub fn root_domain(fqdn: &str) -> Result<String, Error> {
    if fqdn.is_empty() {
        return Err(Error::InvalidDomainName("domain name is empty".into()));
    }
    let labels: Vec<&str> = fqdn.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
        return Err(Error::InvalidDomainName(format!(
            "'{fqdn}' is not a fully qualified domain name"
        )));
    }
    Ok(labels[labels.len() - 2..].join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_serializes_as_provider_wire_string() {
        assert_eq!(serde_json::to_string(&RecordType::TXT).unwrap(), "\"TXT\"");
        let parsed: RecordType = serde_json::from_str("\"CNAME\"").unwrap();
        assert_eq!(parsed, RecordType::CNAME);
        assert_eq!(RecordType::SOA.to_string(), "SOA");
    }

    #[test]
    fn txt_options_carry_challenge_defaults() {
        let options = RecordOptions::txt("_acme-challenge.example.com", "token");
        assert_eq!(options.record_type, RecordType::TXT);
        assert_eq!(options.record_ttl, 30);
        assert!(options.append);
        assert_eq!(options.propagation_timeout, Duration::from_secs(120));
        assert_eq!(options.query_interval, Duration::from_secs(2));
    }

    #[test]
    fn verification_token_prefixes_challenge_label() {
        let token = VerificationToken::for_domain("a.example.com", "tok");
        assert_eq!(token.dns_name, "_acme-challenge.a.example.com");
    }

    #[test]
    fn verification_token_strips_wildcard_marker() {
        let token = VerificationToken::for_domain("*.example.com", "tok");
        assert_eq!(token.dns_name, "_acme-challenge.example.com");
    }

    #[test]
    fn root_domain_keeps_last_two_labels() {
        assert_eq!(root_domain("a.b.example.com").unwrap(), "example.com");
        assert_eq!(root_domain("example.com").unwrap(), "example.com");
    }

    #[test]
    fn root_domain_rejects_invalid_names() {
        assert!(matches!(root_domain(""), Err(Error::InvalidDomainName(_))));
        assert!(matches!(
            root_domain("localhost"),
            Err(Error::InvalidDomainName(_))
        ));
        assert!(matches!(
            root_domain("example."),
            Err(Error::InvalidDomainName(_))
        ));
    }
}
