//! DNS resolver capability trait.

use async_trait::async_trait;

use crate::types::RecordType;

/// Capability to query live DNS and return record values for an FQDN.
///
/// Propagation polling treats "value absent" and "query failed" identically,
/// so `resolve` returns an empty sequence on any resolution failure (timeout,
/// NXDOMAIN, servfail) instead of propagating an error.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a DNS query for the given FQDN and record type.
    ///
    /// - `A`: IPv4 addresses associated with the FQDN
    /// - `CNAME`: canonical targets, without trailing dot
    /// - `NS`: nameservers serving the FQDN, climbing the hierarchy until an
    ///   answer is found
    /// - `TXT`: decoded TXT strings; a record carrying multiple strings
    ///   contributes each of them
    /// - `SOA`: primary nameservers from the closest enclosing zone's SOA
    async fn resolve(&self, fqdn: &str, record_type: RecordType) -> Vec<String>;
}
