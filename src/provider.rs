//! DNS provider capability trait.
//!
//! A provider manages records in an authoritative zone. Any implementation of
//! `{create_record, delete_record}` is substitutable; adapters are chosen via
//! configuration, not inheritance.

use async_trait::async_trait;

use crate::error::Error;
use crate::types::{Record, RecordOptions};

/// Capability to create and delete managed DNS records.
///
/// Used by the DNS-01 challenge flow to publish and remove short-lived TXT
/// records.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Name identifying this provider implementation. Records tag the
    /// provider that created them; `delete_record` rejects foreign records.
    fn name(&self) -> &'static str;

    /// Create a DNS record in the zone owning `options.fqdn`.
    ///
    /// If a record with identical `(fqdn, type, value, ttl)` already exists
    /// it is returned as-is without a second write. If a record of the same
    /// `(fqdn, type)` exists with a different value the call fails with
    /// [`ProviderError::RecordAlreadyExists`](crate::error::ProviderError::RecordAlreadyExists)
    /// unless `options.append` is set, in which case a new record is created
    /// alongside it. SOA records are not provider-manageable and are rejected
    /// with [`Error::InvalidRecordType`].
    async fn create_record(&self, options: &RecordOptions) -> Result<Record, Error>;

    /// Delete a record previously created by this provider.
    ///
    /// Fails with
    /// [`ProviderError::ResourceNotFound`](crate::error::ProviderError::ResourceNotFound)
    /// when the record is already gone; callers performing cleanup tolerate
    /// that outcome.
    async fn delete_record(&self, record: &Record) -> Result<(), Error>;
}
