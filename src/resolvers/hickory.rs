//! Resolver adapter backed by hickory-resolver.

use async_trait::async_trait;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::{RData, RecordType as DnsRecordType};
use hickory_resolver::Resolver as DnsResolver;
use tracing::debug;

use crate::resolver::Resolver;
use crate::types::RecordType;

/// Live DNS resolver used for propagation checks.
pub struct HickoryResolver {
    resolver: DnsResolver<TokioConnectionProvider>,
}

impl HickoryResolver {
    /// Resolver with the default upstream configuration.
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default())
    }

    /// Resolver with a caller-supplied configuration, for advanced use cases
    /// such as querying specific nameservers.
    pub fn with_config(config: ResolverConfig) -> Self {
        let resolver =
            DnsResolver::builder_with_config(config, TokioConnectionProvider::default()).build();
        Self { resolver }
    }

    async fn lookup_values(&self, name: &str, record_type: DnsRecordType) -> Vec<String> {
        let lookup = match self.resolver.lookup(name, record_type).await {
            Ok(lookup) => lookup,
            Err(err) => {
                debug!(fqdn = %name, %record_type, "lookup failed: {err}");
                return Vec::new();
            }
        };
        lookup
            .iter()
            .filter_map(|rdata| match rdata {
                RData::A(address) => Some(vec![address.to_string()]),
                RData::CNAME(target) => {
                    Some(vec![target.0.to_utf8().trim_end_matches('.').to_string()])
                }
                RData::NS(nameserver) => Some(vec![nameserver.0.to_utf8()]),
                RData::SOA(soa) => Some(vec![soa.mname().to_utf8()]),
                RData::TXT(txt) => Some(
                    txt.iter()
                        .map(|segment| String::from_utf8_lossy(segment).to_string())
                        .collect(),
                ),
                _ => None,
            })
            .flatten()
            .collect()
    }

    async fn lookup_climbing(&self, fqdn: &str, record_type: DnsRecordType) -> Vec<String> {
        climb(fqdn, |name| self.lookup_values(name, record_type)).await
    }
}

/// Query `fqdn` via `lookup`, climbing the domain hierarchy one label at a
/// time until an answer is found or only the TLD remains. Used for NS and
/// SOA lookups, which may only be answered at an enclosing zone cut.
async fn climb<'a, F, Fut>(fqdn: &'a str, lookup: F) -> Vec<String>
where
    F: Fn(&'a str) -> Fut,
    Fut: std::future::Future<Output = Vec<String>>,
{
    let mut name = fqdn;
    while name.contains('.') {
        let values = lookup(name).await;
        if !values.is_empty() {
            return values;
        }
        match parent_name(name) {
            Some(rest) => name = rest,
            None => break,
        }
    }
    Vec::new()
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolver for HickoryResolver {
    async fn resolve(&self, fqdn: &str, record_type: RecordType) -> Vec<String> {
        match record_type {
            RecordType::A => self.lookup_values(fqdn, DnsRecordType::A).await,
            RecordType::CNAME => self.lookup_values(fqdn, DnsRecordType::CNAME).await,
            RecordType::TXT => self.lookup_values(fqdn, DnsRecordType::TXT).await,
            RecordType::NS => self.lookup_climbing(fqdn, DnsRecordType::NS).await,
            RecordType::SOA => self.lookup_climbing(fqdn, DnsRecordType::SOA).await,
        }
    }
}

/// Strip the leftmost label of a domain name.
fn parent_name(name: &str) -> Option<&str> {
    name.split_once('.').map(|(_, rest)| rest)
}
