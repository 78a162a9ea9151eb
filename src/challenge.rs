//! DNS-01 challenge orchestration.
//!
//! Coordinates a DNS provider's write API and the live DNS resolution graph
//! under one deadline: derive the verification tokens from a fresh ACME
//! order, publish one TXT record per domain, poll live DNS until every
//! record is observably propagated, submit the challenge responses, and
//! finalize the order. Every record created by a run is deleted at the end
//! of that run, whichever way it exits.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::acme::{AcmeOrders, PendingOrder};
use crate::error::Error;
use crate::keys::{self, KeyType};
use crate::provider::Provider;
use crate::resolver::Resolver;
use crate::types::{Record, RecordOptions, VerificationToken};

/// Default window for observing a published TXT record in live DNS.
pub const DEFAULT_PROPAGATION_TIMEOUT: Duration = Duration::from_secs(120);
/// Default interval between resolver queries while waiting for propagation.
pub const DEFAULT_QUERY_INTERVAL: Duration = Duration::from_secs(2);

/// Outcome of a successful challenge run.
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    /// PEM-encoded private key backing the certificate.
    pub private_key_pem: String,
    /// PEM-encoded certificate chain issued by the CA.
    pub fullchain_pem: String,
}

/// One DNS-01 certificate issuance run for a set of domains.
///
/// Record creation and propagation polling are sequential by design: record
/// N's wait does not start until record N-1 is confirmed. This bounds
/// worst-case latency at `domains × propagation_timeout` but keeps progress
/// reasoning simple; the contract does not require concurrent polling.
pub struct Dns01Challenge<'a> {
    domains: &'a [String],
    acme: &'a dyn AcmeOrders,
    provider: &'a dyn Provider,
    resolver: &'a dyn Resolver,
    key_type: KeyType,
    propagation_timeout: Duration,
    query_interval: Duration,
}

impl<'a> Dns01Challenge<'a> {
    pub fn new(
        domains: &'a [String],
        acme: &'a dyn AcmeOrders,
        provider: &'a dyn Provider,
        resolver: &'a dyn Resolver,
    ) -> Self {
        Self {
            domains,
            acme,
            provider,
            resolver,
            key_type: KeyType::default(),
            propagation_timeout: DEFAULT_PROPAGATION_TIMEOUT,
            query_interval: DEFAULT_QUERY_INTERVAL,
        }
    }

    pub fn key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn propagation_timeout(mut self, timeout: Duration) -> Self {
        self.propagation_timeout = timeout;
        self
    }

    pub fn query_interval(mut self, interval: Duration) -> Self {
        self.query_interval = interval;
        self
    }

    /// Run the challenge to completion, bounded by `timeout`.
    ///
    /// Cleanup of created records is unconditional: it runs after success,
    /// propagation timeout, and every error in between. Deletion failures
    /// are logged and never override the run's primary outcome.
    pub async fn run(&self, timeout: Duration) -> Result<IssuedCertificate, Error> {
        if self.domains.is_empty() {
            return Err(Error::InvalidOptions("no domains requested".into()));
        }

        let private_key_pem = keys::generate_private_key(self.key_type)?;
        let csr = keys::make_csr(&private_key_pem, self.domains)?;

        debug!(domains = ?self.domains, "submitting new ACME order");
        let mut order = self.acme.new_order(self.domains).await?;

        let tokens = order.dns01_tokens();
        if tokens.is_empty() {
            return Err(Error::Dns01Unsupported {
                directory: self.acme.directory().to_string(),
            });
        }
        let verifications: Vec<VerificationToken> = tokens
            .iter()
            .map(|token| VerificationToken::for_domain(&token.identifier, &token.txt_value))
            .collect();
        let challenge_urls: Vec<String> = tokens
            .iter()
            .map(|token| token.challenge_url.clone())
            .collect();
        debug!(count = verifications.len(), "extracted DNS-01 verification tokens");

        let deadline = Instant::now() + timeout;
        let mut created: Vec<Record> = Vec::new();
        let result = self
            .validate(order.as_mut(), &verifications, &challenge_urls, &csr, deadline, &mut created)
            .await;

        // Unconditional cleanup, reverse creation order, one attempt per
        // record. A failed deletion must not prevent the remaining ones.
        for record in created.iter().rev() {
            if let Err(err) = self.provider.delete_record(record).await {
                warn!(fqdn = %record.fqdn, "failed to delete challenge record: {err}");
            }
        }

        let fullchain_pem = result?;
        Ok(IssuedCertificate {
            private_key_pem,
            fullchain_pem,
        })
    }

    /// Publish the challenge records, wait for propagation, answer the
    /// challenges and finalize the order. Records are pushed onto `created`
    /// as soon as each creation succeeds so a failure partway through still
    /// cleans up everything created so far.
    async fn validate(
        &self,
        order: &mut dyn PendingOrder,
        verifications: &[VerificationToken],
        challenge_urls: &[String],
        csr: &[u8],
        deadline: Instant,
        created: &mut Vec<Record>,
    ) -> Result<String, Error> {
        for token in verifications {
            info!(fqdn = %token.dns_name, "creating challenge TXT record");
            let mut options = RecordOptions::txt(&token.dns_name, &token.txt_value);
            options.propagation_timeout = self.propagation_timeout;
            options.query_interval = self.query_interval;
            let record = self.provider.create_record(&options).await?;
            created.push(record);
        }

        let propagation_deadline = deadline.min(Instant::now() + self.propagation_timeout);
        for record in created.iter() {
            self.wait_for_propagation(record, propagation_deadline).await?;
        }

        for challenge_url in challenge_urls {
            debug!(%challenge_url, "answering challenge");
            order.answer_challenge(challenge_url).await?;
        }

        order.poll_and_finalize(csr, deadline).await
    }

    /// Poll live DNS until the record's exact value appears or the deadline
    /// passes. Membership is exact string equality, never substring
    /// matching.
    async fn wait_for_propagation(&self, record: &Record, deadline: Instant) -> Result<(), Error> {
        loop {
            debug!(fqdn = %record.fqdn, "querying for challenge record");
            let values = self.resolver.resolve(&record.fqdn, record.record_type).await;
            if values.iter().any(|value| value == &record.data) {
                info!(fqdn = %record.fqdn, "challenge record propagated");
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::PropagationTimeout {
                    fqdn: record.fqdn.clone(),
                });
            }
            sleep(self.query_interval).await;
        }
    }
}

/// Run a DNS-01 challenge for `domains` and return the issued certificate.
///
/// Blocks (asynchronously) for the duration of the run; `timeout` bounds
/// both propagation waits and the final ACME poll/finalize call.
pub async fn run_challenge(
    domains: &[String],
    acme: &dyn AcmeOrders,
    provider: &dyn Provider,
    resolver: &dyn Resolver,
    key_type: KeyType,
    timeout: Duration,
) -> Result<IssuedCertificate, Error> {
    Dns01Challenge::new(domains, acme, provider, resolver)
        .key_type(key_type)
        .run(timeout)
        .await
}
