//! Shared mock collaborators for challenge flow tests.
//!
//! The orchestrator consumes the Provider / Resolver / AcmeOrders traits,
//! so the whole flow can be exercised without a DNS zone or a CA. The mock
//! provider implements the same already-exists semantics as a real adapter;
//! the mock resolver can delay a value's visibility to simulate propagation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;

use acme_dns01::acme::{AcmeOrders, Dns01Token, PendingOrder};
use acme_dns01::error::{Error, ProviderError};
use acme_dns01::provider::Provider;
use acme_dns01::resolver::Resolver;
use acme_dns01::types::{root_domain, Record, RecordOptions, RecordType};

pub const MOCK_PROVIDER: &str = "mock";
pub const MOCK_PEM: &str = "-----BEGIN CERTIFICATE-----\nmock chain\n-----END CERTIFICATE-----\n";

/// Install the test subscriber once, so `RUST_LOG=debug cargo test` shows
/// the flow's tracing on failures.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// --- MockProvider ---

/// In-memory zone with the provider contract's creation semantics.
#[derive(Default)]
pub struct MockProvider {
    zone: Mutex<Vec<Record>>,
    /// Every record handed out by `create_record`.
    pub created: Mutex<Vec<Record>>,
    /// Resource ids of every `delete_record` attempt, in call order.
    pub delete_calls: Mutex<Vec<String>>,
    /// Number of actual zone writes (idempotent reuse does not count).
    pub writes: AtomicUsize,
    fail_create: Mutex<HashMap<String, ProviderError>>,
    fail_delete: AtomicBool,
    next_id: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next creation for `fqdn` fail with the given error.
    pub fn fail_create(&self, fqdn: &str, error: ProviderError) {
        self.fail_create
            .lock()
            .unwrap()
            .insert(fqdn.to_string(), error);
    }

    /// Make every deletion fail as if the record were already gone.
    pub fn fail_deletes(&self) {
        self.fail_delete.store(true, Ordering::SeqCst);
    }

    pub fn zone_len(&self) -> usize {
        self.zone.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &'static str {
        MOCK_PROVIDER
    }

    async fn create_record(&self, options: &RecordOptions) -> Result<Record, Error> {
        if options.record_type == RecordType::SOA {
            return Err(Error::InvalidRecordType(RecordType::SOA));
        }
        if let Some(error) = self.fail_create.lock().unwrap().remove(&options.fqdn) {
            return Err(error.into());
        }

        let mut zone = self.zone.lock().unwrap();
        let existing: Vec<&Record> = zone
            .iter()
            .filter(|record| {
                record.fqdn == options.fqdn && record.record_type == options.record_type
            })
            .collect();
        if let Some(exact) = existing.iter().find(|record| {
            record.data == options.record_value && record.ttl == Some(options.record_ttl)
        }) {
            let record = (*exact).clone();
            self.created.lock().unwrap().push(record.clone());
            return Ok(record);
        }
        if !existing.is_empty() && !options.append {
            return Err(ProviderError::RecordAlreadyExists {
                fqdn: options.fqdn.clone(),
                record_type: options.record_type,
            }
            .into());
        }

        let domain = root_domain(&options.fqdn)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let record = Record {
            domain,
            record_type: options.record_type,
            fqdn: options.fqdn.clone(),
            name: options.fqdn.clone(),
            data: options.record_value.clone(),
            ttl: Some(options.record_ttl),
            resource_id: id.to_string(),
            provider: MOCK_PROVIDER,
        };
        zone.push(record.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn delete_record(&self, record: &Record) -> Result<(), Error> {
        self.delete_calls
            .lock()
            .unwrap()
            .push(record.resource_id.clone());
        if record.provider != MOCK_PROVIDER {
            return Err(Error::InvalidOptions(
                "record was not created by the mock provider".into(),
            ));
        }
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(ProviderError::ResourceNotFound.into());
        }
        let mut zone = self.zone.lock().unwrap();
        let before = zone.len();
        zone.retain(|existing| existing.resource_id != record.resource_id);
        if zone.len() == before {
            return Err(ProviderError::ResourceNotFound.into());
        }
        Ok(())
    }
}

// --- MockResolver ---

/// Resolver returning canned TXT answers, optionally only after a number of
/// queries to simulate slow propagation.
#[derive(Default)]
pub struct MockResolver {
    answers: Mutex<HashMap<String, Vec<String>>>,
    available_after: Mutex<HashMap<String, usize>>,
    query_counts: Mutex<HashMap<String, usize>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_txt(&self, fqdn: &str, value: &str) {
        self.answers
            .lock()
            .unwrap()
            .entry(fqdn.to_string())
            .or_default()
            .push(value.to_string());
    }

    /// Return empty answers for the first `queries` lookups of `fqdn`.
    pub fn available_after(&self, fqdn: &str, queries: usize) {
        self.available_after
            .lock()
            .unwrap()
            .insert(fqdn.to_string(), queries);
    }

    pub fn queries_for(&self, fqdn: &str) -> usize {
        self.query_counts
            .lock()
            .unwrap()
            .get(fqdn)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn resolve(&self, fqdn: &str, _record_type: RecordType) -> Vec<String> {
        let count = {
            let mut counts = self.query_counts.lock().unwrap();
            let count = counts.entry(fqdn.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let delay = self
            .available_after
            .lock()
            .unwrap()
            .get(fqdn)
            .copied()
            .unwrap_or(0);
        if count <= delay {
            return Vec::new();
        }
        self.answers
            .lock()
            .unwrap()
            .get(fqdn)
            .cloned()
            .unwrap_or_default()
    }
}

// --- MockAcme ---

#[derive(Clone)]
enum MockFinalize {
    Issue,
    Reject(String),
}

/// ACME collaborator producing one DNS-01 token per configured domain.
pub struct MockAcme {
    tokens: Vec<Dns01Token>,
    finalize: MockFinalize,
    /// Challenge URLs answered across all orders.
    pub answered: Arc<Mutex<Vec<String>>>,
}

impl MockAcme {
    /// One DNS-01 challenge per `(identifier, txt_value)` pair.
    pub fn new(tokens: &[(&str, &str)]) -> Self {
        let tokens = tokens
            .iter()
            .enumerate()
            .map(|(index, (identifier, value))| Dns01Token {
                identifier: identifier.to_string(),
                challenge_url: format!("https://acme.test/challenge/{index}"),
                txt_value: value.to_string(),
            })
            .collect();
        Self {
            tokens,
            finalize: MockFinalize::Issue,
            answered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A CA that offers no DNS-01 challenges at all.
    pub fn without_dns01() -> Self {
        Self::new(&[])
    }

    /// Make finalization fail as if the CA rejected the responses.
    pub fn rejecting(mut self, message: &str) -> Self {
        self.finalize = MockFinalize::Reject(message.to_string());
        self
    }
}

#[async_trait]
impl AcmeOrders for MockAcme {
    fn directory(&self) -> &str {
        "https://acme.test/directory"
    }

    async fn new_order(&self, _domains: &[String]) -> Result<Box<dyn PendingOrder>, Error> {
        Ok(Box::new(MockOrder {
            tokens: self.tokens.clone(),
            finalize: self.finalize.clone(),
            answered: Arc::clone(&self.answered),
        }))
    }
}

struct MockOrder {
    tokens: Vec<Dns01Token>,
    finalize: MockFinalize,
    answered: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PendingOrder for MockOrder {
    fn dns01_tokens(&self) -> &[Dns01Token] {
        &self.tokens
    }

    async fn answer_challenge(&mut self, challenge_url: &str) -> Result<(), Error> {
        self.answered.lock().unwrap().push(challenge_url.to_string());
        Ok(())
    }

    async fn poll_and_finalize(
        &mut self,
        _csr_der: &[u8],
        _deadline: tokio::time::Instant,
    ) -> Result<String, Error> {
        match &self.finalize {
            MockFinalize::Issue => Ok(MOCK_PEM.to_string()),
            MockFinalize::Reject(message) => Err(Error::OrderFailed(message.clone())),
        }
    }
}
