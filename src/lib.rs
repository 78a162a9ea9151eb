//! DNS-01 validated ACME certificate issuance.
//!
//! Proves control of a domain by publishing a short-lived DNS TXT record and
//! waiting for the certificate authority to observe it. The challenge
//! orchestrator coordinates a pluggable DNS provider and a live DNS resolver
//! under a caller-supplied deadline, with guaranteed record cleanup on every
//! exit path.
//!
//! ## Architecture
//!
//! - [`provider::Provider`] / [`resolver::Resolver`]: capability traits for
//!   the DNS write API and the live resolution graph
//! - [`providers::DigitalOceanProvider`] / [`resolvers::HickoryResolver`]:
//!   concrete adapters
//! - [`acme::AccountManager`]: ACME account handling over instant-acme
//! - [`challenge::Dns01Challenge`]: the orchestrator,
//!   create → poll-propagation → validate → delete
//! - [`api`]: thin entry points (`request_certificate`, `create_account_file`)

pub mod acme;
pub mod api;
pub mod challenge;
pub mod error;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod resolver;
pub mod resolvers;
pub mod types;

pub use acme::{AccountManager, AcmeOrders, Dns01Token, PendingOrder, LETS_ENCRYPT_STAGING};
pub use api::{create_account_file, request_certificate};
pub use challenge::{run_challenge, Dns01Challenge, IssuedCertificate};
pub use error::{Error, ProviderError};
pub use keys::KeyType;
pub use provider::Provider;
pub use providers::DigitalOceanProvider;
pub use resolver::Resolver;
pub use resolvers::HickoryResolver;
pub use types::{Record, RecordOptions, RecordType, VerificationToken};
