//! High-level entry points wiring the account manager, provider and
//! resolver into a single certificate request.

use std::path::Path;
use std::time::Duration;

use crate::acme::AccountManager;
use crate::challenge::{run_challenge, IssuedCertificate};
use crate::error::Error;
use crate::keys::KeyType;
use crate::provider::Provider;
use crate::resolver::Resolver;

/// Register a new ACME account and persist it to `path` as JSON.
pub async fn create_account_file(
    path: impl AsRef<Path>,
    email: &str,
    directory: &str,
) -> Result<(), Error> {
    AccountManager::create_to_file(path, email, directory).await?;
    Ok(())
}

/// Request a certificate for `domains` using a previously persisted account.
///
/// Returns the PEM-encoded private key and certificate chain.
pub async fn request_certificate(
    domains: &[String],
    account_file: impl AsRef<Path>,
    provider: &dyn Provider,
    resolver: &dyn Resolver,
    key_type: KeyType,
    timeout: Duration,
) -> Result<IssuedCertificate, Error> {
    let manager = AccountManager::load_from_file(account_file).await?;
    run_challenge(domains, &manager, provider, resolver, key_type, timeout).await
}
