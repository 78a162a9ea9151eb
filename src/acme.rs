//! ACME collaborator contracts and the instant-acme backed account manager.
//!
//! The challenge orchestrator consumes the [`AcmeOrders`] / [`PendingOrder`]
//! traits only; [`AccountManager`] is the production implementation, wiring
//! account persistence and the ACME wire protocol through instant-acme.

use async_trait::async_trait;
use instant_acme::{
    Account, AccountCredentials, AuthorizationStatus, ChallengeType, Identifier, NewAccount,
    NewOrder, Order, OrderStatus,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::error::Error;

/// Let's Encrypt staging directory, suitable for integration testing against
/// a real CA without hitting production rate limits.
pub const LETS_ENCRYPT_STAGING: &str = "https://acme-staging-v02.api.letsencrypt.org/directory";

/// One DNS-01 challenge extracted from an order's authorizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dns01Token {
    /// Domain the authorization covers, without any wildcard marker.
    pub identifier: String,
    /// Challenge URL used to submit the response.
    pub challenge_url: String,
    /// TXT value the CA expects to observe, i.e. the base64url SHA-256
    /// digest of the key authorization.
    pub txt_value: String,
}

/// Capability to open certificate orders against an ACME directory.
#[async_trait]
pub trait AcmeOrders: Send + Sync {
    /// URL of the ACME directory this collaborator talks to.
    fn directory(&self) -> &str;

    /// Submit a new order for the given domains.
    async fn new_order(&self, domains: &[String]) -> Result<Box<dyn PendingOrder>, Error>;
}

/// An order awaiting challenge validation and finalization.
#[async_trait]
pub trait PendingOrder: Send {
    /// DNS-01 challenges pending for this order, one per authorization that
    /// offers the DNS-01 type. Empty when the CA offers none.
    fn dns01_tokens(&self) -> &[Dns01Token];

    /// Tell the CA the challenge record is in place and ready to validate.
    async fn answer_challenge(&mut self, challenge_url: &str) -> Result<(), Error>;

    /// Poll the order until it is ready, finalize it with the CSR and fetch
    /// the issued certificate chain as PEM. Bounded by `deadline`.
    async fn poll_and_finalize(&mut self, csr_der: &[u8], deadline: Instant)
        -> Result<String, Error>;
}

const ORDER_POLL_INTERVAL: Duration = Duration::from_secs(2);
const CERTIFICATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Persisted shape of an ACME account file.
#[derive(Serialize, Deserialize)]
struct StoredAccount {
    email: String,
    directory: String,
    credentials: AccountCredentials,
}

/// An ACME account bound to a directory, able to open orders.
pub struct AccountManager {
    account: Account,
    directory: String,
}

impl AccountManager {
    /// Register a new account with the directory. Returns the manager and
    /// the credentials to persist for later runs.
    pub async fn create(
        email: &str,
        directory: &str,
    ) -> Result<(Self, AccountCredentials), Error> {
        let contact = format!("mailto:{email}");
        let (account, credentials) = Account::create(
            &NewAccount {
                contact: &[contact.as_str()],
                terms_of_service_agreed: true,
                only_return_existing: false,
            },
            directory,
            None,
        )
        .await?;
        info!(directory, "registered new ACME account");
        Ok((
            Self {
                account,
                directory: directory.to_string(),
            },
            credentials,
        ))
    }

    /// Register a new account and persist it as a JSON file.
    pub async fn create_to_file(
        path: impl AsRef<Path>,
        email: &str,
        directory: &str,
    ) -> Result<Self, Error> {
        let (manager, credentials) = Self::create(email, directory).await?;
        let stored = StoredAccount {
            email: email.to_string(),
            directory: directory.to_string(),
            credentials,
        };
        std::fs::write(path, serde_json::to_vec_pretty(&stored)?)?;
        Ok(manager)
    }

    /// Load a previously persisted account.
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let content = std::fs::read(path)?;
        let stored: StoredAccount = serde_json::from_slice(&content)?;
        let account = Account::from_credentials(stored.credentials).await?;
        Ok(Self {
            account,
            directory: stored.directory,
        })
    }
}

#[async_trait]
impl AcmeOrders for AccountManager {
    fn directory(&self) -> &str {
        &self.directory
    }

    async fn new_order(&self, domains: &[String]) -> Result<Box<dyn PendingOrder>, Error> {
        let identifiers: Vec<Identifier> = domains
            .iter()
            .map(|domain| Identifier::Dns(domain.clone()))
            .collect();
        let mut order = self
            .account
            .new_order(&NewOrder {
                identifiers: &identifiers,
            })
            .await?;

        let authorizations = order.authorizations().await?;
        let mut tokens = Vec::new();
        for authz in &authorizations {
            if authz.status == AuthorizationStatus::Valid {
                continue;
            }
            let domain = match &authz.identifier {
                Identifier::Dns(domain) => domain.clone(),
                _ => continue,
            };
            let Some(challenge) = authz
                .challenges
                .iter()
                .find(|challenge| challenge.r#type == ChallengeType::Dns01)
            else {
                debug!(%domain, "authorization offers no DNS-01 challenge");
                continue;
            };
            tokens.push(Dns01Token {
                identifier: domain,
                challenge_url: challenge.url.clone(),
                txt_value: order.key_authorization(challenge).dns_value(),
            });
        }

        Ok(Box::new(AcmeOrder { order, tokens }))
    }
}

struct AcmeOrder {
    order: Order,
    tokens: Vec<Dns01Token>,
}

#[async_trait]
impl PendingOrder for AcmeOrder {
    fn dns01_tokens(&self) -> &[Dns01Token] {
        &self.tokens
    }

    async fn answer_challenge(&mut self, challenge_url: &str) -> Result<(), Error> {
        self.order.set_challenge_ready(challenge_url).await?;
        Ok(())
    }

    async fn poll_and_finalize(
        &mut self,
        csr_der: &[u8],
        deadline: Instant,
    ) -> Result<String, Error> {
        loop {
            self.order.refresh().await?;
            let state = self.order.state();
            debug!(status = ?state.status, "order status");
            match state.status {
                OrderStatus::Ready | OrderStatus::Valid => break,
                OrderStatus::Invalid => {
                    let detail = state
                        .error
                        .as_ref()
                        .map(|problem| format!("{problem:?}"))
                        .unwrap_or_else(|| "order became invalid".to_string());
                    return Err(Error::OrderFailed(detail));
                }
                OrderStatus::Pending | OrderStatus::Processing => {
                    if Instant::now() >= deadline {
                        return Err(Error::OrderTimeout);
                    }
                    sleep(ORDER_POLL_INTERVAL).await;
                }
            }
        }

        if self.order.state().status != OrderStatus::Valid {
            self.order.finalize(csr_der).await?;
        }

        loop {
            match self.order.certificate().await? {
                Some(chain) => return Ok(chain),
                None => {
                    if Instant::now() >= deadline {
                        return Err(Error::OrderTimeout);
                    }
                    sleep(CERTIFICATE_POLL_INTERVAL).await;
                }
            }
        }
    }
}
