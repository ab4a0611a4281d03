use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DomainState {
    #[default]
    Pending,
    Verified,
}

/// An org-owned email domain. Membership in a verified domain lets users
/// join the org without an invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub org_id: String,
    /// TXT record value the org admin must publish to prove ownership.
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub state: DomainState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    pub org_id: Option<String>,
    pub state: Option<DomainState>,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("domain doesn't exist")]
    NotExist,
    #[error("domain already exists for the org")]
    DuplicateKey,
    #[error("domain name is not valid")]
    InvalidDomain,
    #[error("required TXT record not found for the domain")]
    TxtRecordNotFound,
    #[error("user email domain doesn't match any verified org domain")]
    DomainsMismatch,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait DomainService: Send + Sync {
    async fn get(&self, id: &str) -> Result<Domain, DomainError>;

    async fn create(&self, domain: Domain) -> Result<Domain, DomainError>;

    async fn list(&self, filter: DomainFilter) -> Result<Vec<Domain>, DomainError>;

    async fn delete(&self, id: &str) -> Result<(), DomainError>;

    /// Check the DNS TXT record and flip the domain to verified.
    async fn verify_domain(&self, id: &str) -> Result<Domain, DomainError>;

    /// Attach the user to every org with a verified domain matching the
    /// user's email domain.
    async fn join(&self, org_id: &str, user_id: &str) -> Result<(), DomainError>;
}
