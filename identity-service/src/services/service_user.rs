use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::metadata::Metadata;

/// A non-human principal scoped to one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUser {
    pub id: String,
    pub org_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-credential pair. The secret value is only populated on create
/// and never stored or returned again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretCredential {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_value: String,
    pub created_at: DateTime<Utc>,
}

/// Opaque static token credential. The token value is only populated on
/// create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUserToken {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceUserFilter {
    pub org_id: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Error)]
pub enum ServiceUserError {
    #[error("service user doesn't exist")]
    NotExist,
    #[error("service user credential doesn't exist")]
    CredNotExist,
    #[error("service user is disabled")]
    Disabled,
    #[error("service user id is not valid")]
    InvalidId,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait ServiceUserService: Send + Sync {
    async fn get(&self, id: &str) -> Result<ServiceUser, ServiceUserError>;

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<ServiceUser>, ServiceUserError>;

    async fn create(&self, service_user: ServiceUser) -> Result<ServiceUser, ServiceUserError>;

    async fn list(&self, filter: ServiceUserFilter) -> Result<Vec<ServiceUser>, ServiceUserError>;

    async fn list_by_org(&self, org_id: &str) -> Result<Vec<ServiceUser>, ServiceUserError>;

    async fn delete(&self, id: &str) -> Result<(), ServiceUserError>;

    async fn create_secret(
        &self,
        service_user_id: &str,
        title: &str,
    ) -> Result<SecretCredential, ServiceUserError>;

    async fn list_secret(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<SecretCredential>, ServiceUserError>;

    async fn delete_secret(
        &self,
        service_user_id: &str,
        secret_id: Uuid,
    ) -> Result<(), ServiceUserError>;

    async fn create_token(
        &self,
        service_user_id: &str,
        title: &str,
    ) -> Result<ServiceUserToken, ServiceUserError>;

    async fn list_token(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<ServiceUserToken>, ServiceUserError>;

    async fn delete_token(
        &self,
        service_user_id: &str,
        token_id: Uuid,
    ) -> Result<(), ServiceUserError>;

    /// Project ids the service user has the given permission on.
    async fn list_owned_projects(
        &self,
        service_user_id: &str,
    ) -> Result<Vec<String>, ServiceUserError>;

    async fn is_sudo(&self, id: &str, permission: &str) -> Result<bool, ServiceUserError>;

    async fn sudo(&self, id: &str, relation: &str) -> Result<(), ServiceUserError>;

    async fn unsudo(&self, id: &str) -> Result<(), ServiceUserError>;
}
