use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrgState {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub state: OrgState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum OrganizationError {
    #[error("org doesn't exist")]
    NotExist,
    #[error("org id is not valid")]
    InvalidUuid,
    #[error("org name or details are not valid")]
    InvalidDetail,
    #[error("org already exists with conflicting details")]
    Conflict,
    #[error("creator email is invalid")]
    InvalidEmail,
    #[error("org is disabled. Please contact your administrator to enable it")]
    Disabled,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Organization lifecycle and membership lookups.
#[async_trait]
pub trait OrganizationService: Send + Sync {
    /// Resolve by UUID or unique name.
    async fn get(&self, id_or_name: &str) -> Result<Organization, OrganizationError>;

    /// Fetch regardless of state. Used where disabled orgs must still
    /// resolve, such as admin listings.
    async fn get_raw(&self, id_or_name: &str) -> Result<Organization, OrganizationError>;

    async fn create(&self, org: Organization) -> Result<Organization, OrganizationError>;

    async fn update(&self, org: Organization) -> Result<Organization, OrganizationError>;

    /// Enabled orgs the given user belongs to.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Organization>, OrganizationError>;

    async fn list(
        &self,
        state: Option<OrgState>,
    ) -> Result<Vec<Organization>, OrganizationError>;

    async fn enable(&self, id: &str) -> Result<(), OrganizationError>;

    async fn disable(&self, id: &str) -> Result<(), OrganizationError>;

    async fn add_users(&self, org_id: &str, user_ids: &[String])
        -> Result<(), OrganizationError>;

    async fn remove_user(&self, org_id: &str, user_id: &str) -> Result<(), OrganizationError>;
}
