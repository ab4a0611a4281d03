use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub email: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user doesn't exist")]
    NotExist,
    #[error("user email is invalid")]
    InvalidEmail,
    #[error("user id is not valid")]
    InvalidUuid,
    #[error("user name or details are not valid")]
    InvalidDetail,
    #[error("user already exists with conflicting details")]
    Conflict,
    #[error("user is disabled. Please contact your administrator to enable it")]
    Disabled,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// User directory of the platform. Ids, unique names and emails all
/// resolve to the same record.
#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_by_id(&self, id_or_name_or_email: &str) -> Result<User, UserError>;

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<User>, UserError>;

    async fn create(&self, user: User) -> Result<User, UserError>;

    async fn update(&self, user: User) -> Result<User, UserError>;

    async fn list(&self, keyword: Option<&str>, state: Option<&str>)
        -> Result<Vec<User>, UserError>;

    async fn list_by_org(&self, org_id: &str, permission_filter: &str)
        -> Result<Vec<User>, UserError>;

    async fn enable(&self, id: &str) -> Result<(), UserError>;

    async fn disable(&self, id: &str) -> Result<(), UserError>;

    async fn delete(&self, id: &str) -> Result<(), UserError>;

    /// Whether the user holds the platform-wide superuser permission.
    async fn is_sudo(&self, id: &str, permission: &str) -> Result<bool, UserError>;

    async fn sudo(&self, id: &str, relation: &str) -> Result<(), UserError>;

    async fn unsudo(&self, id: &str) -> Result<(), UserError>;
}
