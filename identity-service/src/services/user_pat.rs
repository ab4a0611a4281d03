use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A long-lived bearer token owned by a user and scoped to one org. The
/// token value is only populated on create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalAccessToken {
    pub id: Uuid,
    pub user_id: String,
    pub org_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PatCreate {
    pub user_id: String,
    pub org_id: String,
    pub title: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PatError {
    #[error("token doesn't exist")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait UserPatService: Send + Sync {
    async fn create(&self, pat: PatCreate) -> Result<PersonalAccessToken, PatError>;

    async fn list(
        &self,
        user_id: &str,
        org_id: &str,
    ) -> Result<Vec<PersonalAccessToken>, PatError>;

    async fn delete(&self, user_id: &str, id: Uuid) -> Result<(), PatError>;
}
