use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub org_id: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy doesn't exist")]
    NotExist,
    #[error("policy detail is not valid")]
    InvalidDetail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Role resolution backed by the policy store.
#[async_trait]
pub trait PolicyService: Send + Sync {
    /// Roles a user holds inside an org.
    async fn list_roles(&self, org_id: &str, user_id: &str) -> Result<Vec<Role>, PolicyError>;
}
