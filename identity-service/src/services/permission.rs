use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub namespace_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Fully qualified `namespace:name` form.
    pub fn slug(&self) -> String {
        format!("{}:{}", self.namespace_id, self.name)
    }
}

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("permission doesn't exist")]
    NotExist,
    #[error("permission id is invalid")]
    InvalidId,
    #[error("permission name or details are not valid")]
    InvalidDetail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Registry of permissions defined across namespaces.
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Resolve by UUID or `namespace:name` slug.
    async fn get(&self, id_or_slug: &str) -> Result<Permission, PermissionError>;
}
