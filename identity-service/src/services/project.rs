use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metadata::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub org_id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project doesn't exist")]
    NotExist,
    #[error("project id or name is not valid")]
    InvalidDetail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Project>, ProjectError>;
}
