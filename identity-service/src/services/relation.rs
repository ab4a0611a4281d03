use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Object {
    pub id: String,
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub namespace: String,
    #[serde(default)]
    pub sub_relation: String,
}

/// A stored relation tuple between a subject and an object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: String,
    pub object: Object,
    pub subject: Subject,
    pub relation_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RelationError {
    #[error("relation doesn't exist")]
    NotExist,
    #[error("relation detail is not valid")]
    InvalidDetail,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait RelationService: Send + Sync {
    /// Subject ids related to the object through the relation, optionally
    /// filtered to a subject namespace.
    async fn list_relations(
        &self,
        object: Object,
        subject_namespace: &str,
        relation_name: &str,
    ) -> Result<Vec<Relation>, RelationError>;
}
