use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON schema document that free-form metadata payloads are validated
/// against. Schemas are keyed by the resource kind they guard
/// ("organization", "user", and so on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaSchema {
    pub id: String,
    pub name: String,
    pub schema: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum MetaSchemaError {
    #[error("metaschema doesn't exist")]
    NotExist,
    #[error("metaschema id is invalid")]
    InvalidId,
    #[error("metaschema name or schema is not valid")]
    InvalidDetail,
    #[error("metaschema already exists with the same name")]
    Conflict,
    #[error("metadata doesn't match the schema")]
    MetadataMismatch,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[async_trait]
pub trait MetaSchemaService: Send + Sync {
    async fn get(&self, id: &str) -> Result<MetaSchema, MetaSchemaError>;

    async fn create(&self, schema: MetaSchema) -> Result<MetaSchema, MetaSchemaError>;

    async fn list(&self) -> Result<Vec<MetaSchema>, MetaSchemaError>;

    async fn update(&self, id: &str, schema: MetaSchema) -> Result<MetaSchema, MetaSchemaError>;

    async fn delete(&self, id: &str) -> Result<(), MetaSchemaError>;

    /// Validate a metadata payload against the schema registered under
    /// `name`.
    async fn validate(
        &self,
        metadata: &crate::metadata::Metadata,
        name: &str,
    ) -> Result<(), MetaSchemaError>;
}
