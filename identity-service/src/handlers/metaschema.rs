//! Metaschema handlers. Metaschemas are the JSON schema documents that
//! metadata payloads on other resources are validated against.

use anyhow::anyhow;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use service_core::error::AppError;

use crate::services::{MetaSchema, MetaSchemaError};
use crate::AppState;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MetaSchemaRequestBody {
    pub name: String,
    pub schema: String,
}

#[derive(Debug, Serialize)]
pub struct MetaSchemaResponse {
    pub id: String,
    pub name: String,
    pub schema: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MetaSchema> for MetaSchemaResponse {
    fn from(schema: MetaSchema) -> Self {
        Self {
            id: schema.id,
            name: schema.name,
            schema: schema.schema,
            created_at: schema.created_at,
            updated_at: schema.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListMetaSchemasResponse {
    pub metaschemas: Vec<MetaSchemaResponse>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1beta1/meta/schemas
pub async fn list_metaschemas(
    State(state): State<AppState>,
) -> Result<Json<ListMetaSchemasResponse>, AppError> {
    let schemas = state
        .metaschema_service
        .list()
        .await
        .map_err(map_metaschema_error)?;
    Ok(Json(ListMetaSchemasResponse {
        metaschemas: schemas.into_iter().map(MetaSchemaResponse::from).collect(),
    }))
}

/// POST /v1beta1/meta/schemas
pub async fn create_metaschema(
    State(state): State<AppState>,
    Json(body): Json<MetaSchemaRequestBody>,
) -> Result<(StatusCode, Json<MetaSchemaResponse>), AppError> {
    if body.name.is_empty() || body.schema.is_empty() {
        return Err(AppError::BadRequest(anyhow!(
            "name and schema are required"
        )));
    }
    let created = state
        .metaschema_service
        .create(MetaSchema {
            id: String::new(),
            name: body.name,
            schema: body.schema,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .map_err(map_metaschema_error)?;
    Ok((StatusCode::CREATED, Json(MetaSchemaResponse::from(created))))
}

/// GET /v1beta1/meta/schemas/:id
pub async fn get_metaschema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MetaSchemaResponse>, AppError> {
    require_id(&id)?;
    let schema = state
        .metaschema_service
        .get(&id)
        .await
        .map_err(map_metaschema_error)?;
    Ok(Json(MetaSchemaResponse::from(schema)))
}

/// PUT /v1beta1/meta/schemas/:id
pub async fn update_metaschema(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MetaSchemaRequestBody>,
) -> Result<Json<MetaSchemaResponse>, AppError> {
    require_id(&id)?;
    if body.name.is_empty() || body.schema.is_empty() {
        return Err(AppError::BadRequest(anyhow!(
            "name and schema are required"
        )));
    }
    let updated = state
        .metaschema_service
        .update(
            &id,
            MetaSchema {
                id: id.clone(),
                name: body.name,
                schema: body.schema,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        )
        .await
        .map_err(map_metaschema_error)?;
    Ok(Json(MetaSchemaResponse::from(updated)))
}

/// DELETE /v1beta1/meta/schemas/:id
pub async fn delete_metaschema(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_id(&id)?;
    state
        .metaschema_service
        .delete(&id)
        .await
        .map_err(map_metaschema_error)?;
    Ok(Json(Value::Object(Default::default())))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Blank ids surface as 404, matching the lookup miss they would produce.
fn require_id(id: &str) -> Result<(), AppError> {
    if id.trim().is_empty() {
        return Err(AppError::NotFound(anyhow!("metaschema doesn't exist")));
    }
    Ok(())
}

fn map_metaschema_error(err: MetaSchemaError) -> AppError {
    match err {
        MetaSchemaError::NotExist | MetaSchemaError::InvalidId => AppError::NotFound(anyhow!(err)),
        MetaSchemaError::InvalidDetail | MetaSchemaError::MetadataMismatch => {
            AppError::BadRequest(anyhow!(err))
        }
        MetaSchemaError::Conflict => AppError::Conflict(anyhow!(err)),
        MetaSchemaError::Internal(e) => AppError::InternalError(e),
    }
}
